//! # Graph Test Suite
//!
//! Covers identity management, topology errors and the start/stop lifecycle.

use crate::config::{EngineConfig, FailedResultPolicy};
use crate::error::{GraphError, LogicError};
use crate::graph::{Graph, Id};
use crate::library::{InputSpec, NodeTemplate};
use crate::value::{Value, ValueType};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;

// ============================================================================
// Helpers
// ============================================================================

fn constant(value: i64) -> NodeTemplate {
  NodeTemplate::new("Test/constant", Vec::new(), "value", move |_: &[Value]| {
    Ok(Value::Integer(value))
  })
}

fn counting_source(calls: Arc<AtomicUsize>) -> NodeTemplate {
  NodeTemplate::new("Test/count", Vec::new(), "", move |_: &[Value]| {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok(Value::Empty)
  })
}

fn passthrough() -> NodeTemplate {
  NodeTemplate::new(
    "Test/pass",
    vec![InputSpec::new("in", ValueType::Integer)],
    "out",
    |args: &[Value]| Ok(args[0].clone()),
  )
}

fn first_port(graph: &Graph, node: Id) -> Id {
  graph.node(node).unwrap().ports()[0].id()
}

async fn wait_for(calls: &AtomicUsize, at_least: usize) {
  let reached = timeout(Duration::from_secs(2), async {
    while calls.load(Ordering::SeqCst) < at_least {
      tokio::time::sleep(Duration::from_millis(1)).await;
    }
  })
  .await;
  assert!(reached.is_ok(), "logic was not invoked {} times", at_least);
}

// ============================================================================
// Topology
// ============================================================================

#[test]
fn test_new_graph_is_idle_and_empty() {
  let graph = Graph::new();
  assert!(!graph.is_running());
  assert!(graph.nodes().is_empty());
  assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_identities_shared_across_kinds() {
  let mut graph = Graph::new();
  let producer = graph.add_node(&constant(1));
  let consumer = graph.add_node(&passthrough());
  let port = first_port(&graph, consumer);
  let edge = graph.link(producer, port).unwrap();
  let visual = graph.next_id();

  let mut ids = vec![producer, consumer, port, edge, visual];
  assert_eq!(ids, vec![0, 1, 2, 3, 4]);
  ids.dedup();
  assert_eq!(ids.len(), 5);

  let recorded = graph.edges().next().unwrap();
  assert_eq!((recorded.id, recorded.source, recorded.target), (edge, producer, port));
}

#[test]
fn test_create_then_register() {
  let mut graph = Graph::new();
  let node = graph.create_node(&passthrough());
  let port = node.ports()[0].id();
  assert!(graph.node(node.id()).is_none());

  let id = graph.register_node(node).unwrap();
  assert_eq!(graph.node(id).unwrap().name(), "Test/pass");
  assert_eq!(graph.port(port).unwrap().label(), "in");
  assert!(graph.port(id).is_none());
}

#[test]
fn test_register_rejects_node_from_other_graph() {
  let mut a = Graph::new();
  let mut b = Graph::new();
  let stranger = a.create_node(&constant(1));
  let own = b.add_node(&constant(2));
  assert_eq!(stranger.id(), own);

  assert_eq!(b.register_node(stranger), Err(GraphError::ForeignNode(own)));
  let ids: Vec<Id> = b.nodes().iter().map(|n| n.id()).collect();
  assert_eq!(ids, vec![own]);
  assert!(a.nodes().is_empty());
}

#[test]
fn test_link_errors() {
  let mut graph = Graph::new();
  let calls = Arc::new(AtomicUsize::new(0));
  let sink = graph.add_node(&counting_source(calls));
  let consumer = graph.add_node(&passthrough());
  let port = first_port(&graph, consumer);

  assert_eq!(graph.link(42, port), Err(GraphError::UnknownNode(42)));
  assert_eq!(graph.link(consumer, 42), Err(GraphError::UnknownPort(42)));
  assert_eq!(graph.link(sink, port), Err(GraphError::NoOutput(sink)));
  assert_eq!(graph.observe(sink).unwrap_err(), GraphError::NoOutput(sink));
  assert_eq!(graph.edge_count(), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_start_outside_runtime() {
  let mut graph = Graph::new();
  graph.add_node(&constant(1));
  assert_eq!(graph.start(), Err(GraphError::NoRuntime));
  assert!(!graph.is_running());
}

#[tokio::test]
async fn test_start_without_nodes_is_noop() {
  let mut graph = Graph::new();
  tokio_test::assert_ok!(graph.start());
  assert!(!graph.is_running());
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
  let mut graph = Graph::new();
  graph.add_node(&constant(1));
  graph.stop().await;
  assert!(!graph.is_running());
}

#[tokio::test]
async fn test_zero_input_node_runs_without_links() {
  let calls = Arc::new(AtomicUsize::new(0));
  let mut graph = Graph::new();
  graph.add_node(&counting_source(calls.clone()));

  graph.start().unwrap();
  assert!(graph.is_running());
  wait_for(&calls, 3).await;
  graph.stop().await;
  assert!(!graph.is_running());

  // Stopped means stopped: no more invocations.
  let after_stop = calls.load(Ordering::SeqCst);
  tokio::time::sleep(Duration::from_millis(20)).await;
  assert_eq!(calls.load(Ordering::SeqCst), after_stop);
}

#[tokio::test]
async fn test_start_twice_is_noop() {
  let calls = Arc::new(AtomicUsize::new(0));
  let mut graph = Graph::new();
  graph.add_node(&counting_source(calls.clone()));
  graph.start().unwrap();
  graph.start().unwrap();
  assert!(graph.is_running());
  graph.stop().await;
  assert!(!graph.is_running());
}

#[tokio::test]
async fn test_topology_locked_while_running() {
  let mut graph = Graph::new();
  let producer = graph.add_node(&constant(1));
  let consumer = graph.add_node(&passthrough());
  let port = first_port(&graph, consumer);

  graph.start().unwrap();
  assert_eq!(graph.link(producer, port), Err(GraphError::Running));
  assert_eq!(graph.observe(producer).unwrap_err(), GraphError::Running);
  graph.stop().await;

  assert!(graph.link(producer, port).is_ok());
}

#[tokio::test]
async fn test_restart_uses_fresh_tasks() {
  let mut graph = Graph::new();
  let producer = graph.add_node(&constant(7));
  let values = graph.observe(producer).unwrap();

  graph.start().unwrap();
  assert_eq!(values.recv().await, Some(Value::Integer(7)));
  graph.stop().await;
  assert!(!graph.is_running());

  graph.start().unwrap();
  assert!(graph.is_running());
  let again = timeout(Duration::from_secs(1), values.recv()).await.unwrap();
  assert_eq!(again, Some(Value::Integer(7)));
  graph.stop().await;
}

#[tokio::test]
async fn test_node_registered_while_running_waits_for_next_start() {
  let first = Arc::new(AtomicUsize::new(0));
  let late = Arc::new(AtomicUsize::new(0));
  let mut graph = Graph::new();
  graph.add_node(&counting_source(first.clone()));
  graph.start().unwrap();

  graph.add_node(&counting_source(late.clone()));
  wait_for(&first, 2).await;
  assert_eq!(late.load(Ordering::SeqCst), 0);
  graph.stop().await;

  graph.start().unwrap();
  wait_for(&late, 1).await;
  graph.stop().await;
}

#[tokio::test]
async fn test_stop_releases_tasks_blocked_on_receive() {
  // Two nodes feeding each other never receive anything.
  let mut graph = Graph::new();
  let a = graph.add_node(&passthrough());
  let b = graph.add_node(&passthrough());
  graph.link(a, first_port(&graph, b)).unwrap();
  graph.link(b, first_port(&graph, a)).unwrap();

  graph.start().unwrap();
  tokio::time::sleep(Duration::from_millis(10)).await;
  timeout(Duration::from_secs(1), graph.stop())
    .await
    .expect("stop hung on blocked receivers");
}

#[tokio::test]
async fn test_stop_releases_tasks_blocked_on_send() {
  let mut graph = Graph::new();
  let producer = graph.add_node(&constant(1));
  // Never read, so the producer parks on its first send.
  let _values = graph.observe(producer).unwrap();

  graph.start().unwrap();
  tokio::time::sleep(Duration::from_millis(10)).await;
  timeout(Duration::from_secs(1), graph.stop())
    .await
    .expect("stop hung on blocked sender");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_aborts_after_grace_period() {
  let config = EngineConfig::default().with_stop_grace(Duration::from_millis(20));
  let mut graph = Graph::with_config(config);
  graph.add_node(&NodeTemplate::new(
    "Test/slow",
    Vec::new(),
    "",
    |_: &[Value]| {
      std::thread::sleep(Duration::from_millis(300));
      Ok(Value::Empty)
    },
  ));

  graph.start().unwrap();
  tokio::time::sleep(Duration::from_millis(10)).await;
  timeout(Duration::from_millis(250), graph.stop())
    .await
    .expect("stop waited past its grace period");
  assert!(!graph.is_running());
}

#[tokio::test]
async fn test_dropping_running_graph_does_not_hang() {
  let calls = Arc::new(AtomicUsize::new(0));
  let mut graph = Graph::new();
  graph.add_node(&counting_source(calls.clone()));
  graph.start().unwrap();
  wait_for(&calls, 1).await;
  drop(graph);

  tokio::time::sleep(Duration::from_millis(20)).await;
  let settled = calls.load(Ordering::SeqCst);
  tokio::time::sleep(Duration::from_millis(20)).await;
  assert_eq!(calls.load(Ordering::SeqCst), settled);
}

// ============================================================================
// Execution
// ============================================================================

#[tokio::test]
async fn test_arguments_follow_declaration_order() {
  let recorder = NodeTemplate::new(
    "Test/digits",
    vec![
      InputSpec::new("hundreds", ValueType::Integer),
      InputSpec::new("tens", ValueType::Integer),
      InputSpec::new("ones", ValueType::Integer),
    ],
    "out",
    |args: &[Value]| match args {
      [Value::Integer(h), Value::Integer(t), Value::Integer(o)] => {
        Ok(Value::Integer(h * 100 + t * 10 + o))
      }
      _ => Err(LogicError::Failed("unexpected arguments".to_string())),
    },
  );

  let mut graph = Graph::new();
  let one = graph.add_node(&constant(1));
  let two = graph.add_node(&constant(2));
  let digits = graph.add_node(&recorder);
  let ports: Vec<Id> = graph
    .node(digits)
    .unwrap()
    .ports()
    .iter()
    .map(|p| p.id())
    .collect();

  // Link in reverse of declaration order; leave the last port literal.
  graph.link(two, ports[1]).unwrap();
  graph.link(one, ports[0]).unwrap();
  graph.set_port_value(ports[2], Value::Integer(3)).unwrap();

  let values = graph.observe(digits).unwrap();
  graph.start().unwrap();
  let value = timeout(Duration::from_secs(1), values.recv()).await.unwrap();
  assert_eq!(value, Some(Value::Integer(123)));
  graph.stop().await;
}

#[tokio::test]
async fn test_literal_edits_reach_running_node() {
  let mut graph = Graph::new();
  let add = graph.add_node(crate::builtins::library().get("Math/add").unwrap());
  let ports: Vec<Id> = graph
    .node(add)
    .unwrap()
    .ports()
    .iter()
    .map(|p| p.id())
    .collect();
  graph.set_port_value(ports[0], Value::Integer(1)).unwrap();

  let sums = graph.observe(add).unwrap();
  graph.start().unwrap();
  assert_eq!(sums.recv().await, Some(Value::Integer(1)));

  graph.set_port_value(ports[1], Value::Integer(10)).unwrap();
  let seen = timeout(Duration::from_secs(1), async {
    loop {
      if sums.recv().await == Some(Value::Integer(11)) {
        break;
      }
    }
  })
  .await;
  assert!(seen.is_ok());
  graph.stop().await;
}

fn flaky() -> NodeTemplate {
  let calls = AtomicUsize::new(0);
  NodeTemplate::new("Test/flaky", Vec::new(), "out", move |_: &[Value]| {
    let n = calls.fetch_add(1, Ordering::SeqCst) as i64;
    if n % 2 == 0 {
      Err(LogicError::Failed(format!("call {} failed", n)))
    } else {
      Ok(Value::Integer(n))
    }
  })
}

#[tokio::test]
async fn test_failed_results_forwarded_by_default() {
  let mut graph = Graph::new();
  let node = graph.add_node(&flaky());
  let values = graph.observe(node).unwrap();
  graph.start().unwrap();

  let mut received = Vec::new();
  for _ in 0..4 {
    received.push(values.recv().await.unwrap());
  }
  graph.stop().await;
  assert_eq!(
    received,
    vec![
      Value::Empty,
      Value::Integer(1),
      Value::Empty,
      Value::Integer(3)
    ]
  );
}

#[tokio::test]
async fn test_failed_results_discarded_when_configured() {
  let config = EngineConfig::default().with_failed_results(FailedResultPolicy::Discard);
  let mut graph = Graph::with_config(config);
  let node = graph.add_node(&flaky());
  let values = graph.observe(node).unwrap();
  graph.start().unwrap();

  let mut received = Vec::new();
  for _ in 0..3 {
    received.push(values.recv().await.unwrap());
  }
  graph.stop().await;
  assert_eq!(
    received,
    vec![Value::Integer(1), Value::Integer(3), Value::Integer(5)]
  );
}

#[tokio::test]
async fn test_panicking_logic_does_not_kill_node() {
  let calls = AtomicUsize::new(0);
  let template = NodeTemplate::new("Test/panics", Vec::new(), "out", move |_: &[Value]| {
    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
      panic!("first call explodes");
    }
    Ok(Value::Integer(2))
  });

  let mut graph = Graph::new();
  let node = graph.add_node(&template);
  let values = graph.observe(node).unwrap();
  graph.start().unwrap();
  assert_eq!(values.recv().await, Some(Value::Empty));
  assert_eq!(values.recv().await, Some(Value::Integer(2)));
  graph.stop().await;
}

#[tokio::test]
async fn test_dropped_observer_does_not_block_producer() {
  let mut graph = Graph::new();
  let producer = graph.add_node(&constant(5));
  let dropped = graph.observe(producer).unwrap();
  let kept = graph.observe(producer).unwrap();
  drop(dropped);

  graph.start().unwrap();
  for _ in 0..3 {
    let value = timeout(Duration::from_secs(1), kept.recv()).await.unwrap();
    assert_eq!(value, Some(Value::Integer(5)));
  }
  graph.stop().await;
}
