//! # Graph
//!
//! The graph owns every node and edge, hands out identities and controls the
//! start/stop lifecycle of execution.
//!
//! ## Identities
//!
//! Nodes, ports and edges draw their identities from one monotonic counter,
//! so an identity is unique across all three kinds. A node's output connection
//! point is addressed by the node's own identity.
//!
//! ## Structure Management (Synchronous)
//!
//! Creating nodes, linking ports and editing literal values are synchronous and
//! are meant to be driven from a single control thread (the editor). Linking is
//! refused while the graph runs: node tasks work on a snapshot of the topology
//! taken at start.
//!
//! ## Execution (Asynchronous)
//!
//! `start` spawns one task per node on the current tokio runtime. `stop`
//! cancels them and waits until every task has finished, so a stopped graph
//! leaves nothing behind and can be started again.
//!
//! ```rust
//! use nodeflow::builtins;
//! use nodeflow::graph::Graph;
//! use nodeflow::value::Value;
//!
//! # tokio_test::block_on(async {
//! let library = builtins::library();
//! let mut graph = Graph::new();
//! let clock = graph.add_node(library.get("Time/now").unwrap());
//! let add = graph.add_node(library.get("Math/add").unwrap());
//! let first = graph.node(add).unwrap().ports()[0].id();
//! graph.link(clock, first)?;
//!
//! let sums = graph.observe(add)?;
//! graph.start()?;
//! assert!(matches!(sums.recv().await, Some(Value::Integer(_))));
//! graph.stop().await;
//! # Ok::<(), nodeflow::error::GraphError>(())
//! # }).unwrap();
//! ```

use crate::channels::{Observer, edge_channel};
use crate::config::EngineConfig;
use crate::error::GraphError;
use crate::library::NodeTemplate;
use crate::node::Node;
use crate::port::Port;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Identity of a node, port or edge, unique within one graph.
pub type Id = u64;

// Distinguishes graphs so a node can only join the graph that created it.
static NEXT_GRAPH: AtomicU64 = AtomicU64::new(0);

/// A recorded link from a node's output to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
  /// Identity of the edge.
  pub id: Id,
  /// Identity of the producing node (its output connection point).
  pub source: Id,
  /// Identity of the consuming input port.
  pub target: Id,
}

/// State of one run. Present exactly while the graph is running.
struct Run {
  token: CancellationToken,
  tasks: JoinSet<Id>,
}

/// A dataflow graph.
pub struct Graph {
  graph: u64,
  config: EngineConfig,
  id_counter: Id,
  nodes: Vec<Node>,
  edges: BTreeMap<Id, Vec<Edge>>,
  run: Option<Run>,
}

impl Graph {
  /// Creates an empty graph with the default configuration.
  pub fn new() -> Self {
    Self::with_config(EngineConfig::default())
  }

  /// Creates an empty graph.
  pub fn with_config(config: EngineConfig) -> Self {
    Self {
      graph: NEXT_GRAPH.fetch_add(1, Ordering::Relaxed),
      config,
      id_counter: 0,
      nodes: Vec::new(),
      edges: BTreeMap::new(),
      run: None,
    }
  }

  /// The engine configuration.
  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Returns a fresh identity.
  ///
  /// Exposed so an editor can allocate identities for purely visual elements
  /// without colliding with graph elements.
  pub fn next_id(&mut self) -> Id {
    let id = self.id_counter;
    self.id_counter += 1;
    id
  }

  /// Instantiates `template`, assigning identities to the node and to each of
  /// its ports. The node is not part of the graph until registered.
  pub fn create_node(&mut self, template: &NodeTemplate) -> Node {
    let id = self.next_id();
    let port_ids: Vec<Id> = template.inputs().iter().map(|_| self.next_id()).collect();
    trace!(node_id = id, node = template.name(), "node created");
    Node::from_template(self.graph, id, template, port_ids)
  }

  /// Adds a node created by [`Graph::create_node`] on this graph.
  ///
  /// Allowed while running; the node gets a task on the next start.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::ForeignNode`] if the node was created by another
  /// graph, whose identities may collide with the ones issued here.
  pub fn register_node(&mut self, node: Node) -> Result<Id, GraphError> {
    if node.graph() != self.graph {
      return Err(GraphError::ForeignNode(node.id()));
    }
    Ok(self.push_node(node))
  }

  /// Creates and registers a node in one step.
  pub fn add_node(&mut self, template: &NodeTemplate) -> Id {
    let node = self.create_node(template);
    self.push_node(node)
  }

  fn push_node(&mut self, node: Node) -> Id {
    let id = node.id();
    debug!(node_id = id, node = node.name(), "node registered");
    self.nodes.push(node);
    id
  }

  /// Finds a node by identity.
  pub fn node(&self, id: Id) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id() == id)
  }

  /// Finds a port, on any node, by identity.
  pub fn port(&self, id: Id) -> Option<&Port> {
    self.nodes.iter().find_map(|n| n.port(id))
  }

  /// All nodes in registration order.
  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  /// All edges in identity order.
  pub fn edges(&self) -> impl Iterator<Item = &Edge> {
    self.edges.values().flatten()
  }

  /// Number of recorded edges.
  pub fn edge_count(&self) -> usize {
    self.edges.values().map(Vec::len).sum()
  }

  /// Returns `true` between `start` and `stop`.
  pub fn is_running(&self) -> bool {
    self.run.is_some()
  }

  /// Links the output of `producer` to the input port `port`, returning the
  /// new edge's identity.
  ///
  /// A port has a single channel slot. Linking an already linked port replaces
  /// its channel: the superseded edge record is dropped and the previous
  /// producer stops feeding the port.
  ///
  /// # Errors
  ///
  /// - [`GraphError::Running`] while the graph runs
  /// - [`GraphError::UnknownNode`] / [`GraphError::UnknownPort`] for bad identities
  /// - [`GraphError::NoOutput`] if the producer has no output
  pub fn link(&mut self, producer: Id, port: Id) -> Result<Id, GraphError> {
    if self.is_running() {
      return Err(GraphError::Running);
    }
    let producer_index = self.node_index(producer)?;
    if !self.nodes[producer_index].has_output() {
      return Err(GraphError::NoOutput(producer));
    }
    let (consumer_index, port_index) = self
      .nodes
      .iter()
      .enumerate()
      .find_map(|(i, n)| n.port_index(port).map(|p| (i, p)))
      .ok_or(GraphError::UnknownPort(port))?;

    let (tx, rx) = edge_channel();
    self.nodes[producer_index].attach_output(tx);
    if let Some(previous) = self.nodes[consumer_index].link_port(port_index, rx) {
      // Dropping the last handle closes the old channel so its producer can
      // let go of it.
      drop(previous);
      for node in &mut self.nodes {
        node.prune_closed_outputs();
      }
      self.edges.retain(|_, edges| {
        edges.retain(|e| e.target != port);
        !edges.is_empty()
      });
      debug!(port_id = port, "port relinked");
    }

    let id = self.next_id();
    self.edges.entry(id).or_default().push(Edge {
      id,
      source: producer,
      target: port,
    });
    debug!(edge_id = id, source = producer, target = port, "edge linked");
    Ok(id)
  }

  /// Attaches an [`Observer`] to the output of `producer`.
  ///
  /// The observer counts as one more fan-out consumer.
  ///
  /// # Errors
  ///
  /// [`GraphError::Running`], [`GraphError::UnknownNode`] or
  /// [`GraphError::NoOutput`].
  pub fn observe(&mut self, producer: Id) -> Result<Observer, GraphError> {
    if self.is_running() {
      return Err(GraphError::Running);
    }
    let index = self.node_index(producer)?;
    let node = &mut self.nodes[index];
    if !node.has_output() {
      return Err(GraphError::NoOutput(producer));
    }
    node.prune_closed_outputs();
    let (tx, rx) = edge_channel();
    node.attach_output(tx);
    Ok(Observer::new(producer, rx))
  }

  /// Sets the literal value of an input port. Running nodes see the new value
  /// on their next iteration if the port is unlinked.
  ///
  /// # Errors
  ///
  /// [`GraphError::UnknownPort`], or [`GraphError::PortType`] if the value's
  /// variant does not match the port's declared type.
  pub fn set_port_value(&self, port: Id, value: Value) -> Result<(), GraphError> {
    self
      .port(port)
      .ok_or(GraphError::UnknownPort(port))?
      .set_value(value)
  }

  /// Starts one task per registered node.
  ///
  /// Does nothing if the graph is already running or has no nodes.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::NoRuntime`] when called outside a tokio runtime.
  pub fn start(&mut self) -> Result<(), GraphError> {
    if self.is_running() {
      debug!("start ignored: already running");
      return Ok(());
    }
    if self.nodes.is_empty() {
      debug!("start ignored: no nodes");
      return Ok(());
    }
    let handle = Handle::try_current().map_err(|_| GraphError::NoRuntime)?;

    let token = CancellationToken::new();
    let mut tasks = JoinSet::new();
    for node in &self.nodes {
      let task = node.task(self.config.failed_results);
      tasks.spawn_on(task.run(token.clone()), &handle);
    }
    info!(nodes = self.nodes.len(), edges = self.edge_count(), "graph started");
    self.run = Some(Run { token, tasks });
    Ok(())
  }

  /// Cancels every node task and waits for them to finish.
  ///
  /// Tasks still running after the configured grace period (a logic function
  /// that never returns) are aborted and detached. Does nothing when idle.
  pub async fn stop(&mut self) {
    let Some(mut run) = self.run.take() else {
      debug!("stop ignored: not running");
      return;
    };
    run.token.cancel();

    let drained = tokio::time::timeout(self.config.stop_grace, async {
      while let Some(joined) = run.tasks.join_next().await {
        match joined {
          Ok(id) => trace!(node_id = id, "node task joined"),
          Err(err) => warn!(error = %err, "node task ended abnormally"),
        }
      }
    })
    .await;

    if drained.is_err() {
      warn!(
        remaining = run.tasks.len(),
        "node tasks ignored cancellation, aborting"
      );
      run.tasks.abort_all();
      run.tasks.detach_all();
    }
    info!("graph stopped");
  }

  fn node_index(&self, id: Id) -> Result<usize, GraphError> {
    self
      .nodes
      .iter()
      .position(|n| n.id() == id)
      .ok_or(GraphError::UnknownNode(id))
  }
}

impl Default for Graph {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for Graph {
  fn drop(&mut self) {
    if let Some(run) = &self.run {
      run.token.cancel();
    }
  }
}

impl std::fmt::Debug for Graph {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Graph")
      .field("nodes", &self.nodes)
      .field("edges", &self.edges)
      .field("running", &self.is_running())
      .finish()
  }
}
