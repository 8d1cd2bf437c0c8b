//! Wires `Time/now` through `Math/add` into `IO/println` and watches five sums
//! go by.
//!
//! ```text
//! cargo run --example clock
//! cargo run --example clock -- '{"failed_results":"discard","stop_grace":{"secs":1,"nanos":0}}'
//! ```

use nodeflow::builtins;
use nodeflow::{EngineConfig, Graph, Value};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .init();

  let config = match std::env::args().nth(1) {
    Some(json) => EngineConfig::from_json(&json)?,
    None => EngineConfig::default(),
  };
  let library = builtins::library();
  let template = |name: &str| {
    library
      .get(name)
      .ok_or_else(|| format!("unknown template {}", name))
  };

  let mut graph = Graph::with_config(config);
  let clock = graph.add_node(template("Time/now")?);
  let add = graph.add_node(template("Math/add")?);
  let print = graph.add_node(template("IO/println")?);

  let add_ports: Vec<_> = graph
    .node(add)
    .ok_or("add node missing")?
    .ports()
    .iter()
    .map(|p| p.id())
    .collect();
  let print_port = graph
    .node(print)
    .ok_or("print node missing")?
    .ports()[0]
    .id();

  graph.link(clock, add_ports[0])?;
  graph.set_port_value(add_ports[1], Value::Integer(1000))?;
  graph.link(add, print_port)?;

  // The observer is one more consumer of `add`; reading it slowly paces the
  // whole pipeline, printer included.
  let sums = graph.observe(add)?;

  info!(nodes = graph.nodes().len(), edges = graph.edge_count(), "graph built");
  graph.start()?;
  for _ in 0..5 {
    if let Some(sum) = sums.recv().await {
      info!(%sum, "observed");
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
  }
  graph.stop().await;
  Ok(())
}
