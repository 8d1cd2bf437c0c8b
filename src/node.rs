//! # Nodes
//!
//! A node is one unit of computation: an ordered list of input [`Port`]s, at
//! most one output connection point, and a logic function. The output may fan
//! out to any number of edges; each is an [`EdgeSender`] registered on the node
//! in link order.
//!
//! Nodes are created from a [`NodeTemplate`] by the graph, which also assigns
//! their identities. They are never removed.

use crate::channels::{EdgeReceiver, EdgeSender};
use crate::config::FailedResultPolicy;
use crate::execution::NodeTask;
use crate::graph::Id;
use crate::library::{Logic, NodeTemplate};
use crate::port::Port;
use std::fmt;
use tracing::trace;

/// A node instance owned by a graph.
pub struct Node {
  graph: u64,
  id: Id,
  name: String,
  ports: Vec<Port>,
  output_label: String,
  outputs: Vec<EdgeSender>,
  logic: Logic,
  unlinked: usize,
}

impl Node {
  /// Instantiates a template. `port_ids` supplies one identity per declared
  /// input, in order.
  pub(crate) fn from_template(
    graph: u64,
    id: Id,
    template: &NodeTemplate,
    port_ids: impl IntoIterator<Item = Id>,
  ) -> Self {
    let ports: Vec<Port> = template
      .inputs()
      .iter()
      .zip(port_ids)
      .map(|(spec, port_id)| Port::new(port_id, spec.label.clone(), spec.value_type))
      .collect();
    Self {
      graph,
      id,
      name: template.name().to_string(),
      unlinked: ports.len(),
      ports,
      output_label: template.output_label().to_string(),
      outputs: Vec::new(),
      logic: template.logic().clone(),
    }
  }

  /// Token of the graph that issued this node's identities.
  pub(crate) fn graph(&self) -> u64 {
    self.graph
  }

  /// Graph-scoped identity. The node's output connection point shares it.
  pub fn id(&self) -> Id {
    self.id
  }

  /// Template name, used for display and logging.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Input ports in declaration order.
  pub fn ports(&self) -> &[Port] {
    &self.ports
  }

  /// Finds one of this node's ports by identity.
  pub fn port(&self, id: Id) -> Option<&Port> {
    self.ports.iter().find(|p| p.id() == id)
  }

  /// Output label; empty when the node has no output.
  pub fn output_label(&self) -> &str {
    &self.output_label
  }

  /// Returns `true` if the node has an output connection point.
  pub fn has_output(&self) -> bool {
    !self.output_label.is_empty()
  }

  /// Number of channels registered on the output.
  pub fn outbound_count(&self) -> usize {
    self.outputs.len()
  }

  /// Number of input ports without an edge.
  pub fn unlinked_count(&self) -> usize {
    self.unlinked
  }

  /// Returns `true` when every input port is fed by an edge. Always true for
  /// a node without inputs.
  pub fn all_ports_linked(&self) -> bool {
    self.unlinked == 0
  }

  pub(crate) fn attach_output(&mut self, tx: EdgeSender) {
    self.outputs.push(tx);
  }

  /// Links the port at `index` to `rx`. The unlinked counter only moves the
  /// first time a port is linked. Returns the channel that was replaced.
  pub(crate) fn link_port(&mut self, index: usize, rx: EdgeReceiver) -> Option<EdgeReceiver> {
    let previous = self.ports[index].install(rx);
    if previous.is_none() {
      self.unlinked -= 1;
    }
    previous
  }

  /// Drops output channels whose receiver is gone. Returns how many were removed.
  pub(crate) fn prune_closed_outputs(&mut self) -> usize {
    let before = self.outputs.len();
    self.outputs.retain(|tx| !tx.is_closed());
    let pruned = before - self.outputs.len();
    if pruned > 0 {
      trace!(node_id = self.id, pruned, "pruned closed outputs");
    }
    pruned
  }

  pub(crate) fn port_index(&self, id: Id) -> Option<usize> {
    self.ports.iter().position(|p| p.id() == id)
  }

  /// Snapshot of what the node's task needs for one run.
  pub(crate) fn task(&self, failed_results: FailedResultPolicy) -> NodeTask {
    NodeTask {
      id: self.id,
      name: self.name.clone(),
      inputs: self.ports.iter().map(Port::input).collect(),
      outputs: self.outputs.clone(),
      logic: self.logic.clone(),
      failed_results,
    }
  }
}

impl fmt::Debug for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Node")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("ports", &self.ports)
      .field("output_label", &self.output_label)
      .field("outbound", &self.outputs.len())
      .field("unlinked", &self.unlinked)
      .finish()
  }
}
