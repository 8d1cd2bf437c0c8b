//! # Ports
//!
//! A port is one named input slot of a node. It is either *unlinked*, in which
//! case its literal value feeds the node, or *linked* to exactly one edge
//! channel. The literal is kept after linking as the last known default.

use crate::channels::EdgeReceiver;
use crate::error::GraphError;
use crate::graph::Id;
use crate::value::{Value, ValueType};
use tokio::sync::watch;

/// What a node task reads from one port during a run.
#[derive(Debug)]
pub(crate) enum PortInput {
  /// Wait for the next value on the edge.
  Linked(EdgeReceiver),
  /// Use the current literal without waiting.
  Literal(watch::Receiver<Value>),
}

/// An input slot of a node.
#[derive(Debug)]
pub struct Port {
  id: Id,
  label: String,
  value_type: ValueType,
  // A watch cell so the editor can change the literal while node tasks run.
  literal: watch::Sender<Value>,
  link: Option<EdgeReceiver>,
}

impl Port {
  pub(crate) fn new(id: Id, label: String, value_type: ValueType) -> Self {
    let (literal, _) = watch::channel(Value::zero(value_type));
    Self {
      id,
      label,
      value_type,
      literal,
      link: None,
    }
  }

  /// Graph-scoped identity of the port.
  pub fn id(&self) -> Id {
    self.id
  }

  /// Display label.
  pub fn label(&self) -> &str {
    &self.label
  }

  /// Declared type tag.
  pub fn value_type(&self) -> ValueType {
    self.value_type
  }

  /// Current literal value.
  pub fn value(&self) -> Value {
    self.literal.borrow().clone()
  }

  /// Returns `true` once an edge feeds this port.
  pub fn is_linked(&self) -> bool {
    self.link.is_some()
  }

  /// Replaces the literal value after checking it against the declared type.
  pub(crate) fn set_value(&self, value: Value) -> Result<(), GraphError> {
    if value.value_type() != Some(self.value_type) {
      return Err(GraphError::PortType {
        port: self.id,
        expected: self.value_type,
        found: value.kind(),
      });
    }
    self.literal.send_replace(value);
    Ok(())
  }

  /// Installs an edge channel, returning the one it replaces.
  pub(crate) fn install(&mut self, rx: EdgeReceiver) -> Option<EdgeReceiver> {
    self.link.replace(rx)
  }

  pub(crate) fn input(&self) -> PortInput {
    match &self.link {
      Some(rx) => PortInput::Linked(rx.clone()),
      None => PortInput::Literal(self.literal.subscribe()),
    }
  }
}
