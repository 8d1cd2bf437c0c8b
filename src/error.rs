//! # Error Handling
//!
//! Error types for the dataflow engine.
//!
//! - [`LogicError`]: a node's computation failed. Never fatal: the owning node
//!   logs it and moves on to its next iteration.
//! - [`GraphError`]: an editor-facing operation on the graph was refused.
//! - [`ConfigError`]: an engine configuration document could not be parsed.

use crate::graph::Id;
use crate::value::ValueType;

/// Failure reported by a node's logic function.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogicError {
  /// The logic was handed the wrong number of arguments.
  #[error("expected {expected} arguments, got {got}")]
  ArgumentCount {
    /// Number of arguments the logic needs.
    expected: usize,
    /// Number of arguments it received.
    got: usize,
  },
  /// An argument had a variant the logic cannot handle.
  #[error("argument {position}: expected {expected}, found {found}")]
  TypeMismatch {
    /// Zero-based argument position.
    position: usize,
    /// What the logic accepts.
    expected: &'static str,
    /// What it received.
    found: &'static str,
  },
  /// Any other failure, described by a message.
  #[error("{0}")]
  Failed(String),
  /// The logic panicked.
  #[error("logic panicked: {0}")]
  Panicked(String),
}

/// Error returned by graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
  /// No node has this identity.
  #[error("no node with id {0}")]
  UnknownNode(Id),
  /// No port has this identity.
  #[error("no port with id {0}")]
  UnknownPort(Id),
  /// The node has no output connection point.
  #[error("node {0} has no output")]
  NoOutput(Id),
  /// The node was created by a different graph.
  #[error("node {0} was created by another graph")]
  ForeignNode(Id),
  /// Topology cannot change while the graph is running.
  #[error("graph is running; stop it before changing its topology")]
  Running,
  /// `start` was called outside a tokio runtime.
  #[error("no tokio runtime available to spawn node tasks")]
  NoRuntime,
  /// A literal value does not match the port's declared type.
  #[error("port {port} expects {expected}, got {found}")]
  PortType {
    /// Port identity.
    port: Id,
    /// Declared type of the port.
    expected: ValueType,
    /// Variant of the rejected value.
    found: &'static str,
  },
}

/// Error returned when loading an engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The document is not valid configuration JSON.
  #[error("invalid engine configuration: {0}")]
  Json(#[from] serde_json::Error),
}
