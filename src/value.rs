//! # Values
//!
//! Every edge in a graph carries [`Value`]s, a closed set of payload variants.
//! Ports declare a [`ValueType`] tag; logic functions match on the variant and
//! report a typed failure when they are handed something they cannot use.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type tag of an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
  /// Short single-line string.
  String,
  /// 64-bit signed integer.
  Integer,
  /// 64-bit float.
  Float,
  /// Free-form text, possibly multi-line.
  Text,
}

impl fmt::Display for ValueType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ValueType::String => "string",
      ValueType::Integer => "integer",
      ValueType::Float => "float",
      ValueType::Text => "text",
    };
    f.write_str(name)
  }
}

/// A value flowing through the graph.
///
/// `Empty` is what a node without a meaningful result produces (sinks such as
/// `IO/println`, or a failed invocation that is forwarded anyway).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
  /// Short single-line string.
  String(String),
  /// 64-bit signed integer.
  Integer(i64),
  /// 64-bit float.
  Float(f64),
  /// Free-form text.
  Text(String),
  /// No value.
  #[default]
  Empty,
}

impl Value {
  /// Returns the zero value for a declared port type.
  ///
  /// Ports are initialised with this when a node is created.
  pub fn zero(value_type: ValueType) -> Self {
    match value_type {
      ValueType::String => Value::String(String::new()),
      ValueType::Integer => Value::Integer(0),
      ValueType::Float => Value::Float(0.0),
      ValueType::Text => Value::Text(String::new()),
    }
  }

  /// Returns the type tag of this value, or `None` for [`Value::Empty`].
  pub fn value_type(&self) -> Option<ValueType> {
    match self {
      Value::String(_) => Some(ValueType::String),
      Value::Integer(_) => Some(ValueType::Integer),
      Value::Float(_) => Some(ValueType::Float),
      Value::Text(_) => Some(ValueType::Text),
      Value::Empty => None,
    }
  }

  /// Returns `true` for [`Value::Empty`].
  pub fn is_empty(&self) -> bool {
    matches!(self, Value::Empty)
  }

  /// Human readable name of the variant, used in error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::String(_) => "string",
      Value::Integer(_) => "integer",
      Value::Float(_) => "float",
      Value::Text(_) => "text",
      Value::Empty => "empty",
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::String(s) | Value::Text(s) => f.write_str(s),
      Value::Integer(i) => write!(f, "{}", i),
      Value::Float(x) => write!(f, "{}", x),
      Value::Empty => Ok(()),
    }
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Integer(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Float(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value)
  }
}
