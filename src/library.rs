//! # Node Library
//!
//! Templates from which node instances are created. A template names the node,
//! declares its ordered input ports and output label, and carries the logic
//! function every instance shares.
//!
//! The library is an ordinary value: build one, hand it to whatever needs to
//! create nodes.
//!
//! ```rust
//! use nodeflow::library::{InputSpec, Library};
//! use nodeflow::value::{Value, ValueType};
//!
//! let mut library = Library::new();
//! library.define(
//!   "Math/double",
//!   vec![InputSpec::new("number", ValueType::Integer)],
//!   "result",
//!   |args: &[Value]| match args {
//!     [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
//!     _ => Ok(Value::Empty),
//!   },
//! );
//! assert!(library.get("Math/double").is_some());
//! ```

use crate::error::LogicError;
use crate::value::{Value, ValueType};
use std::fmt;
use std::sync::Arc;

/// The computation a node performs on its collected input values.
///
/// Arguments arrive in port declaration order.
pub type Logic = Arc<dyn Fn(&[Value]) -> Result<Value, LogicError> + Send + Sync>;

/// Declaration of one input port of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
  /// Display label of the port.
  pub label: String,
  /// Declared type tag of the port.
  pub value_type: ValueType,
}

impl InputSpec {
  /// Creates an input declaration.
  pub fn new(label: impl Into<String>, value_type: ValueType) -> Self {
    Self {
      label: label.into(),
      value_type,
    }
  }
}

/// Blueprint for a node.
#[derive(Clone)]
pub struct NodeTemplate {
  name: String,
  inputs: Vec<InputSpec>,
  output_label: String,
  logic: Logic,
}

impl NodeTemplate {
  /// Creates a template. An empty `output_label` means the node has no output.
  pub fn new<F>(
    name: impl Into<String>,
    inputs: Vec<InputSpec>,
    output_label: impl Into<String>,
    logic: F,
  ) -> Self
  where
    F: Fn(&[Value]) -> Result<Value, LogicError> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      inputs,
      output_label: output_label.into(),
      logic: Arc::new(logic),
    }
  }

  /// Template name, e.g. `Math/add`.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Input declarations in port order.
  pub fn inputs(&self) -> &[InputSpec] {
    &self.inputs
  }

  /// Output label; empty when the node has no output.
  pub fn output_label(&self) -> &str {
    &self.output_label
  }

  /// Shared logic function.
  pub fn logic(&self) -> &Logic {
    &self.logic
  }

  /// Invokes the logic directly, outside of any graph.
  pub fn call(&self, args: &[Value]) -> Result<Value, LogicError> {
    (self.logic)(args)
  }
}

impl fmt::Debug for NodeTemplate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NodeTemplate")
      .field("name", &self.name)
      .field("inputs", &self.inputs)
      .field("output_label", &self.output_label)
      .finish_non_exhaustive()
  }
}

/// Ordered collection of node templates.
#[derive(Debug, Clone, Default)]
pub struct Library {
  templates: Vec<NodeTemplate>,
}

impl Library {
  /// Creates an empty library.
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a template built from its parts.
  pub fn define<F>(
    &mut self,
    name: impl Into<String>,
    inputs: Vec<InputSpec>,
    output_label: impl Into<String>,
    logic: F,
  ) -> &mut Self
  where
    F: Fn(&[Value]) -> Result<Value, LogicError> + Send + Sync + 'static,
  {
    self.insert(NodeTemplate::new(name, inputs, output_label, logic))
  }

  /// Adds a prepared template.
  pub fn insert(&mut self, template: NodeTemplate) -> &mut Self {
    self.templates.push(template);
    self
  }

  /// Looks a template up by name. The first definition wins on duplicates.
  pub fn get(&self, name: &str) -> Option<&NodeTemplate> {
    self.templates.iter().find(|t| t.name == name)
  }

  /// All templates in definition order, e.g. for a selection menu.
  pub fn templates(&self) -> &[NodeTemplate] {
    &self.templates
  }

  /// Number of templates.
  pub fn len(&self) -> usize {
    self.templates.len()
  }

  /// Returns `true` if no template is defined.
  pub fn is_empty(&self) -> bool {
    self.templates.is_empty()
  }
}
