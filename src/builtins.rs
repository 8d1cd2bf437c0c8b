//! # Built-in Nodes
//!
//! The stock node library:
//!
//! - `Time/now`: no inputs, emits the current second of the minute
//! - `Math/add`, `Math/subtract`: two numbers in, one number out
//! - `IO/println`: prints its input to stdout, no output

use crate::error::LogicError;
use crate::library::{InputSpec, Library};
use crate::value::{Value, ValueType};
use chrono::Timelike;

/// Builds a library holding every built-in template.
pub fn library() -> Library {
  let mut library = Library::new();
  library
    .define("Time/now", Vec::new(), "now", now)
    .define("Math/add", number_pair(), "result", add)
    .define("Math/subtract", number_pair(), "result", subtract)
    .define(
      "IO/println",
      vec![InputSpec::new("data", ValueType::Text)],
      "",
      println,
    );
  library
}

fn number_pair() -> Vec<InputSpec> {
  vec![
    InputSpec::new("number 1", ValueType::Integer),
    InputSpec::new("number 2", ValueType::Integer),
  ]
}

/// Current second of the minute.
pub fn now(_args: &[Value]) -> Result<Value, LogicError> {
  Ok(Value::Integer(i64::from(chrono::Local::now().second())))
}

/// Sum of two numbers. Integers stay integers; a float operand promotes.
pub fn add(args: &[Value]) -> Result<Value, LogicError> {
  arithmetic(args, i64::checked_add, |a, b| a + b, "addition")
}

/// Difference of two numbers.
pub fn subtract(args: &[Value]) -> Result<Value, LogicError> {
  arithmetic(args, i64::checked_sub, |a, b| a - b, "subtraction")
}

/// Prints the argument on its own line.
pub fn println(args: &[Value]) -> Result<Value, LogicError> {
  if let Some(data) = args.first() {
    println!("{}", data);
  }
  Ok(Value::Empty)
}

fn arithmetic(
  args: &[Value],
  int_op: fn(i64, i64) -> Option<i64>,
  float_op: fn(f64, f64) -> f64,
  name: &str,
) -> Result<Value, LogicError> {
  let [lhs, rhs, ..] = args else {
    return Err(LogicError::ArgumentCount {
      expected: 2,
      got: args.len(),
    });
  };
  match (lhs, rhs) {
    (Value::Integer(a), Value::Integer(b)) => int_op(*a, *b)
      .map(Value::Integer)
      .ok_or_else(|| LogicError::Failed(format!("integer overflow in {}", name))),
    _ => Ok(Value::Float(float_op(as_float(lhs, 0)?, as_float(rhs, 1)?))),
  }
}

fn as_float(value: &Value, position: usize) -> Result<f64, LogicError> {
  match value {
    Value::Integer(i) => Ok(*i as f64),
    Value::Float(x) => Ok(*x),
    other => Err(LogicError::TypeMismatch {
      position,
      expected: "number",
      found: other.kind(),
    }),
  }
}
