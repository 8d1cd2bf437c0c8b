//! # nodeflow
//!
//! A concurrent dataflow engine for node graphs.
//!
//! Small units of computation ("nodes") are wired into a directed graph. When
//! the graph runs, every node gets its own task: it waits for a value on each
//! linked input, invokes its logic, and hands the result to every consumer of
//! its output. Edges are unbuffered, so producers are paced by their consumers
//! and execution order emerges from data availability alone.
//!
//! ## Key Pieces
//!
//! - [`library::Library`]: node templates (name, inputs, output, logic)
//! - [`graph::Graph`]: owns nodes and edges, assigns identities, starts and stops execution
//! - [`channels::Observer`]: watch the values a node produces
//! - [`builtins`]: the stock node library
//!
//! ## Quick Start
//!
//! ```rust
//! use nodeflow::graph::Graph;
//! use nodeflow::library::Library;
//! use nodeflow::value::Value;
//!
//! # tokio_test::block_on(async {
//! let mut library = Library::new();
//! library.define("Const/42", Vec::new(), "value", |_: &[Value]| Ok(Value::Integer(42)));
//!
//! let mut graph = Graph::new();
//! let answer = graph.add_node(library.get("Const/42").unwrap());
//! let values = graph.observe(answer).unwrap();
//! graph.start().unwrap();
//! assert_eq!(values.recv().await, Some(Value::Integer(42)));
//! graph.stop().await;
//! # });
//! ```

#![deny(missing_docs)]

/// The stock node library.
pub mod builtins;
/// Rendezvous edge channels and output observers.
pub mod channels;
/// Engine configuration.
pub mod config;
/// Error types.
pub mod error;
mod execution;
/// Graph ownership, identities, topology and lifecycle.
pub mod graph;
/// Node templates and the template registry.
pub mod library;
/// Node instances.
pub mod node;
/// Input ports.
pub mod port;
/// Values carried on edges.
pub mod value;

pub use config::EngineConfig;
pub use error::{GraphError, LogicError};
pub use graph::{Edge, Graph, Id};
pub use library::{InputSpec, Library, NodeTemplate};
pub use value::{Value, ValueType};

#[cfg(test)]
mod graph_test;
