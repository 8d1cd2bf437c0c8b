//! # Node Execution Loop
//!
//! One task per node per run. Each iteration:
//!
//! 1. checks the run's cancellation token without blocking
//! 2. collects one argument per input port, in declaration order: a linked
//!    port waits for the next value on its edge, an unlinked port contributes
//!    its current literal
//! 3. invokes the logic with the argument sequence
//! 4. sends the result on every outbound edge, in link order, each send
//!    waiting until its consumer takes the value
//!
//! A node without inputs therefore free-runs, paced only by its consumers.
//! Both waits race against the cancellation token, so a stopped graph never
//! leaves a task parked on a channel.
//!
//! Logic failures are logged and never end the task.

use crate::channels::EdgeSender;
use crate::config::FailedResultPolicy;
use crate::error::LogicError;
use crate::graph::Id;
use crate::library::Logic;
use crate::port::PortInput;
use crate::value::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Everything a node task needs for one run, detached from the graph.
pub(crate) struct NodeTask {
  pub(crate) id: Id,
  pub(crate) name: String,
  pub(crate) inputs: Vec<PortInput>,
  pub(crate) outputs: Vec<EdgeSender>,
  pub(crate) logic: Logic,
  pub(crate) failed_results: FailedResultPolicy,
}

impl NodeTask {
  /// Runs the loop until `token` is cancelled. Returns the node identity.
  pub(crate) async fn run(self, token: CancellationToken) -> Id {
    debug!(node_id = self.id, node = %self.name, "node task started");
    let mut iterations: u64 = 0;
    loop {
      if token.is_cancelled() {
        break;
      }
      // Free-running nodes have no other await point on this path.
      tokio::task::yield_now().await;

      let Some(args) = self.collect(&token).await else {
        break;
      };
      if args.len() != self.inputs.len() {
        let err = LogicError::ArgumentCount {
          expected: self.inputs.len(),
          got: args.len(),
        };
        error!(node_id = self.id, node = %self.name, error = %err, "skipping invocation");
        continue;
      }

      iterations += 1;
      let result = match self.invoke(&args) {
        Ok(value) => value,
        Err(err) => {
          error!(node_id = self.id, node = %self.name, error = %err, "execution failed");
          match self.failed_results {
            FailedResultPolicy::Forward => Value::Empty,
            FailedResultPolicy::Discard => continue,
          }
        }
      };

      if !self.emit(result, &token).await {
        break;
      }
    }
    debug!(node_id = self.id, node = %self.name, iterations, "node task stopped");
    self.id
  }

  /// Gathers one value per port. `None` means the run was cancelled.
  async fn collect(&self, token: &CancellationToken) -> Option<Vec<Value>> {
    let mut args = Vec::with_capacity(self.inputs.len());
    for input in &self.inputs {
      let value = match input {
        PortInput::Literal(literal) => literal.borrow().clone(),
        PortInput::Linked(rx) => {
          tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            received = rx.recv() => match received {
              Some(value) => value,
              None => {
                // The producer is gone for good; nothing will ever arrive.
                debug!(node_id = self.id, node = %self.name, "input channel closed, parking");
                token.cancelled().await;
                return None;
              }
            },
          }
        }
      };
      args.push(value);
    }
    Some(args)
  }

  fn invoke(&self, args: &[Value]) -> Result<Value, LogicError> {
    match catch_unwind(AssertUnwindSafe(|| (self.logic)(args))) {
      Ok(result) => result,
      Err(payload) => {
        let message = payload
          .downcast_ref::<&str>()
          .map(|s| s.to_string())
          .or_else(|| payload.downcast_ref::<String>().cloned())
          .unwrap_or_else(|| "unknown panic".to_string());
        Err(LogicError::Panicked(message))
      }
    }
  }

  /// Sends `value` on every outbound edge. Returns `false` if cancelled.
  async fn emit(&self, value: Value, token: &CancellationToken) -> bool {
    for tx in &self.outputs {
      tokio::select! {
        biased;
        _ = token.cancelled() => return false,
        sent = tx.send(value.clone()) => {
          if sent.is_err() {
            trace!(node_id = self.id, "outbound edge closed, skipped");
          }
        }
      }
    }
    true
  }
}
