//! # Engine Configuration
//!
//! Knobs that change how node tasks behave. Defaults reproduce the plain
//! dataflow semantics; everything can be overridden with the `with_*` builders
//! or loaded from JSON.
//!
//! ```rust
//! use nodeflow::config::{EngineConfig, FailedResultPolicy};
//! use std::time::Duration;
//!
//! let config = EngineConfig::default()
//!   .with_failed_results(FailedResultPolicy::Discard)
//!   .with_stop_grace(Duration::from_millis(500));
//! assert_eq!(config.failed_results, FailedResultPolicy::Discard);
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a node does with the result of a failed logic invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedResultPolicy {
  /// Send [`Value::Empty`](crate::value::Value::Empty) downstream anyway.
  #[default]
  Forward,
  /// Send nothing and start the next iteration.
  Discard,
}

/// Configuration shared by every node task of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Handling of failed logic results.
  pub failed_results: FailedResultPolicy,
  /// How long `stop` waits for tasks to acknowledge cancellation before
  /// aborting them.
  pub stop_grace: Duration,
}

impl EngineConfig {
  /// Parses a configuration from JSON. Missing fields take their defaults.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::Json`] if the document is malformed.
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(json)?)
  }

  /// Sets the failed result policy.
  pub fn with_failed_results(mut self, policy: FailedResultPolicy) -> Self {
    self.failed_results = policy;
    self
  }

  /// Sets the stop grace period.
  pub fn with_stop_grace(mut self, grace: Duration) -> Self {
    self.stop_grace = grace;
    self
  }
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      failed_results: FailedResultPolicy::Forward,
      stop_grace: Duration::from_secs(5),
    }
  }
}
