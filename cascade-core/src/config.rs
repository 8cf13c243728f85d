//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default cap on effect drain rounds per flush.
pub const DEFAULT_MAX_FLUSH_ITERATIONS: usize = 100;

/// Tunables for one [`Runtime`](crate::Runtime).
///
/// ```rust
/// use cascade_core::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json_str(r#"{ "max_flush_iterations": 8 }"#).unwrap();
/// assert_eq!(config.max_flush_iterations, 8);
/// assert!(!config.trace_reads);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many drain rounds a single flush may take before it gives up with
    /// `ScheduledLoopExceeded`. A round runs every effect that was pending
    /// when it started.
    pub max_flush_iterations: usize,

    /// Emit a `trace` event for every dependency registration. Noisy.
    pub trace_reads: bool,
}

impl RuntimeConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_flush_iterations == 0 {
            return Err(ConfigError::ZeroFlushIterations);
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_flush_iterations: DEFAULT_MAX_FLUSH_ITERATIONS,
            trace_reads: false,
        }
    }
}
