// Engine configuration surface

use crate::application::constants::{
    DEFAULT_CAPACITY, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, MAX_CAPACITY, MAX_TIMEOUT,
};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one batch.
///
/// Deserializable so the binary can layer it from a file and environment;
/// missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum operations running at once
    pub capacity: usize,
    /// Per-target timeout, measured from submission
    pub timeout_secs: u64,
    /// Emit progress after each drain pass
    pub show_progress: bool,
    /// Passed to operations through the shared context
    pub verbose: bool,
    /// Upper bound on the wait between blocking drain passes
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            show_progress: false,
            verbose: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject values the engine cannot run with
    ///
    /// # Errors
    /// - EngineError::Config for a zero or oversized capacity, a zero or
    ///   oversized timeout, or a zero poll interval
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(EngineError::Config("capacity must be at least 1".to_string()));
        }
        if self.capacity > MAX_CAPACITY {
            return Err(EngineError::Config(format!(
                "capacity {} exceeds maximum {}",
                self.capacity, MAX_CAPACITY
            )));
        }
        if self.timeout_secs == 0 {
            return Err(EngineError::Config("timeout_secs must be positive".to_string()));
        }
        if self.timeout_secs > MAX_TIMEOUT.as_secs() {
            return Err(EngineError::Config(format!(
                "timeout_secs {} exceeds maximum {}",
                self.timeout_secs,
                MAX_TIMEOUT.as_secs()
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
