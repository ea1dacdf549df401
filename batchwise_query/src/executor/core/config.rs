use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for request dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum number of batches executing at the same time.
    /// Batches waiting on dependencies do not count against it.
    pub max_concurrent_batches: usize,
    /// Deadline for a whole request, `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_batches: 32,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl DispatchConfig {
    pub fn with_max_concurrent_batches(mut self, max_concurrent_batches: usize) -> Self {
        self.max_concurrent_batches = max_concurrent_batches;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_batches == 0 {
            return Err("max_concurrent_batches must be greater than zero".into());
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err("request_timeout cannot be zero".into());
        }
        Ok(())
    }
}
