//! Operator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OperatorError, Result};

/// Maximum number of times a failing work item is requeued before it is dropped
pub const MAX_RETRIES: u32 = 10;

/// Runtime configuration for the stream controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    /// Base URL of the stream server's management API
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Namespace to watch (empty for all namespaces)
    #[serde(default)]
    pub namespace: String,

    /// Number of concurrent reconcile workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Requeues allowed per key before it is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay in milliseconds; doubles on each failure
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on the retry delay in seconds
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Timeout for each request to the stream server in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://nats:8222".to_string()
}

fn default_workers() -> usize {
    2
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_backoff_base_ms() -> u64 {
    5
}

fn default_backoff_max_secs() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            namespace: String::new(),
            workers: default_workers(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_secs: default_backoff_max_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl OperatorConfig {
    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(OperatorError::Configuration(
                "server URL must not be empty".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(OperatorError::Configuration(
                "at least one worker is required".to_string(),
            ));
        }
        if self.backoff_base() > self.backoff_max() {
            return Err(OperatorError::Configuration(format!(
                "backoff base {:?} exceeds backoff cap {:?}",
                self.backoff_base(),
                self.backoff_max()
            )));
        }
        Ok(())
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Namespace to watch, or `None` for all namespaces.
    pub fn watch_namespace(&self) -> Option<&str> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(&self.namespace)
        }
    }
}
