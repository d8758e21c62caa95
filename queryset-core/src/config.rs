//! Store-level configuration.
//!
//! Connection settings belong to the backend builders; this only holds the
//! deadlines the collection helpers apply around every backend call.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default ceiling for a single store operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Deadlines applied by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Deadline for each data-access call.
    pub operation_timeout: Duration,
    /// Deadline for each foreign lookup performed while resolving a join.
    pub join_timeout: Duration,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            join_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}
