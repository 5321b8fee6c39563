//! Store configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and timeout settings for the backing store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite URL, e.g. `sqlite://court-queue.db` or `sqlite::memory:`
    pub database_url: String,
    /// Maximum pooled connections (forced to 1 for in-memory databases)
    pub max_connections: u32,
    /// Upper bound for a whole engine operation, lock waits included
    pub operation_timeout_ms: u64,
    /// How long SQLite waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://court-queue.db".to_string(),
            max_connections: 5,
            operation_timeout_ms: 5_000,
            busy_timeout_ms: 2_000,
        }
    }
}

impl StoreSettings {
    /// Settings for a throwaway in-memory database
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
