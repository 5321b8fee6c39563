//! Court Queue - queue and match lifecycle engine for badminton courts
//!
//! This crate keeps a single shared waiting line with dense positions under
//! concurrent join/leave/call, draws matches from it, and derives each
//! participant's running statistics from match results.

pub mod config;
pub mod error;
pub mod matches;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{CourtQueueError, Result};
pub use types::*;

// Re-export key components
pub use matches::MatchLifecycle;
pub use queue::WaitingLineManager;
pub use service::{Capability, CourtService, Principal, Role};
pub use stats::StatsLedger;
pub use store::{MemoryStore, SqliteStore, Store, StoreTx};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
