//! Configuration management for the court-queue engine
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod queue;
pub mod store;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use queue::{MatchSettings, QueueSettings};
pub use store::StoreSettings;
