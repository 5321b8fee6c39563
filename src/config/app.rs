//! Main application configuration
//!
//! This module defines the top-level configuration for the court-queue
//! engine, including environment variable loading, TOML files and validation.

use crate::config::queue::{MatchSettings, QueueSettings};
use crate::config::store::StoreSettings;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub store: StoreSettings,
    pub queue: QueueSettings,
    pub matches: MatchSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "court-queue".to_string(),
            log_level: "info".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", key, value)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Store settings
        if let Ok(url) = env::var("COURT_QUEUE_DATABASE_URL") {
            self.store.database_url = url;
        }
        if let Some(max) = parse_env("DATABASE_MAX_CONNECTIONS")? {
            self.store.max_connections = max;
        }
        if let Some(timeout) = parse_env("OPERATION_TIMEOUT_MS")? {
            self.store.operation_timeout_ms = timeout;
        }
        if let Some(timeout) = parse_env("BUSY_TIMEOUT_MS")? {
            self.store.busy_timeout_ms = timeout;
        }

        // Queue settings
        if let Some(count) = parse_env("DEFAULT_CALL_COUNT")? {
            self.queue.default_call_count = count;
        }
        if let Some(minutes) = parse_env("MINUTES_PER_MATCH")? {
            self.queue.minutes_per_match = minutes;
        }
        if let Some(limit) = parse_env("PLAYING_SNAPSHOT_LIMIT")? {
            self.queue.playing_snapshot_limit = limit;
        }
        if let Ok(courts) = env::var("COURTS") {
            self.queue.courts = courts
                .split(',')
                .map(|court| court.trim().to_string())
                .filter(|court| !court.is_empty())
                .collect();
        }

        // Match settings
        if let Some(limit) = parse_env("DEFAULT_HISTORY_LIMIT")? {
            self.matches.default_history_limit = limit;
        }
        if let Some(limit) = parse_env("MAX_HISTORY_LIMIT")? {
            self.matches.max_history_limit = limit;
        }

        Ok(())
    }

    /// Get the per-operation timeout as Duration
    pub fn operation_timeout(&self) -> Duration {
        self.store.operation_timeout()
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate store settings
    if config.store.database_url.is_empty() {
        return Err(anyhow!("Database URL cannot be empty"));
    }
    if config.store.max_connections == 0 {
        return Err(anyhow!("Max connections must be greater than 0"));
    }
    if config.store.operation_timeout_ms == 0 {
        return Err(anyhow!("Operation timeout must be greater than 0"));
    }

    // Validate queue settings
    if config.queue.default_call_count == 0 {
        return Err(anyhow!("Default call count must be greater than 0"));
    }
    if config.queue.courts.is_empty() {
        return Err(anyhow!("At least one court must be configured"));
    }
    if config.queue.playing_snapshot_limit == 0 {
        return Err(anyhow!("Playing snapshot limit must be greater than 0"));
    }

    // Validate match settings
    if config.matches.default_history_limit == 0 || config.matches.max_history_limit == 0 {
        return Err(anyhow!("History limits must be greater than 0"));
    }
    if config.matches.default_history_limit > config.matches.max_history_limit {
        return Err(anyhow!("Default history limit cannot exceed the maximum"));
    }

    Ok(())
}
