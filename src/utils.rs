//! Utility functions for the queue engine

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Expected wait for someone at `position`, one match per person ahead
pub fn estimated_wait(position: u32, per_match: Duration) -> Duration {
    per_match * position.saturating_sub(1)
}

/// Human-readable wait label shown next to a queue position
pub fn wait_label(position: u32, minutes_per_match: u64) -> String {
    let minutes = u64::from(position.saturating_sub(1)) * minutes_per_match;
    if minutes == 0 {
        "Next up!".to_string()
    } else {
        format!("~{} min", minutes)
    }
}

/// Round to two decimal places
pub fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
