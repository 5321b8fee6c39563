//! Queue and match configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Waiting-line settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// How many participants a call without an explicit count selects
    pub default_call_count: usize,
    /// Assumed duration of one match, used for wait estimates
    pub minutes_per_match: u64,
    /// How many playing entries a status snapshot includes
    pub playing_snapshot_limit: usize,
    /// Court labels, in preference order
    pub courts: Vec<String>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            default_call_count: 4, // one doubles match
            minutes_per_match: 5,
            playing_snapshot_limit: 8,
            courts: (1..=4).map(|n| format!("Court {}", n)).collect(),
        }
    }
}

impl QueueSettings {
    pub fn per_match(&self) -> Duration {
        Duration::from_secs(self.minutes_per_match * 60)
    }
}

/// Match listing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// History size when the caller passes 0
    pub default_history_limit: usize,
    /// Hard cap on any history request
    pub max_history_limit: usize,
    /// Completed-match listing size when the caller passes 0
    pub default_completed_limit: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            default_history_limit: 20,
            max_history_limit: 100,
            default_completed_limit: 50,
        }
    }
}

impl MatchSettings {
    /// Resolve a caller-supplied history limit
    pub fn history_limit(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_history_limit
        } else {
            requested.min(self.max_history_limit)
        }
    }

    /// Resolve a caller-supplied completed-match limit
    pub fn completed_limit(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_completed_limit
        } else {
            requested.min(self.max_history_limit)
        }
    }
}
