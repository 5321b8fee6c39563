//! Matches drawn from the waiting line and their results

pub mod lifecycle;
pub mod outcome;

pub use lifecycle::MatchLifecycle;
pub use outcome::{decide_result, normalize_scores, validate_teams};
