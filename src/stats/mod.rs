//! Participant performance records derived from match outcomes

pub mod ledger;
pub mod tier;

pub use ledger::StatsLedger;
pub use tier::{apply_outcome, skill_points, tier};
