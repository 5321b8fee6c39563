//! The shared waiting line
//!
//! Join, leave and call-next with dense renumbering, plus the playing-state
//! transitions driven by the match lifecycle.

pub mod manager;
pub mod positions;

pub use manager::WaitingLineManager;
