//! Transactional store interface and implementations
//!
//! Every engine operation runs inside one `StoreTx`. A transaction that is
//! dropped without `commit` rolls back, so a cancelled or timed-out
//! operation never leaves partial renumbering or partial stats behind.

pub mod locks;
pub mod memory;
pub mod retry;
pub mod sqlite;

pub use locks::LockTable;
pub use memory::MemoryStore;
pub use retry::retry_with_backoff;
pub use sqlite::SqliteStore;

use crate::error::{CourtQueueError, Result};
use crate::types::{
    EntryId, GameScore, Match, MatchId, MatchResult, NewMatch, ParticipantId, QueueEntry,
    UserStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// Entry point into the backing store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction; nothing it writes is visible until `commit`
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// One atomic unit of work against the three entity tables
#[async_trait]
pub trait StoreTx: Send {
    /// The participant's active entry (waiting, called or playing)
    async fn entry_for(&mut self, participant_id: ParticipantId) -> Result<Option<QueueEntry>>;

    /// `max(position)` among waiting entries
    async fn max_waiting_position(&mut self) -> Result<Option<u32>>;

    async fn count_waiting(&mut self) -> Result<usize>;

    /// Insert a waiting entry; a second active entry for the participant is an integrity violation
    async fn insert_entry(
        &mut self,
        participant_id: ParticipantId,
        position: u32,
        joined_at: DateTime<Utc>,
    ) -> Result<QueueEntry>;

    /// Persist position, status and called-at of an existing entry
    async fn update_entry(&mut self, entry: &QueueEntry) -> Result<()>;

    async fn delete_entry(&mut self, entry_id: EntryId) -> Result<()>;

    /// The `limit` lowest-position waiting entries, ascending
    async fn lowest_waiting(&mut self, limit: usize) -> Result<Vec<QueueEntry>>;

    /// Every waiting entry, ascending by position
    async fn waiting_entries(&mut self) -> Result<Vec<QueueEntry>>;

    /// Playing entries, most recently called first
    async fn playing_entries(&mut self, limit: usize) -> Result<Vec<QueueEntry>>;

    async fn insert_match(&mut self, new_match: &NewMatch) -> Result<Match>;

    async fn get_match(&mut self, match_id: MatchId) -> Result<Option<Match>>;

    /// Set result, end time and scores of a match in one write
    async fn resolve_match(
        &mut self,
        match_id: MatchId,
        result: MatchResult,
        ended_at: DateTime<Utc>,
        scores: &[GameScore],
    ) -> Result<()>;

    /// Matches containing the participant, newest start first
    async fn matches_for_participant(
        &mut self,
        participant_id: ParticipantId,
        limit: usize,
    ) -> Result<Vec<Match>>;

    /// Pending matches, newest start first
    async fn pending_matches(&mut self) -> Result<Vec<Match>>;

    /// Resolved matches, most recently ended first
    async fn completed_matches(&mut self, limit: usize) -> Result<Vec<Match>>;

    async fn count_pending_on_court(&mut self, court: &str) -> Result<usize>;

    async fn get_stats(&mut self, participant_id: ParticipantId) -> Result<Option<UserStats>>;

    /// Insert or replace a stats record
    async fn put_stats(&mut self, stats: &UserStats) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Run an engine operation under a deadline; expiry is a retryable store failure
pub async fn with_deadline<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CourtQueueError::store(format!(
            "{} timed out after {:?}",
            operation, limit
        ))),
    }
}
