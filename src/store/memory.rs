//! In-memory store implementation
//!
//! Transactions are fully serialized: `begin` takes an exclusive lock on the
//! shared state and works on a private copy, which `commit` publishes.
//! Dropping the transaction discards the copy.

use crate::error::{CourtQueueError, Result};
use crate::store::{Store, StoreTx};
use crate::types::{
    EntryId, GameScore, Match, MatchId, MatchResult, NewMatch, ParticipantId, QueueEntry,
    QueueStatus, UserStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    entries: BTreeMap<EntryId, QueueEntry>,
    matches: BTreeMap<MatchId, Match>,
    stats: HashMap<ParticipantId, UserStats>,
    last_entry_id: EntryId,
    last_match_id: MatchId,
}

impl MemoryState {
    fn waiting_sorted(&self) -> Vec<QueueEntry> {
        let mut waiting: Vec<QueueEntry> = self
            .entries
            .values()
            .filter(|entry| entry.status == QueueStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by_key(|entry| (entry.position, entry.id));
        waiting
    }

    fn sorted_matches<F, K>(&self, filter: F, key: K) -> Vec<Match>
    where
        F: Fn(&Match) -> bool,
        K: Fn(&Match) -> (Option<DateTime<Utc>>, MatchId),
    {
        let mut matches: Vec<Match> = self
            .matches
            .values()
            .filter(|m| filter(*m))
            .cloned()
            .collect();
        matches.sort_by_key(|m| Reverse(key(m)));
        matches
    }
}

/// Store kept entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn entry_for(&mut self, participant_id: ParticipantId) -> Result<Option<QueueEntry>> {
        Ok(self
            .working
            .entries
            .values()
            .find(|entry| entry.participant_id == participant_id)
            .cloned())
    }

    async fn max_waiting_position(&mut self) -> Result<Option<u32>> {
        Ok(self
            .working
            .entries
            .values()
            .filter(|entry| entry.status == QueueStatus::Waiting)
            .map(|entry| entry.position)
            .max())
    }

    async fn count_waiting(&mut self) -> Result<usize> {
        Ok(self
            .working
            .entries
            .values()
            .filter(|entry| entry.status == QueueStatus::Waiting)
            .count())
    }

    async fn insert_entry(
        &mut self,
        participant_id: ParticipantId,
        position: u32,
        joined_at: DateTime<Utc>,
    ) -> Result<QueueEntry> {
        if self
            .working
            .entries
            .values()
            .any(|entry| entry.participant_id == participant_id)
        {
            return Err(CourtQueueError::integrity(format!(
                "participant {} already has an active queue entry",
                participant_id
            )));
        }

        self.working.last_entry_id += 1;
        let entry = QueueEntry {
            id: self.working.last_entry_id,
            participant_id,
            position,
            status: QueueStatus::Waiting,
            joined_at,
            called_at: None,
        };
        self.working.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn update_entry(&mut self, entry: &QueueEntry) -> Result<()> {
        match self.working.entries.get_mut(&entry.id) {
            Some(stored) => {
                stored.position = entry.position;
                stored.status = entry.status;
                stored.called_at = entry.called_at;
                Ok(())
            }
            None => Err(CourtQueueError::integrity(format!(
                "queue entry {} vanished during update",
                entry.id
            ))),
        }
    }

    async fn delete_entry(&mut self, entry_id: EntryId) -> Result<()> {
        match self.working.entries.remove(&entry_id) {
            Some(_) => Ok(()),
            None => Err(CourtQueueError::integrity(format!(
                "queue entry {} vanished during delete",
                entry_id
            ))),
        }
    }

    async fn lowest_waiting(&mut self, limit: usize) -> Result<Vec<QueueEntry>> {
        let mut waiting = self.working.waiting_sorted();
        waiting.truncate(limit);
        Ok(waiting)
    }

    async fn waiting_entries(&mut self) -> Result<Vec<QueueEntry>> {
        Ok(self.working.waiting_sorted())
    }

    async fn playing_entries(&mut self, limit: usize) -> Result<Vec<QueueEntry>> {
        let mut playing: Vec<QueueEntry> = self
            .working
            .entries
            .values()
            .filter(|entry| entry.status == QueueStatus::Playing)
            .cloned()
            .collect();
        playing.sort_by_key(|entry| Reverse((entry.called_at, entry.id)));
        playing.truncate(limit);
        Ok(playing)
    }

    async fn insert_match(&mut self, new_match: &NewMatch) -> Result<Match> {
        self.working.last_match_id += 1;
        let created = Match {
            id: self.working.last_match_id,
            court: new_match.court.clone(),
            team1: new_match.team1.clone(),
            team2: new_match.team2.clone(),
            result: MatchResult::Pending,
            scores: Vec::new(),
            started_at: new_match.started_at,
            ended_at: None,
            created_at: new_match.started_at,
        };
        self.working.matches.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_match(&mut self, match_id: MatchId) -> Result<Option<Match>> {
        Ok(self.working.matches.get(&match_id).cloned())
    }

    async fn resolve_match(
        &mut self,
        match_id: MatchId,
        result: MatchResult,
        ended_at: DateTime<Utc>,
        scores: &[GameScore],
    ) -> Result<()> {
        let stored = self
            .working
            .matches
            .get_mut(&match_id)
            .ok_or(CourtQueueError::MatchNotFound { match_id })?;
        stored.result = result;
        stored.ended_at = Some(ended_at);
        stored.scores = scores.to_vec();
        Ok(())
    }

    async fn matches_for_participant(
        &mut self,
        participant_id: ParticipantId,
        limit: usize,
    ) -> Result<Vec<Match>> {
        let mut matches = self.working.sorted_matches(
            |m| m.team_of(participant_id).is_some(),
            |m| (Some(m.started_at), m.id),
        );
        matches.truncate(limit);
        Ok(matches)
    }

    async fn pending_matches(&mut self) -> Result<Vec<Match>> {
        Ok(self
            .working
            .sorted_matches(|m| m.is_pending(), |m| (Some(m.started_at), m.id)))
    }

    async fn completed_matches(&mut self, limit: usize) -> Result<Vec<Match>> {
        let mut matches = self
            .working
            .sorted_matches(|m| !m.is_pending(), |m| (m.ended_at, m.id));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn count_pending_on_court(&mut self, court: &str) -> Result<usize> {
        Ok(self
            .working
            .matches
            .values()
            .filter(|m| m.is_pending() && m.court == court)
            .count())
    }

    async fn get_stats(&mut self, participant_id: ParticipantId) -> Result<Option<UserStats>> {
        Ok(self.working.stats.get(&participant_id).cloned())
    }

    async fn put_stats(&mut self, stats: &UserStats) -> Result<()> {
        self.working
            .stats
            .insert(stats.participant_id, stats.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
