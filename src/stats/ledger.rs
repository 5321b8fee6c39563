//! Per-participant stats records
//!
//! Every read-modify-write of a record runs under that participant's keyed
//! lock, so concurrent match resolutions never lose an update.

use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::stats::tier;
use crate::store::{with_deadline, LockTable, Store, StoreTx};
use crate::types::{ParticipantId, UserStats};
use crate::utils::current_timestamp;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Derives and stores each participant's running record
pub struct StatsLedger {
    store: Arc<dyn Store>,
    locks: Arc<LockTable>,
    metrics: Arc<MetricsCollector>,
    timeout: Duration,
}

impl StatsLedger {
    pub fn new(
        store: Arc<dyn Store>,
        locks: Arc<LockTable>,
        metrics: Arc<MetricsCollector>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            locks,
            metrics,
            timeout,
        }
    }

    /// Fold one decided match into a participant's record in its own transaction
    pub async fn record_outcome(&self, participant_id: ParticipantId, won: bool) -> Result<UserStats> {
        with_deadline(self.timeout, "record_outcome", async {
            let _guards = self.locks.participants(&[participant_id]).await;
            let mut tx = self.store.begin().await?;
            let stats = Self::apply_outcome(tx.as_mut(), participant_id, won).await?;
            tx.commit().await?;
            self.metrics.matches().stats_updates_total.inc();
            Ok(stats)
        })
        .await
    }

    /// Read (or create zeroed) and update a record inside an open transaction
    ///
    /// The caller must hold the participant's lock.
    pub(crate) async fn apply_outcome(
        tx: &mut dyn StoreTx,
        participant_id: ParticipantId,
        won: bool,
    ) -> Result<UserStats> {
        let mut stats = tx
            .get_stats(participant_id)
            .await?
            .unwrap_or_else(|| UserStats::new(participant_id));

        tier::apply_outcome(&mut stats, won, current_timestamp());
        tx.put_stats(&stats).await?;

        info!(
            "Recorded match outcome - participant: {}, won: {}, streak: {}, level: {}",
            participant_id, won, stats.current_streak, stats.skill_level
        );
        Ok(stats)
    }

    /// Profile read; creates the zeroed record on first reference
    pub async fn get_stats(&self, participant_id: ParticipantId) -> Result<UserStats> {
        with_deadline(self.timeout, "get_stats", async {
            if let Some(stats) = self.read(participant_id).await? {
                return Ok(stats);
            }
            self.create_if_absent(participant_id).await
        })
        .await
    }

    /// Registration hook; idempotent
    pub async fn ensure_stats(&self, participant_id: ParticipantId) -> Result<UserStats> {
        with_deadline(self.timeout, "ensure_stats", self.create_if_absent(participant_id)).await
    }

    async fn read(&self, participant_id: ParticipantId) -> Result<Option<UserStats>> {
        let mut tx = self.store.begin().await?;
        let stats = tx.get_stats(participant_id).await?;
        debug!(
            "Loaded stats - participant: {}, present: {}",
            participant_id,
            stats.is_some()
        );
        Ok(stats)
    }

    async fn create_if_absent(&self, participant_id: ParticipantId) -> Result<UserStats> {
        let _guards = self.locks.participants(&[participant_id]).await;
        let mut tx = self.store.begin().await?;

        if let Some(existing) = tx.get_stats(participant_id).await? {
            return Ok(existing);
        }

        let stats = UserStats::new(participant_id);
        tx.put_stats(&stats).await?;
        tx.commit().await?;

        info!("Created stats record - participant: {}", participant_id);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CourtQueueError;
    use crate::store::{MemoryStore, MockStore};
    use crate::types::SkillLevel;

    fn ledger_on(store: Arc<dyn Store>) -> StatsLedger {
        StatsLedger::new(
            store,
            Arc::new(LockTable::new()),
            Arc::new(MetricsCollector::new().unwrap()),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_get_stats_creates_zeroed_record() {
        let ledger = ledger_on(Arc::new(MemoryStore::new()));

        let stats = ledger.get_stats(11).await.unwrap();
        assert_eq!(stats.total_matches, 0);
        assert_eq!(stats.skill_level, SkillLevel::Beginner);

        let again = ledger.ensure_stats(11).await.unwrap();
        assert_eq!(again, stats);
    }

    #[tokio::test]
    async fn test_record_outcome_accumulates() {
        let ledger = ledger_on(Arc::new(MemoryStore::new()));

        ledger.record_outcome(4, true).await.unwrap();
        let stats = ledger.record_outcome(4, false).await.unwrap();

        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.current_streak, -1);
        assert_eq!(stats.best_streak, 1);
        assert_eq!(ledger.get_stats(4).await.unwrap(), stats);
    }

    #[tokio::test]
    async fn test_concurrent_outcomes_are_not_lost() {
        let ledger = Arc::new(ledger_on(Arc::new(MemoryStore::new())));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.record_outcome(9, i % 2 == 0).await })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }

        let stats = ledger.get_stats(9).await.unwrap();
        assert_eq!(stats.total_matches, 20);
        assert_eq!(stats.wins, 10);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_retryable() {
        let mut store = MockStore::new();
        store
            .expect_begin()
            .returning(|| Err(CourtQueueError::store("connection refused")));

        let ledger = ledger_on(Arc::new(store));
        let err = ledger.record_outcome(1, true).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
