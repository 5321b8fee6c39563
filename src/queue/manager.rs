//! Waiting-line manager
//!
//! Owns the ordered set of waiting entries. Every mutation of the waiting set
//! runs under the global queue lock inside one store transaction, so join,
//! leave and call never interleave with each other's renumbering.

use crate::config::QueueSettings;
use crate::error::{CourtQueueError, Result};
use crate::metrics::MetricsCollector;
use crate::queue::positions::{renumber, verify_dense};
use crate::store::{with_deadline, LockTable, Store, StoreTx};
use crate::types::{ParticipantId, QueueEntry, QueueInfo, QueueStatus};
use crate::utils::{current_timestamp, estimated_wait, wait_label};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Manages the single shared waiting line
pub struct WaitingLineManager {
    store: Arc<dyn Store>,
    locks: Arc<LockTable>,
    metrics: Arc<MetricsCollector>,
    settings: QueueSettings,
    timeout: Duration,
}

impl WaitingLineManager {
    pub fn new(
        store: Arc<dyn Store>,
        locks: Arc<LockTable>,
        metrics: Arc<MetricsCollector>,
        settings: QueueSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            locks,
            metrics,
            settings,
            timeout,
        }
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Append the participant at the back of the line
    pub async fn join(&self, participant_id: ParticipantId) -> Result<QueueEntry> {
        with_deadline(self.timeout, "join", async {
            let _queue = self.locks.queue().await;
            let mut tx = self.store.begin().await?;

            if let Some(existing) = tx.entry_for(participant_id).await? {
                debug!(
                    "Join refused - participant: {}, status: {}",
                    participant_id, existing.status
                );
                return Err(CourtQueueError::AlreadyQueued { participant_id });
            }

            let position = tx.max_waiting_position().await?.unwrap_or(0) + 1;
            let entry = tx
                .insert_entry(participant_id, position, current_timestamp())
                .await?;
            let waiting = verify_dense(tx.as_mut()).await?;
            tx.commit().await?;

            self.metrics.record_join(waiting);
            info!(
                "Participant joined queue - participant: {}, position: {}",
                participant_id, entry.position
            );
            Ok(entry)
        })
        .await
    }

    /// Remove the participant's waiting entry and close the gap
    pub async fn leave(&self, participant_id: ParticipantId) -> Result<()> {
        with_deadline(self.timeout, "leave", async {
            let _queue = self.locks.queue().await;
            let mut tx = self.store.begin().await?;

            let entry = match tx.entry_for(participant_id).await? {
                Some(entry) if entry.status == QueueStatus::Waiting => entry,
                _ => return Err(CourtQueueError::NotQueued { participant_id }),
            };

            tx.delete_entry(entry.id).await?;
            let waiting = renumber(tx.as_mut()).await?;
            tx.commit().await?;

            self.metrics.record_leave(waiting);
            info!(
                "Participant left queue - participant: {}, vacated position: {}, remaining: {}",
                participant_id, entry.position, waiting
            );
            Ok(())
        })
        .await
    }

    /// Call the `count` front-most waiting participants
    ///
    /// `None` or zero calls the configured default. Returns the called entries
    /// in ascending position order.
    pub async fn call_next(&self, count: Option<usize>) -> Result<Vec<QueueEntry>> {
        let count = match count {
            None | Some(0) => self.settings.default_call_count,
            Some(n) => n,
        };

        with_deadline(self.timeout, "call_next", async {
            let _queue = self.locks.queue().await;
            let mut tx = self.store.begin().await?;

            let mut called = tx.lowest_waiting(count).await?;
            if called.is_empty() {
                return Err(CourtQueueError::QueueEmpty);
            }

            let now = current_timestamp();
            for entry in called.iter_mut() {
                entry.status = QueueStatus::Called;
                entry.called_at = Some(now);
                tx.update_entry(entry).await?;
            }
            let waiting = renumber(tx.as_mut()).await?;
            tx.commit().await?;

            self.metrics.record_call(called.len(), waiting);
            info!(
                "Called participants from queue - requested: {}, called: {}, remaining: {}",
                count,
                called.len(),
                waiting
            );
            Ok(called)
        })
        .await
    }

    /// Read-only snapshot of the line, optionally from one participant's view
    pub async fn status(&self, participant_id: Option<ParticipantId>) -> Result<QueueInfo> {
        with_deadline(self.timeout, "status", async {
            let mut tx = self.store.begin().await?;

            let total_in_queue = tx.count_waiting().await?;
            let your_position = match participant_id {
                Some(id) => tx
                    .entry_for(id)
                    .await?
                    .filter(|entry| entry.status == QueueStatus::Waiting)
                    .map(|entry| entry.position),
                None => None,
            };

            let next_court = match your_position {
                Some(_) => Some(next_available_court(tx.as_mut(), &self.settings.courts).await?),
                None => None,
            };
            let currently_playing = tx
                .playing_entries(self.settings.playing_snapshot_limit)
                .await?;

            debug!(
                "Queue status - waiting: {}, position: {:?}, playing: {}",
                total_in_queue,
                your_position,
                currently_playing.len()
            );

            Ok(QueueInfo {
                total_in_queue,
                your_position,
                estimated_wait: your_position
                    .map(|position| estimated_wait(position, self.settings.per_match())),
                estimated_wait_label: your_position
                    .map(|position| wait_label(position, self.settings.minutes_per_match)),
                next_court,
                currently_playing,
            })
        })
        .await
    }

    /// Move waiting or called entries to playing; absent or already playing entries are skipped
    ///
    /// The caller must hold the queue lock. Returns the number of entries moved.
    pub(crate) async fn mark_playing(
        tx: &mut dyn StoreTx,
        participant_ids: &[ParticipantId],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut moved = 0;
        let mut left_waiting_set = false;

        for &participant_id in participant_ids {
            let Some(mut entry) = tx.entry_for(participant_id).await? else {
                debug!(
                    "No queue entry to mark playing - participant: {}",
                    participant_id
                );
                continue;
            };

            if !entry.status.can_advance_to(QueueStatus::Playing) {
                warn!(
                    "Participant already playing, skipping - participant: {}, entry: {}",
                    participant_id, entry.id
                );
                continue;
            }

            left_waiting_set |= entry.status == QueueStatus::Waiting;
            entry.status = QueueStatus::Playing;
            entry.called_at.get_or_insert(now);
            tx.update_entry(&entry).await?;
            moved += 1;
        }

        if left_waiting_set {
            renumber(tx).await?;
        }
        Ok(moved)
    }

    /// Remove the playing entries of the listed participants
    ///
    /// Returns the number of entries removed.
    pub(crate) async fn release_from_playing(
        tx: &mut dyn StoreTx,
        participant_ids: &[ParticipantId],
    ) -> Result<usize> {
        let mut released = 0;

        for &participant_id in participant_ids {
            match tx.entry_for(participant_id).await? {
                Some(entry) if entry.status == QueueStatus::Playing => {
                    tx.delete_entry(entry.id).await?;
                    released += 1;
                }
                other => debug!(
                    "Nothing to release - participant: {}, status: {:?}",
                    participant_id,
                    other.map(|entry| entry.status)
                ),
            }
        }
        Ok(released)
    }
}

/// First configured court without a pending match, else the first court
pub(crate) async fn next_available_court(
    tx: &mut dyn StoreTx,
    courts: &[String],
) -> Result<String> {
    for court in courts {
        if tx.count_pending_on_court(court).await? == 0 {
            return Ok(court.clone());
        }
    }
    courts
        .first()
        .cloned()
        .ok_or_else(|| CourtQueueError::ConfigurationError {
            message: "no courts configured".to_string(),
        })
}
