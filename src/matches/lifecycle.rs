//! Match lifecycle
//!
//! Creating a match moves its participants to playing; resolving it updates
//! every participant's stats and then releases them from the line, all in
//! one transaction.

use crate::config::{MatchSettings, QueueSettings};
use crate::error::{CourtQueueError, Result};
use crate::matches::outcome::{decide_result, normalize_scores, validate_teams};
use crate::metrics::MetricsCollector;
use crate::queue::manager::next_available_court;
use crate::queue::WaitingLineManager;
use crate::stats::StatsLedger;
use crate::store::{with_deadline, LockTable, Store};
use crate::types::{GameScore, Match, MatchHistoryEntry, MatchId, MatchResult, NewMatch, ParticipantId};
use crate::utils::current_timestamp;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Creates, resolves and lists matches
pub struct MatchLifecycle {
    store: Arc<dyn Store>,
    locks: Arc<LockTable>,
    metrics: Arc<MetricsCollector>,
    courts: Vec<String>,
    settings: MatchSettings,
    timeout: Duration,
}

impl MatchLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        locks: Arc<LockTable>,
        metrics: Arc<MetricsCollector>,
        queue_settings: &QueueSettings,
        settings: MatchSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            locks,
            metrics,
            courts: queue_settings.courts.clone(),
            settings,
            timeout,
        }
    }

    /// Start a pending match; a blank court is assigned the next free one
    pub async fn create(
        &self,
        court: &str,
        team1: &[ParticipantId],
        team2: &[ParticipantId],
    ) -> Result<Match> {
        validate_teams(team1, team2)?;

        with_deadline(self.timeout, "create_match", async {
            let _queue = self.locks.queue().await;
            let mut tx = self.store.begin().await?;

            let court = match court.trim() {
                "" => next_available_court(tx.as_mut(), &self.courts).await?,
                label => label.to_string(),
            };
            let now = current_timestamp();

            let created = tx
                .insert_match(&NewMatch {
                    court,
                    team1: team1.to_vec(),
                    team2: team2.to_vec(),
                    started_at: now,
                })
                .await?;
            let playing =
                WaitingLineManager::mark_playing(tx.as_mut(), &created.participants(), now).await?;
            tx.commit().await?;

            self.metrics.record_match_created();
            info!(
                "Match created - id: {}, court: '{}', team1: {:?}, team2: {:?}, marked playing: {}",
                created.id, created.court, created.team1, created.team2, playing
            );
            Ok(created)
        })
        .await
    }

    /// Resolve a pending match from its game scores
    ///
    /// An unknown or already resolved match is reported before the scores
    /// are validated.
    pub async fn record_result(&self, match_id: MatchId, scores: &[GameScore]) -> Result<Match> {
        with_deadline(self.timeout, "record_result", async {
            let _queue = self.locks.queue().await;

            // Learn the participants first so their locks are taken before the write transaction
            let participants = {
                let mut tx = self.store.begin().await?;
                let found = tx
                    .get_match(match_id)
                    .await?
                    .ok_or(CourtQueueError::MatchNotFound { match_id })?;
                if !found.is_pending() {
                    return Err(CourtQueueError::MatchAlreadyResolved {
                        match_id,
                        result: found.result,
                    });
                }
                found.participants()
            };
            let scores = normalize_scores(scores)?;
            let result = decide_result(&scores);
            let _guards = self.locks.participants(&participants).await;

            let mut tx = self.store.begin().await?;
            let mut resolved = tx
                .get_match(match_id)
                .await?
                .ok_or(CourtQueueError::MatchNotFound { match_id })?;
            if !resolved.is_pending() {
                return Err(CourtQueueError::MatchAlreadyResolved {
                    match_id,
                    result: resolved.result,
                });
            }

            let now = current_timestamp();
            tx.resolve_match(match_id, result, now, &scores).await?;
            resolved.result = result;
            resolved.ended_at = Some(now);
            resolved.scores = scores.clone();

            let mut stats_updated = 0;
            if result != MatchResult::Draw {
                for participant_id in resolved.participants() {
                    StatsLedger::apply_outcome(
                        tx.as_mut(),
                        participant_id,
                        resolved.won_by(participant_id),
                    )
                    .await?;
                    stats_updated += 1;
                }
            }

            let released =
                WaitingLineManager::release_from_playing(tx.as_mut(), &resolved.participants())
                    .await?;
            tx.commit().await?;

            self.metrics.record_match_resolved(result, stats_updated);
            info!(
                "Match resolved - id: {}, result: {}, games: {}, stats updated: {}, released: {}",
                match_id,
                result,
                resolved.scores.len(),
                stats_updated,
                released
            );
            Ok(resolved)
        })
        .await
    }

    /// The participant's matches, newest first, each marked won or not
    pub async fn history(
        &self,
        participant_id: ParticipantId,
        limit: usize,
    ) -> Result<Vec<MatchHistoryEntry>> {
        let limit = self.settings.history_limit(limit);

        with_deadline(self.timeout, "history", async {
            let mut tx = self.store.begin().await?;
            let matches = tx.matches_for_participant(participant_id, limit).await?;
            debug!(
                "Loaded match history - participant: {}, limit: {}, found: {}",
                participant_id,
                limit,
                matches.len()
            );

            Ok(matches
                .into_iter()
                .map(|game| MatchHistoryEntry {
                    won: game.won_by(participant_id),
                    game,
                })
                .collect())
        })
        .await
    }

    /// Every pending match, newest start first
    pub async fn active_matches(&self) -> Result<Vec<Match>> {
        with_deadline(self.timeout, "active_matches", async {
            let mut tx = self.store.begin().await?;
            tx.pending_matches().await
        })
        .await
    }

    /// Resolved matches, most recently ended first
    pub async fn completed_matches(&self, limit: usize) -> Result<Vec<Match>> {
        let limit = self.settings.completed_limit(limit);

        with_deadline(self.timeout, "completed_matches", async {
            let mut tx = self.store.begin().await?;
            tx.completed_matches(limit).await
        })
        .await
    }
}
