//! Queue and match facade
//!
//! The single entry point a transport layer talks to. It checks the caller's
//! capability, delegates to the engine components and records operation
//! latency and failures.

use crate::config::AppConfig;
use crate::error::{CourtQueueError, Result};
use crate::matches::MatchLifecycle;
use crate::metrics::MetricsCollector;
use crate::queue::WaitingLineManager;
use crate::service::auth::{Capability, Principal};
use crate::stats::StatsLedger;
use crate::store::{LockTable, SqliteStore, Store};
use crate::types::{
    CreateMatchRequest, Match, MatchHistoryEntry, ParticipantId, QueueEntry, QueueInfo,
    RecordResultRequest, UserStats,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Composed queue, match and stats service
pub struct CourtService {
    queue: WaitingLineManager,
    matches: MatchLifecycle,
    stats: StatsLedger,
    metrics: Arc<MetricsCollector>,
}

impl CourtService {
    /// Wire every component to one store and one lock table
    pub fn new(store: Arc<dyn Store>, config: &AppConfig, metrics: Arc<MetricsCollector>) -> Self {
        let locks = Arc::new(LockTable::new());
        let timeout = config.operation_timeout();

        info!(
            "Initializing court service - courts: {}, timeout: {:?}",
            config.queue.courts.len(),
            timeout
        );

        Self {
            queue: WaitingLineManager::new(
                store.clone(),
                locks.clone(),
                metrics.clone(),
                config.queue.clone(),
                timeout,
            ),
            matches: MatchLifecycle::new(
                store.clone(),
                locks.clone(),
                metrics.clone(),
                &config.queue,
                config.matches.clone(),
                timeout,
            ),
            stats: StatsLedger::new(store, locks, metrics.clone(), timeout),
            metrics,
        }
    }

    /// Open the configured SQLite database and build a service on it
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let store = SqliteStore::connect(&config.store).await?;
        let metrics = MetricsCollector::new().map_err(|e| CourtQueueError::ConfigurationError {
            message: format!("Failed to create metrics collector: {}", e),
        })?;
        Ok(Self::new(Arc::new(store), config, Arc::new(metrics)))
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Join the line as the calling participant
    pub async fn join(&self, principal: &Principal) -> Result<QueueEntry> {
        self.observe("join", self.queue.join(principal.participant_id))
            .await
    }

    /// Leave the line as the calling participant
    pub async fn leave(&self, principal: &Principal) -> Result<()> {
        self.observe("leave", self.queue.leave(principal.participant_id))
            .await
    }

    /// Call the next participants off the line
    pub async fn call_next(
        &self,
        principal: &Principal,
        count: Option<usize>,
    ) -> Result<Vec<QueueEntry>> {
        self.observe("call_next", async {
            principal.require(Capability::ManageQueue, "call_next")?;
            self.queue.call_next(count).await
        })
        .await
    }

    /// Snapshot of the line, from the caller's view when one is given
    pub async fn status(&self, principal: Option<&Principal>) -> Result<QueueInfo> {
        let participant_id = principal.map(|p| p.participant_id);
        self.observe("status", self.queue.status(participant_id))
            .await
    }

    pub async fn create_match(
        &self,
        principal: &Principal,
        request: &CreateMatchRequest,
    ) -> Result<Match> {
        self.observe("create_match", async {
            principal.require(Capability::ManageMatches, "create_match")?;
            self.matches
                .create(&request.court, &request.team1, &request.team2)
                .await
        })
        .await
    }

    pub async fn record_result(
        &self,
        principal: &Principal,
        request: &RecordResultRequest,
    ) -> Result<Match> {
        self.observe("record_result", async {
            principal.require(Capability::ManageMatches, "record_result")?;
            self.matches
                .record_result(request.match_id, &request.scores)
                .await
        })
        .await
    }

    /// The caller's own match history; a zero limit means the default
    pub async fn history(
        &self,
        principal: &Principal,
        limit: usize,
    ) -> Result<Vec<MatchHistoryEntry>> {
        self.observe(
            "history",
            self.matches.history(principal.participant_id, limit),
        )
        .await
    }

    pub async fn active_matches(&self, _principal: &Principal) -> Result<Vec<Match>> {
        self.observe("active_matches", self.matches.active_matches())
            .await
    }

    pub async fn completed_matches(&self, principal: &Principal, limit: usize) -> Result<Vec<Match>> {
        self.observe("completed_matches", async {
            principal.require(Capability::ManageMatches, "completed_matches")?;
            self.matches.completed_matches(limit).await
        })
        .await
    }

    /// Profile read for any participant; defaults to the caller
    pub async fn stats(
        &self,
        principal: &Principal,
        participant_id: Option<ParticipantId>,
    ) -> Result<UserStats> {
        let participant_id = participant_id.unwrap_or(principal.participant_id);
        self.observe("get_stats", self.stats.get_stats(participant_id))
            .await
    }

    /// Registration hook creating the caller's zeroed record
    pub async fn ensure_stats(&self, principal: &Principal) -> Result<UserStats> {
        self.observe(
            "ensure_stats",
            self.stats.ensure_stats(principal.participant_id),
        )
        .await
    }

    async fn observe<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timer = self.metrics.start_timer();
        let result = fut.await;
        let elapsed = timer.stop();
        self.metrics.record_operation(operation, elapsed);

        match &result {
            Ok(_) => debug!(
                "Operation completed - operation: '{}', time: {:.2}ms",
                operation,
                elapsed.as_secs_f64() * 1000.0
            ),
            Err(e) => {
                self.metrics.record_error(operation, e);
                if e.is_domain_error() {
                    debug!("Operation refused - operation: '{}', error: {}", operation, e);
                } else if e.is_retryable() {
                    warn!("Operation failed - operation: '{}', error: {}", operation, e);
                } else {
                    error!("Operation failed - operation: '{}', error: {}", operation, e);
                }
            }
        }
        result
    }
}
