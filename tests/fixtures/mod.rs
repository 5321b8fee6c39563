//! Test fixtures shared by the integration test crates
#![allow(dead_code)]

use async_trait::async_trait;
use court_queue::config::{AppConfig, StoreSettings};
use court_queue::error::Result;
use court_queue::metrics::MetricsCollector;
use court_queue::store::{Store, StoreTx};
use court_queue::types::{CreateMatchRequest, GameScore, ParticipantId, RecordResultRequest};
use court_queue::{CourtService, MemoryStore, Principal, SqliteStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A complete service on a fresh in-memory store
pub fn memory_service() -> (CourtService, Arc<dyn Store>) {
    service_on(Arc::new(MemoryStore::new()), AppConfig::default())
}

/// A complete service on a fresh in-memory SQLite database
pub async fn sqlite_service() -> (CourtService, Arc<dyn Store>) {
    let store = SqliteStore::connect(&StoreSettings::in_memory())
        .await
        .expect("Failed to open in-memory SQLite store");
    service_on(Arc::new(store), AppConfig::default())
}

/// A complete service on a SQLite file in a fresh temp directory, with the
/// default pool size and WAL journal
///
/// Keep the returned directory alive for as long as the service is used.
pub async fn file_sqlite_service() -> (CourtService, Arc<dyn Store>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let settings = StoreSettings {
        database_url: format!("sqlite://{}", dir.path().join("court-queue.db").display()),
        ..StoreSettings::default()
    };
    let store = SqliteStore::connect(&settings)
        .await
        .expect("Failed to open file-backed SQLite store");
    let (service, store) = service_on(Arc::new(store), AppConfig::default());
    (service, store, dir)
}

pub fn service_on(store: Arc<dyn Store>, config: AppConfig) -> (CourtService, Arc<dyn Store>) {
    let metrics = Arc::new(MetricsCollector::new().expect("Failed to create metrics collector"));
    (CourtService::new(store.clone(), &config, metrics), store)
}

pub fn organizer() -> Principal {
    Principal::new(1_000, "organizer")
}

pub fn admin() -> Principal {
    Principal::new(1_001, "admin")
}

pub fn player(id: ParticipantId) -> Principal {
    Principal::new(id, "player")
}

pub fn match_request(court: &str, team1: &[ParticipantId], team2: &[ParticipantId]) -> CreateMatchRequest {
    CreateMatchRequest {
        court: court.to_string(),
        team1: team1.to_vec(),
        team2: team2.to_vec(),
    }
}

pub fn result_request(match_id: i64, games: &[(i32, i32)]) -> RecordResultRequest {
    RecordResultRequest {
        match_id,
        scores: games
            .iter()
            .enumerate()
            .map(|(i, &(team1, team2))| GameScore::new(i as u32 + 1, team1, team2))
            .collect(),
    }
}

/// Waiting participants with their positions, front of the line first
pub async fn waiting_positions(store: &Arc<dyn Store>) -> Vec<(ParticipantId, u32)> {
    let mut tx = store.begin().await.expect("Failed to open transaction");
    tx.waiting_entries()
        .await
        .expect("Failed to read waiting entries")
        .iter()
        .map(|entry| (entry.participant_id, entry.position))
        .collect()
}

/// Panic unless waiting positions read exactly 1..K
pub async fn assert_dense_positions(store: &Arc<dyn Store>) -> usize {
    let positions = waiting_positions(store).await;
    for (index, (participant, position)) in positions.iter().enumerate() {
        assert_eq!(
            *position,
            index as u32 + 1,
            "participant {} holds position {} in {:?}",
            participant,
            position,
            positions
        );
    }
    positions.len()
}

/// Store whose transactions never open, for timeout tests
pub struct StalledStore;

#[async_trait]
impl Store for StalledStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        unreachable!("stalled store never opens a transaction")
    }
}
