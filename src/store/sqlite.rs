//! SQLite store implementation backed by sqlx
//!
//! Teams are stored one row per participant in `match_players` and game
//! scores in `match_scores`. A unique index on `queue_entries.participant_id`
//! enforces one active entry per participant; finished entries are deleted.

use crate::config::StoreSettings;
use crate::error::{CourtQueueError, Result};
use crate::store::{Store, StoreTx};
use crate::types::{
    EntryId, GameScore, Match, MatchId, MatchResult, NewMatch, ParticipantId, QueueEntry,
    QueueStatus, SkillLevel, UserStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS queue_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        participant_id INTEGER NOT NULL,
        position INTEGER NOT NULL CHECK (position > 0),
        status TEXT NOT NULL CHECK (status IN ('waiting', 'called', 'playing')),
        joined_at TEXT NOT NULL,
        called_at TEXT
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_entries_participant
        ON queue_entries (participant_id)",
    "CREATE INDEX IF NOT EXISTS idx_queue_entries_status_position
        ON queue_entries (status, position)",
    "CREATE TABLE IF NOT EXISTS matches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        court TEXT NOT NULL,
        result TEXT NOT NULL DEFAULT 'pending'
            CHECK (result IN ('pending', 'team1', 'team2', 'draw')),
        started_at TEXT NOT NULL,
        ended_at TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS match_players (
        match_id INTEGER NOT NULL REFERENCES matches (id),
        participant_id INTEGER NOT NULL,
        team INTEGER NOT NULL CHECK (team IN (1, 2)),
        slot INTEGER NOT NULL,
        PRIMARY KEY (match_id, participant_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_match_players_participant
        ON match_players (participant_id)",
    "CREATE TABLE IF NOT EXISTS match_scores (
        match_id INTEGER NOT NULL REFERENCES matches (id),
        game_number INTEGER NOT NULL,
        team1_score INTEGER NOT NULL CHECK (team1_score >= 0),
        team2_score INTEGER NOT NULL CHECK (team2_score >= 0),
        PRIMARY KEY (match_id, game_number)
    )",
    "CREATE TABLE IF NOT EXISTS user_stats (
        participant_id INTEGER PRIMARY KEY,
        total_matches INTEGER NOT NULL DEFAULT 0,
        wins INTEGER NOT NULL DEFAULT 0,
        losses INTEGER NOT NULL DEFAULT 0,
        win_rate REAL NOT NULL DEFAULT 0,
        current_streak INTEGER NOT NULL DEFAULT 0,
        best_streak INTEGER NOT NULL DEFAULT 0,
        skill_level TEXT NOT NULL DEFAULT 'Beginner',
        skill_points INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL
    )",
];

const ENTRY_COLUMNS: &str = "id, participant_id, position, status, joined_at, called_at";
const MATCH_COLUMNS: &str = "id, court, result, started_at, ended_at, created_at";

fn map_sqlx(context: &str, err: sqlx::Error) -> CourtQueueError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return CourtQueueError::integrity(format!("{}: {}", context, db_err));
        }
    }
    CourtQueueError::store(format!("{}: {}", context, err))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| map_sqlx(&format!("decode column {}", name), e))
}

fn narrow<T: TryFrom<i64>>(value: i64, name: &str) -> Result<T> {
    T::try_from(value)
        .map_err(|_| CourtQueueError::integrity(format!("{} out of range: {}", name, value)))
}

fn entry_from_row(row: &SqliteRow) -> Result<QueueEntry> {
    let status: String = column(row, "status")?;
    Ok(QueueEntry {
        id: column(row, "id")?,
        participant_id: column(row, "participant_id")?,
        position: narrow(column(row, "position")?, "position")?,
        status: QueueStatus::from_str(&status).map_err(CourtQueueError::integrity)?,
        joined_at: column(row, "joined_at")?,
        called_at: column(row, "called_at")?,
    })
}

fn stats_from_row(row: &SqliteRow) -> Result<UserStats> {
    let skill_level: String = column(row, "skill_level")?;
    Ok(UserStats {
        participant_id: column(row, "participant_id")?,
        total_matches: narrow(column(row, "total_matches")?, "total_matches")?,
        wins: narrow(column(row, "wins")?, "wins")?,
        losses: narrow(column(row, "losses")?, "losses")?,
        win_rate: column(row, "win_rate")?,
        current_streak: narrow(column(row, "current_streak")?, "current_streak")?,
        best_streak: narrow(column(row, "best_streak")?, "best_streak")?,
        skill_level: SkillLevel::from_str(&skill_level).map_err(CourtQueueError::integrity)?,
        skill_points: narrow(column(row, "skill_points")?, "skill_points")?,
        updated_at: column(row, "updated_at")?,
    })
}

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database described by `settings`
    pub async fn connect(settings: &StoreSettings) -> Result<Self> {
        let mut options = SqliteConnectOptions::from_str(&settings.database_url)
            .map_err(|e| map_sqlx("parse database url", e))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(settings.busy_timeout());

        // Every connection to `:memory:` is its own database, so keep exactly one alive
        let max_connections = if settings.is_in_memory() {
            1
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
            settings.max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .idle_timeout(None::<std::time::Duration>)
            .max_lifetime(None::<std::time::Duration>)
            .acquire_timeout(settings.operation_timeout())
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx("open database", e))?;

        info!(
            "Opened SQLite store - url: '{}', max_connections: {}",
            settings.database_url, max_connections
        );

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, bootstrapping the schema
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx("bootstrap schema", e))?;
        }
        debug!("SQLite schema ready ({} statements)", SCHEMA.len());
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        // Take the write lock up front: a deferred transaction that reads and
        // then writes fails with SQLITE_BUSY_SNAPSHOT once another connection
        // has committed, and the busy timeout does not cover that upgrade.
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| map_sqlx("begin transaction", e))?;
        Ok(Box::new(SqliteTx { tx }))
    }
}

struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteTx {
    async fn hydrate(&mut self, row: &SqliteRow) -> Result<Match> {
        let id: MatchId = column(row, "id")?;
        let result: String = column(row, "result")?;

        let players = sqlx::query(
            "SELECT participant_id, team FROM match_players WHERE match_id = ? ORDER BY team, slot",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx("load match players", e))?;

        let mut team1 = Vec::new();
        let mut team2 = Vec::new();
        for player in &players {
            let participant_id: ParticipantId = column(player, "participant_id")?;
            match column::<i64>(player, "team")? {
                1 => team1.push(participant_id),
                2 => team2.push(participant_id),
                other => {
                    return Err(CourtQueueError::integrity(format!(
                        "match {} has player on unknown team {}",
                        id, other
                    )))
                }
            }
        }

        let score_rows = sqlx::query(
            "SELECT game_number, team1_score, team2_score FROM match_scores
             WHERE match_id = ? ORDER BY game_number",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx("load match scores", e))?;

        let scores = score_rows
            .iter()
            .map(|score| {
                Ok(GameScore {
                    game: narrow(column(score, "game_number")?, "game_number")?,
                    team1_score: narrow(column(score, "team1_score")?, "team1_score")?,
                    team2_score: narrow(column(score, "team2_score")?, "team2_score")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Match {
            id,
            court: column(row, "court")?,
            team1,
            team2,
            result: MatchResult::from_str(&result).map_err(CourtQueueError::integrity)?,
            scores,
            started_at: column(row, "started_at")?,
            ended_at: column(row, "ended_at")?,
            created_at: column(row, "created_at")?,
        })
    }

    async fn hydrate_all(&mut self, rows: Vec<SqliteRow>) -> Result<Vec<Match>> {
        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            matches.push(self.hydrate(row).await?);
        }
        Ok(matches)
    }

    async fn fetch_entries(&mut self, sql: &str, limit: Option<usize>) -> Result<Vec<QueueEntry>> {
        let mut query = sqlx::query(sql);
        if let Some(limit) = limit {
            query = query.bind(limit as i64);
        }
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("load queue entries", e))?;
        rows.iter().map(entry_from_row).collect()
    }
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn entry_for(&mut self, participant_id: ParticipantId) -> Result<Option<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries WHERE participant_id = ?",
            ENTRY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(participant_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("load participant entry", e))?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn max_waiting_position(&mut self) -> Result<Option<u32>> {
        let row = sqlx::query("SELECT MAX(position) AS max_position FROM queue_entries WHERE status = 'waiting'")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("query max position", e))?;
        let max: Option<i64> = column(&row, "max_position")?;
        max.map(|value| narrow(value, "position")).transpose()
    }

    async fn count_waiting(&mut self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS waiting FROM queue_entries WHERE status = 'waiting'")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("count waiting", e))?;
        narrow(column(&row, "waiting")?, "waiting count")
    }

    async fn insert_entry(
        &mut self,
        participant_id: ParticipantId,
        position: u32,
        joined_at: DateTime<Utc>,
    ) -> Result<QueueEntry> {
        let done = sqlx::query(
            "INSERT INTO queue_entries (participant_id, position, status, joined_at)
             VALUES (?, ?, 'waiting', ?)",
        )
        .bind(participant_id)
        .bind(i64::from(position))
        .bind(joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx("insert queue entry", e))?;

        Ok(QueueEntry {
            id: done.last_insert_rowid(),
            participant_id,
            position,
            status: QueueStatus::Waiting,
            joined_at,
            called_at: None,
        })
    }

    async fn update_entry(&mut self, entry: &QueueEntry) -> Result<()> {
        let done = sqlx::query(
            "UPDATE queue_entries SET position = ?, status = ?, called_at = ? WHERE id = ?",
        )
        .bind(i64::from(entry.position))
        .bind(entry.status.as_str())
        .bind(entry.called_at)
        .bind(entry.id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx("update queue entry", e))?;

        if done.rows_affected() != 1 {
            return Err(CourtQueueError::integrity(format!(
                "queue entry {} vanished during update",
                entry.id
            )));
        }
        Ok(())
    }

    async fn delete_entry(&mut self, entry_id: EntryId) -> Result<()> {
        let done = sqlx::query("DELETE FROM queue_entries WHERE id = ?")
            .bind(entry_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("delete queue entry", e))?;

        if done.rows_affected() != 1 {
            return Err(CourtQueueError::integrity(format!(
                "queue entry {} vanished during delete",
                entry_id
            )));
        }
        Ok(())
    }

    async fn lowest_waiting(&mut self, limit: usize) -> Result<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries WHERE status = 'waiting' ORDER BY position, id LIMIT ?",
            ENTRY_COLUMNS
        );
        self.fetch_entries(&sql, Some(limit)).await
    }

    async fn waiting_entries(&mut self) -> Result<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries WHERE status = 'waiting' ORDER BY position, id",
            ENTRY_COLUMNS
        );
        self.fetch_entries(&sql, None).await
    }

    async fn playing_entries(&mut self, limit: usize) -> Result<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries WHERE status = 'playing'
             ORDER BY called_at DESC, id DESC LIMIT ?",
            ENTRY_COLUMNS
        );
        self.fetch_entries(&sql, Some(limit)).await
    }

    async fn insert_match(&mut self, new_match: &NewMatch) -> Result<Match> {
        let done = sqlx::query(
            "INSERT INTO matches (court, result, started_at, created_at) VALUES (?, 'pending', ?, ?)",
        )
        .bind(&new_match.court)
        .bind(new_match.started_at)
        .bind(new_match.started_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx("insert match", e))?;
        let match_id = done.last_insert_rowid();

        let sides = [(1_i64, &new_match.team1), (2_i64, &new_match.team2)];
        for (team, members) in sides {
            for (slot, participant_id) in members.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO match_players (match_id, participant_id, team, slot) VALUES (?, ?, ?, ?)",
                )
                .bind(match_id)
                .bind(*participant_id)
                .bind(team)
                .bind(slot as i64)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx("insert match player", e))?;
            }
        }

        Ok(Match {
            id: match_id,
            court: new_match.court.clone(),
            team1: new_match.team1.clone(),
            team2: new_match.team2.clone(),
            result: MatchResult::Pending,
            scores: Vec::new(),
            started_at: new_match.started_at,
            ended_at: None,
            created_at: new_match.started_at,
        })
    }

    async fn get_match(&mut self, match_id: MatchId) -> Result<Option<Match>> {
        let sql = format!("SELECT {} FROM matches WHERE id = ?", MATCH_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(match_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("load match", e))?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    async fn resolve_match(
        &mut self,
        match_id: MatchId,
        result: MatchResult,
        ended_at: DateTime<Utc>,
        scores: &[GameScore],
    ) -> Result<()> {
        let done = sqlx::query("UPDATE matches SET result = ?, ended_at = ? WHERE id = ?")
            .bind(result.as_str())
            .bind(ended_at)
            .bind(match_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("update match result", e))?;

        if done.rows_affected() == 0 {
            return Err(CourtQueueError::MatchNotFound { match_id });
        }

        for score in scores {
            sqlx::query(
                "INSERT INTO match_scores (match_id, game_number, team1_score, team2_score)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(match_id)
            .bind(i64::from(score.game))
            .bind(i64::from(score.team1_score))
            .bind(i64::from(score.team2_score))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("insert match score", e))?;
        }
        Ok(())
    }

    async fn matches_for_participant(
        &mut self,
        participant_id: ParticipantId,
        limit: usize,
    ) -> Result<Vec<Match>> {
        let sql = format!(
            "SELECT {} FROM matches
             WHERE id IN (SELECT match_id FROM match_players WHERE participant_id = ?)
             ORDER BY started_at DESC, id DESC LIMIT ?",
            MATCH_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(participant_id)
            .bind(limit as i64)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("load participant matches", e))?;
        self.hydrate_all(rows).await
    }

    async fn pending_matches(&mut self) -> Result<Vec<Match>> {
        let sql = format!(
            "SELECT {} FROM matches WHERE result = 'pending' ORDER BY started_at DESC, id DESC",
            MATCH_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("load pending matches", e))?;
        self.hydrate_all(rows).await
    }

    async fn completed_matches(&mut self, limit: usize) -> Result<Vec<Match>> {
        let sql = format!(
            "SELECT {} FROM matches WHERE result != 'pending'
             ORDER BY ended_at DESC, id DESC LIMIT ?",
            MATCH_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx("load completed matches", e))?;
        self.hydrate_all(rows).await
    }

    async fn count_pending_on_court(&mut self, court: &str) -> Result<usize> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS active FROM matches WHERE court = ? AND result = 'pending'",
        )
        .bind(court)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx("count court matches", e))?;
        narrow(column(&row, "active")?, "court match count")
    }

    async fn get_stats(&mut self, participant_id: ParticipantId) -> Result<Option<UserStats>> {
        let row = sqlx::query(
            "SELECT participant_id, total_matches, wins, losses, win_rate, current_streak,
                    best_streak, skill_level, skill_points, updated_at
             FROM user_stats WHERE participant_id = ?",
        )
        .bind(participant_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx("load stats", e))?;
        row.as_ref().map(stats_from_row).transpose()
    }

    async fn put_stats(&mut self, stats: &UserStats) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_stats (participant_id, total_matches, wins, losses, win_rate,
                                     current_streak, best_streak, skill_level, skill_points, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (participant_id) DO UPDATE SET
                total_matches = excluded.total_matches,
                wins = excluded.wins,
                losses = excluded.losses,
                win_rate = excluded.win_rate,
                current_streak = excluded.current_streak,
                best_streak = excluded.best_streak,
                skill_level = excluded.skill_level,
                skill_points = excluded.skill_points,
                updated_at = excluded.updated_at",
        )
        .bind(stats.participant_id)
        .bind(i64::from(stats.total_matches))
        .bind(i64::from(stats.wins))
        .bind(i64::from(stats.losses))
        .bind(stats.win_rate)
        .bind(i64::from(stats.current_streak))
        .bind(i64::from(stats.best_streak))
        .bind(stats.skill_level.as_str())
        .bind(i64::from(stats.skill_points))
        .bind(stats.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx("store stats", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx("commit transaction", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect(&StoreSettings::in_memory())
            .await
            .expect("Failed to open in-memory database")
    }

    #[tokio::test]
    async fn test_schema_bootstrap_is_idempotent() {
        let store = memory_store().await;
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_entry_round_trip_and_rollback() {
        let store = memory_store().await;
        let joined_at = Utc::now();

        let mut tx = store.begin().await.unwrap();
        let entry = tx.insert_entry(42, 1, joined_at).await.unwrap();
        tx.commit().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.delete_entry(entry.id).await.unwrap();
            // rolled back on drop
        }

        let mut tx = store.begin().await.unwrap();
        let loaded = tx.entry_for(42).await.unwrap().expect("entry should survive rollback");
        assert_eq!(loaded.position, 1);
        assert_eq!(loaded.status, QueueStatus::Waiting);
        assert_eq!(loaded.called_at, None);
        assert_eq!(tx.max_waiting_position().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_unique_active_participant() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert_entry(7, 1, Utc::now()).await.unwrap();

        let err = tx.insert_entry(7, 2, Utc::now()).await.unwrap_err();
        assert!(matches!(err, CourtQueueError::IntegrityViolation { .. }));
    }

    #[tokio::test]
    async fn test_match_round_trip() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();

        let created = tx
            .insert_match(&NewMatch {
                court: "Court 2".to_string(),
                team1: vec![5, 1],
                team2: vec![8],
                started_at: Utc::now(),
            })
            .await
            .unwrap();
        assert_eq!(tx.count_pending_on_court("Court 2").await.unwrap(), 1);

        let scores = [GameScore::new(1, 21, 15), GameScore::new(2, 18, 21)];
        tx.resolve_match(created.id, MatchResult::Draw, Utc::now(), &scores)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let loaded = tx.get_match(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.team1, vec![5, 1]);
        assert_eq!(loaded.team2, vec![8]);
        assert_eq!(loaded.result, MatchResult::Draw);
        assert_eq!(loaded.scores, scores.to_vec());
        assert!(loaded.ended_at.is_some());

        assert!(tx.pending_matches().await.unwrap().is_empty());
        assert_eq!(tx.matches_for_participant(8, 10).await.unwrap().len(), 1);
        assert!(tx.matches_for_participant(99, 10).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_read_then_write_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StoreSettings {
            database_url: format!("sqlite://{}", dir.path().join("courts.db").display()),
            ..StoreSettings::default()
        };
        let store = SqliteStore::connect(&settings).await.unwrap();

        // Each task reads before it writes on its own pooled connection
        let tasks: Vec<_> = (1..=40)
            .map(|participant_id| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut tx = store.begin().await?;
                    if participant_id % 2 == 0 {
                        let position = tx.max_waiting_position().await?.unwrap_or(0) + 1;
                        tx.insert_entry(participant_id, position, Utc::now()).await?;
                    } else {
                        let stats = match tx.get_stats(participant_id).await? {
                            Some(stats) => stats,
                            None => UserStats::new(participant_id),
                        };
                        tx.put_stats(&stats).await?;
                    }
                    tx.commit().await
                })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        let positions: Vec<u32> = tx
            .waiting_entries()
            .await
            .unwrap()
            .iter()
            .map(|entry| entry.position)
            .collect();
        assert_eq!(positions, (1..=20).collect::<Vec<u32>>());
        assert!(tx.get_stats(39).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats_upsert() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_stats(3).await.unwrap().is_none());

        let mut stats = UserStats::new(3);
        tx.put_stats(&stats).await.unwrap();

        stats.total_matches = 1;
        stats.losses = 1;
        stats.current_streak = -1;
        tx.put_stats(&stats).await.unwrap();

        let loaded = tx.get_stats(3).await.unwrap().unwrap();
        assert_eq!(loaded.total_matches, 1);
        assert_eq!(loaded.current_streak, -1);
        assert_eq!(loaded.skill_level, SkillLevel::Beginner);
    }
}
