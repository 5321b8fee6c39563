//! Queue Tester CLI Tool
//!
//! Load driver for the waiting line. Hammers join/leave/call from many
//! concurrent tasks against an in-memory or SQLite store, then checks that
//! waiting positions are still exactly 1..K. The `outcomes` command does the
//! same for the stats ledger and checks that no recorded outcome was lost.
//!
//! Usage:
//!   cargo run --bin queue-tester -- --help
//!   cargo run --bin queue-tester hammer --participants 200 --rounds 5
//!   cargo run --bin queue-tester --database-url sqlite://load.db hammer
//!   cargo run --bin queue-tester outcomes --participants 10 --outcomes 20
//!   cargo run --bin queue-tester scenario

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use court_queue::config::{AppConfig, StoreSettings};
use court_queue::metrics::MetricsCollector;
use court_queue::queue::positions::verify_dense;
use court_queue::store::{retry_with_backoff, LockTable};
use court_queue::{
    CourtQueueError, CourtService, CreateMatchRequest, GameScore, MatchResult, MemoryStore,
    Principal, RecordResultRequest, SqliteStore, StatsLedger, Store,
};
use futures::future::join_all;

#[derive(Parser)]
#[command(name = "queue-tester")]
#[command(about = "Concurrent load and scenario driver for the court-queue engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database URL; the in-memory store is used when omitted
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Join, leave and call concurrently, then verify dense positions
    Hammer {
        /// Number of distinct participants
        #[arg(short, long, default_value = "100")]
        participants: i64,
        /// Join/leave rounds per participant
        #[arg(short, long, default_value = "3")]
        rounds: usize,
        /// Concurrent organizer call-next tasks
        #[arg(short, long, default_value = "4")]
        callers: usize,
        /// Retries for store failures
        #[arg(long, default_value = "3")]
        retries: usize,
    },
    /// Record win/loss outcomes concurrently, then verify no update was lost
    Outcomes {
        /// Number of distinct participants
        #[arg(short, long, default_value = "10")]
        participants: i64,
        /// Outcomes recorded per participant, alternating win and loss
        #[arg(short, long, default_value = "20")]
        outcomes: u32,
    },
    /// Run the join/leave/call and match resolution walkthrough
    Scenario,
}

#[derive(Debug, Default)]
struct HammerStats {
    joins: usize,
    leaves: usize,
    called: usize,
    refused: usize,
    failed: usize,
}

async fn open_store(database_url: Option<String>) -> Result<Arc<dyn Store>> {
    match database_url {
        Some(url) => {
            let settings = StoreSettings {
                database_url: url,
                ..StoreSettings::default()
            };
            Ok(Arc::new(SqliteStore::connect(&settings).await?))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

async fn hammer(
    store: Arc<dyn Store>,
    participants: i64,
    rounds: usize,
    callers: usize,
    retries: usize,
) -> Result<()> {
    let config = AppConfig::default();
    let service = Arc::new(CourtService::new(
        store.clone(),
        &config,
        Arc::new(MetricsCollector::new()?),
    ));
    let started = Instant::now();

    let players = (1..=participants).map(|id| {
        let service = service.clone();
        tokio::spawn(async move {
            let principal = Principal::player(id);
            let mut stats = HammerStats::default();
            for _ in 0..rounds {
                match retry_with_backoff(|| service.join(&principal), retries, Duration::from_millis(10)).await {
                    Ok(_) => stats.joins += 1,
                    Err(e) if e.is_domain_error() => stats.refused += 1,
                    Err(_) => stats.failed += 1,
                }
                tokio::task::yield_now().await;
                match retry_with_backoff(|| service.leave(&principal), retries, Duration::from_millis(10)).await {
                    Ok(_) => stats.leaves += 1,
                    Err(e) if e.is_domain_error() => stats.refused += 1,
                    Err(_) => stats.failed += 1,
                }
            }
            // end in the line so the final check has something to verify
            if service.join(&principal).await.is_ok() {
                stats.joins += 1;
            }
            stats
        })
    });

    let organizers = (0..callers).map(|n| {
        let service = service.clone();
        tokio::spawn(async move {
            let principal = Principal::new(-(n as i64) - 1, "organizer");
            let mut stats = HammerStats::default();
            for _ in 0..rounds {
                match service.call_next(&principal, Some(2)).await {
                    Ok(called) => stats.called += called.len(),
                    Err(CourtQueueError::QueueEmpty) => stats.refused += 1,
                    Err(_) => stats.failed += 1,
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            stats
        })
    });

    let mut totals = HammerStats::default();
    let tasks: Vec<_> = players.chain(organizers).collect();
    for outcome in join_all(tasks).await {
        let stats = outcome?;
        totals.joins += stats.joins;
        totals.leaves += stats.leaves;
        totals.called += stats.called;
        totals.refused += stats.refused;
        totals.failed += stats.failed;
    }

    let mut tx = store.begin().await?;
    let waiting = verify_dense(tx.as_mut()).await?;
    drop(tx);

    println!("📊 Hammer results ({:.2?}):", started.elapsed());
    println!("  Joins: {}", totals.joins);
    println!("  Leaves: {}", totals.leaves);
    println!("  Called: {}", totals.called);
    println!("  Refused (domain errors): {}", totals.refused);
    println!("  Failed (store errors): {}", totals.failed);
    println!("  Waiting at end: {} (positions dense)", waiting);

    if totals.failed > 0 {
        return Err(anyhow!("{} operations failed against the store", totals.failed));
    }
    Ok(())
}

async fn outcomes(store: Arc<dyn Store>, participants: i64, per_participant: u32) -> Result<()> {
    let config = AppConfig::default();
    let ledger = Arc::new(StatsLedger::new(
        store,
        Arc::new(LockTable::new()),
        Arc::new(MetricsCollector::new()?),
        config.operation_timeout(),
    ));
    let started = Instant::now();

    let tasks: Vec<_> = (1..=participants)
        .flat_map(|id| (0..per_participant).map(move |n| (id, n % 2 == 0)))
        .map(|(id, won)| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.record_outcome(id, won).await })
        })
        .collect();
    for outcome in join_all(tasks).await {
        outcome??;
    }

    let expected_wins = (per_participant + 1) / 2;
    for id in 1..=participants {
        let stats = ledger.get_stats(id).await?;
        if stats.total_matches != per_participant || stats.wins != expected_wins {
            return Err(anyhow!(
                "participant {} recorded {} matches ({} wins), expected {} ({} wins)",
                id,
                stats.total_matches,
                stats.wins,
                per_participant,
                expected_wins
            ));
        }
    }

    println!(
        "📊 Recorded {} outcomes for {} participants in {:.2?}",
        participants * i64::from(per_participant),
        participants,
        started.elapsed()
    );
    Ok(())
}

async fn scenario(store: Arc<dyn Store>) -> Result<()> {
    let config = AppConfig::default();
    let service = CourtService::new(store, &config, Arc::new(MetricsCollector::new()?));
    let organizer = Principal::new(100, "organizer");
    let (a, b, c) = (Principal::player(1), Principal::player(2), Principal::player(3));

    for player in [&a, &b, &c] {
        let entry = service.join(player).await?;
        println!("✅ Participant {} joined at position {}", player.participant_id, entry.position);
    }

    service.leave(&b).await?;
    let info = service.status(Some(&c)).await?;
    println!(
        "✅ Participant 2 left; participant 3 now at {:?} ({})",
        info.your_position,
        info.estimated_wait_label.unwrap_or_default()
    );

    let called = service.call_next(&organizer, Some(2)).await?;
    let ids: Vec<_> = called.iter().map(|entry| entry.participant_id).collect();
    println!("✅ Called {:?}", ids);

    let created = service
        .create_match(
            &organizer,
            &CreateMatchRequest {
                court: String::new(),
                team1: vec![1],
                team2: vec![3],
            },
        )
        .await?;
    println!("✅ Match {} started on {}", created.id, created.court);

    let resolved = service
        .record_result(
            &organizer,
            &RecordResultRequest {
                match_id: created.id,
                scores: vec![
                    GameScore::new(1, 21, 15),
                    GameScore::new(2, 19, 21),
                    GameScore::new(3, 21, 18),
                ],
            },
        )
        .await?;
    if resolved.result != MatchResult::Team1 {
        return Err(anyhow!("expected team1 to win, got {}", resolved.result));
    }

    let winner = service.stats(&a, None).await?;
    let loser = service.stats(&c, None).await?;
    println!(
        "✅ Result {}: participant 1 streak {}, participant 3 streak {}",
        resolved.result, winner.current_streak, loser.current_streak
    );

    let again = service
        .record_result(
            &organizer,
            &RecordResultRequest {
                match_id: created.id,
                scores: vec![GameScore::new(1, 0, 21)],
            },
        )
        .await;
    match again {
        Err(CourtQueueError::MatchAlreadyResolved { .. }) => {
            println!("✅ Second result refused");
            Ok(())
        }
        other => Err(anyhow!("expected MatchAlreadyResolved, got {:?}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let store = open_store(cli.database_url).await?;

    match cli.command {
        Commands::Hammer {
            participants,
            rounds,
            callers,
            retries,
        } => {
            println!(
                "🔨 Hammering queue with {} participants x {} rounds, {} callers",
                participants, rounds, callers
            );
            if let Err(e) = hammer(store, participants, rounds, callers, retries).await {
                eprintln!("❌ Hammer failed: {}", e);
                std::process::exit(1);
            }
            println!("✅ Invariants held");
        }

        Commands::Outcomes {
            participants,
            outcomes: per_participant,
        } => {
            println!(
                "🔨 Recording {} outcomes for each of {} participants",
                per_participant, participants
            );
            if let Err(e) = outcomes(store, participants, per_participant).await {
                eprintln!("❌ Outcome check failed: {}", e);
                std::process::exit(1);
            }
            println!("✅ No outcome lost");
        }

        Commands::Scenario => {
            println!("🧪 Running walkthrough scenario...");
            if let Err(e) = scenario(store).await {
                eprintln!("❌ Scenario failed: {}", e);
                std::process::exit(1);
            }
            println!("✅ Scenario completed successfully!");
        }
    }

    Ok(())
}
