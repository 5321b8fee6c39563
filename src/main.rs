//! Command-line front end for the court-queue engine
//!
//! Operates the queue and match facade against a SQLite database and prints
//! every result as JSON, so it can be scripted or used by hand at the courts.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use court_queue::config::AppConfig;
use court_queue::{
    CourtQueueError, CourtService, CreateMatchRequest, GameScore, Principal, RecordResultRequest,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Court Queue - waiting line and match tracking for badminton courts
#[derive(Parser)]
#[command(
    name = "court-queue",
    version,
    about = "Manage the shared court waiting line, matches and player stats",
    long_about = "Court Queue keeps a single ordered waiting line for the courts, calls players \
                 off it, records match results and keeps each player's win/loss record, \
                 streaks and skill tier."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, value_name = "URL", help = "Override the SQLite database URL")]
    database_url: Option<String>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Participant acting
    #[arg(long = "as", value_name = "ID", default_value_t = 0)]
    participant: i64,

    /// Role of the acting participant
    #[arg(long, value_name = "ROLE", default_value = "player")]
    role: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Join the waiting line
    Join,
    /// Leave the waiting line
    Leave,
    /// Call the next participants (organizer)
    Call {
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Show the waiting line
    Status {
        /// Show the line without a caller position
        #[arg(long)]
        anonymous: bool,
    },
    /// Create a match (organizer)
    Create {
        /// Court label; blank picks the next free court
        #[arg(long, default_value = "")]
        court: String,
        #[arg(long, value_delimiter = ',', required = true)]
        team1: Vec<i64>,
        #[arg(long, value_delimiter = ',', required = true)]
        team2: Vec<i64>,
    },
    /// Record a match result (organizer)
    Result {
        #[arg(long = "match", value_name = "ID")]
        match_id: i64,
        /// Game score as TEAM1-TEAM2, repeat once per game
        #[arg(long = "score", value_name = "SCORE", value_parser = parse_score)]
        scores: Vec<GameScore>,
    },
    /// Show the caller's match history
    History {
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    /// List matches in progress
    Active,
    /// List resolved matches (organizer)
    Completed {
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    /// Show a participant's stats, the caller's by default
    Stats {
        #[arg(long)]
        participant: Option<i64>,
    },
    /// Render the metrics gathered during this invocation
    Metrics,
}

fn parse_score(raw: &str) -> std::result::Result<GameScore, String> {
    let (team1, team2) = raw
        .split_once('-')
        .ok_or_else(|| format!("expected TEAM1-TEAM2, got '{}'", raw))?;
    let team1 = team1
        .trim()
        .parse()
        .map_err(|_| format!("invalid team1 score in '{}'", raw))?;
    let team2 = team2
        .trim()
        .parse()
        .map_err(|_| format!("invalid team2 score in '{}'", raw))?;
    // game numbers are assigned when the result is recorded
    Ok(GameScore::new(0, team1, team2))
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if let Some(url) = &args.database_url {
        config.store.database_url = url.clone();
    }

    court_queue::config::validate_config(&config)?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    retryable: bool,
}

async fn run(service: &CourtService, principal: &Principal, command: Command) -> court_queue::Result<()> {
    let printed = match command {
        Command::Join => print_json(&service.join(principal).await?),
        Command::Leave => {
            service.leave(principal).await?;
            print_json(&serde_json::json!({ "left": principal.participant_id }))
        }
        Command::Call { count } => print_json(&service.call_next(principal, count).await?),
        Command::Status { anonymous } => {
            let viewer = if anonymous { None } else { Some(principal) };
            print_json(&service.status(viewer).await?)
        }
        Command::Create {
            court,
            team1,
            team2,
        } => {
            let request = CreateMatchRequest {
                court,
                team1,
                team2,
            };
            print_json(&service.create_match(principal, &request).await?)
        }
        Command::Result { match_id, scores } => {
            let request = RecordResultRequest { match_id, scores };
            print_json(&service.record_result(principal, &request).await?)
        }
        Command::History { limit } => print_json(&service.history(principal, limit).await?),
        Command::Active => print_json(&service.active_matches(principal).await?),
        Command::Completed { limit } => {
            print_json(&service.completed_matches(principal, limit).await?)
        }
        Command::Stats { participant } => {
            print_json(&service.stats(principal, participant).await?)
        }
        Command::Metrics => service
            .metrics()
            .render()
            .map(|text| print!("{}", text)),
    };

    printed.map_err(|e| CourtQueueError::ConfigurationError {
        message: format!("Failed to write output: {}", e),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(2);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    info!(
        "Starting {} v{} - database: '{}'",
        config.service.name,
        court_queue::VERSION,
        config.store.database_url
    );

    let principal = Principal::new(args.participant, &args.role);
    let service = CourtService::open(&config).await?;

    if let Err(e) = run(&service, &principal, args.command).await {
        let body = ErrorBody {
            error: e.kind(),
            message: e.to_string(),
            retryable: e.is_retryable(),
        };
        eprintln!("{}", serde_json::to_string_pretty(&body)?);
        std::process::exit(1);
    }

    Ok(())
}
