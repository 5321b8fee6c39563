//! Common types used throughout the queue and match engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Unique identifier for participants, supplied by the identity layer
pub type ParticipantId = i64;

/// Unique identifier for queue entries
pub type EntryId = i64;

/// Unique identifier for matches
pub type MatchId = i64;

/// Lifecycle state of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Waiting,
    Called,
    Playing,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Called => "called",
            QueueStatus::Playing => "playing",
        }
    }

    /// Whether moving from `self` to `next` respects waiting → called → playing
    pub fn can_advance_to(&self, next: QueueStatus) -> bool {
        (*self as u8) < (next as u8)
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(QueueStatus::Waiting),
            "called" => Ok(QueueStatus::Called),
            "playing" => Ok(QueueStatus::Playing),
            other => Err(format!("unknown queue status '{}'", other)),
        }
    }
}

/// Outcome of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Pending,
    Team1,
    Team2,
    Draw,
}

impl MatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResult::Pending => "pending",
            MatchResult::Team1 => "team1",
            MatchResult::Team2 => "team2",
            MatchResult::Draw => "draw",
        }
    }

    /// The winning side, if there is one
    pub fn winner(&self) -> Option<Team> {
        match self {
            MatchResult::Team1 => Some(Team::Team1),
            MatchResult::Team2 => Some(Team::Team2),
            MatchResult::Pending | MatchResult::Draw => None,
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchResult::Pending),
            "team1" => Ok(MatchResult::Team1),
            "team2" => Ok(MatchResult::Team2),
            "draw" => Ok(MatchResult::Draw),
            other => Err(format!("unknown match result '{}'", other)),
        }
    }
}

/// One side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Team1,
    Team2,
}

/// Skill tier derived from win rate and match volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
            SkillLevel::Expert => "Expert",
        }
    }
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beginner" => Ok(SkillLevel::Beginner),
            "Intermediate" => Ok(SkillLevel::Intermediate),
            "Advanced" => Ok(SkillLevel::Advanced),
            "Expert" => Ok(SkillLevel::Expert),
            other => Err(format!("unknown skill level '{}'", other)),
        }
    }
}

/// A participant's place in the shared line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub participant_id: ParticipantId,
    pub position: u32,
    pub status: QueueStatus,
    pub joined_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
}

/// Score of a single game within a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub game: u32,
    pub team1_score: i32,
    pub team2_score: i32,
}

impl GameScore {
    pub fn new(game: u32, team1_score: i32, team2_score: i32) -> Self {
        Self {
            game,
            team1_score,
            team2_score,
        }
    }

    /// The side that won this game, `None` on a level score
    pub fn winner(&self) -> Option<Team> {
        match self.team1_score.cmp(&self.team2_score) {
            std::cmp::Ordering::Greater => Some(Team::Team1),
            std::cmp::Ordering::Less => Some(Team::Team2),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// A scheduled contest between two teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub court: String,
    pub team1: Vec<ParticipantId>,
    pub team2: Vec<ParticipantId>,
    pub result: MatchResult,
    pub scores: Vec<GameScore>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Which side the participant played on, if any
    pub fn team_of(&self, participant_id: ParticipantId) -> Option<Team> {
        if self.team1.contains(&participant_id) {
            Some(Team::Team1)
        } else if self.team2.contains(&participant_id) {
            Some(Team::Team2)
        } else {
            None
        }
    }

    /// All participants, team1 first
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.team1.iter().chain(self.team2.iter()).copied().collect()
    }

    pub fn is_pending(&self) -> bool {
        self.result == MatchResult::Pending
    }

    /// Whether the participant's side equals the recorded result
    pub fn won_by(&self, participant_id: ParticipantId) -> bool {
        match (self.team_of(participant_id), self.result.winner()) {
            (Some(team), Some(winner)) => team == winner,
            _ => false,
        }
    }
}

/// Fields for inserting a new match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatch {
    pub court: String,
    pub team1: Vec<ParticipantId>,
    pub team2: Vec<ParticipantId>,
    pub started_at: DateTime<Utc>,
}

/// A match seen from one participant's side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchHistoryEntry {
    #[serde(rename = "match")]
    pub game: Match,
    pub won: bool,
}

/// Running performance record of a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub participant_id: ParticipantId,
    pub total_matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    /// Positive = consecutive wins, negative = consecutive losses
    pub current_streak: i32,
    pub best_streak: i32,
    pub skill_level: SkillLevel,
    pub skill_points: u32,
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    /// A zeroed record for a participant seen for the first time
    pub fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            total_matches: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            current_streak: 0,
            best_streak: 0,
            skill_level: SkillLevel::Beginner,
            skill_points: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Read-only snapshot of the line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub total_in_queue: usize,
    pub your_position: Option<u32>,
    #[serde(with = "optional_duration_secs")]
    pub estimated_wait: Option<Duration>,
    pub estimated_wait_label: Option<String>,
    pub next_court: Option<String>,
    pub currently_playing: Vec<QueueEntry>,
}

/// Request to create a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMatchRequest {
    #[serde(default)]
    pub court: String,
    pub team1: Vec<ParticipantId>,
    pub team2: Vec<ParticipantId>,
}

/// Request to record a match result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResultRequest {
    pub match_id: MatchId,
    pub scores: Vec<GameScore>,
}

mod optional_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
