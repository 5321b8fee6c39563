//! Skill tier and derived record arithmetic

use crate::types::{SkillLevel, UserStats};
use crate::utils::round_two_decimals;
use chrono::{DateTime, Utc};

/// Matches required before the win rate counts toward a tier
pub const MIN_RANKED_MATCHES: u32 = 5;

const EXPERT_WIN_RATE: f64 = 75.0;
const ADVANCED_WIN_RATE: f64 = 55.0;
const INTERMEDIATE_WIN_RATE: f64 = 40.0;

const POINTS_PER_MATCH: u32 = 10;
const POINTS_PER_WIN: u32 = 5;

/// Tier for a win rate (0-100) over `total` matches
pub fn tier(win_rate: f64, total: u32) -> SkillLevel {
    if total < MIN_RANKED_MATCHES {
        SkillLevel::Beginner
    } else if win_rate >= EXPERT_WIN_RATE {
        SkillLevel::Expert
    } else if win_rate >= ADVANCED_WIN_RATE {
        SkillLevel::Advanced
    } else if win_rate >= INTERMEDIATE_WIN_RATE {
        SkillLevel::Intermediate
    } else {
        SkillLevel::Beginner
    }
}

/// Skill points earned for a record
pub fn skill_points(total: u32, wins: u32) -> u32 {
    total * POINTS_PER_MATCH + wins * POINTS_PER_WIN
}

/// Fold one decided match into a participant's record
pub fn apply_outcome(stats: &mut UserStats, won: bool, at: DateTime<Utc>) {
    stats.total_matches += 1;
    if won {
        stats.wins += 1;
        stats.current_streak = stats.current_streak.max(0) + 1;
    } else {
        stats.losses += 1;
        stats.current_streak = stats.current_streak.min(0) - 1;
    }
    stats.best_streak = stats.best_streak.max(stats.current_streak);

    let win_rate = f64::from(stats.wins) * 100.0 / f64::from(stats.total_matches);
    stats.win_rate = round_two_decimals(win_rate);
    stats.skill_level = tier(win_rate, stats.total_matches);
    stats.skill_points = skill_points(stats.total_matches, stats.wins);
    stats.updated_at = at;
}
