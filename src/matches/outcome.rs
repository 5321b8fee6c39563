//! Match validation and result rules

use crate::error::{CourtQueueError, Result};
use crate::types::{GameScore, MatchResult, ParticipantId, Team};
use std::collections::HashSet;

/// Largest team a match accepts
pub const MAX_TEAM_SIZE: usize = 2;

/// Check team sizes, duplicates and overlap
pub fn validate_teams(team1: &[ParticipantId], team2: &[ParticipantId]) -> Result<()> {
    for (label, team) in [("team1", team1), ("team2", team2)] {
        if team.is_empty() || team.len() > MAX_TEAM_SIZE {
            return Err(CourtQueueError::InvalidTeam {
                reason: format!(
                    "{} must have 1 to {} players, got {}",
                    label,
                    MAX_TEAM_SIZE,
                    team.len()
                ),
            });
        }
        let unique: HashSet<_> = team.iter().collect();
        if unique.len() != team.len() {
            return Err(CourtQueueError::InvalidTeam {
                reason: format!("{} lists the same player twice", label),
            });
        }
    }

    if let Some(shared) = team1.iter().find(|id| team2.contains(id)) {
        return Err(CourtQueueError::InvalidTeam {
            reason: format!("player {} is on both teams", shared),
        });
    }
    Ok(())
}

/// Reject negative scores and number the games 1..n in submission order
pub fn normalize_scores(scores: &[GameScore]) -> Result<Vec<GameScore>> {
    scores
        .iter()
        .enumerate()
        .map(|(index, score)| {
            let game = index + 1;
            if score.team1_score < 0 || score.team2_score < 0 {
                return Err(CourtQueueError::InvalidScore {
                    game,
                    reason: format!(
                        "scores must be non-negative, got {}-{}",
                        score.team1_score, score.team2_score
                    ),
                });
            }
            Ok(GameScore::new(game as u32, score.team1_score, score.team2_score))
        })
        .collect()
}

/// Winner is the side that took strictly more games; level games count for nobody
pub fn decide_result(scores: &[GameScore]) -> MatchResult {
    let (team1_games, team2_games) =
        scores
            .iter()
            .fold((0usize, 0usize), |(t1, t2), score| match score.winner() {
                Some(Team::Team1) => (t1 + 1, t2),
                Some(Team::Team2) => (t1, t2 + 1),
                None => (t1, t2),
            });

    match team1_games.cmp(&team2_games) {
        std::cmp::Ordering::Greater => MatchResult::Team1,
        std::cmp::Ordering::Less => MatchResult::Team2,
        std::cmp::Ordering::Equal => MatchResult::Draw,
    }
}
