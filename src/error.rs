//! Error types for the queue and match engine
//!
//! Domain failures are typed so the transport layer can map each one to a
//! user-facing status. Only `StoreUnavailable` is safe to retry.

use crate::types::{MatchId, MatchResult, ParticipantId};

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CourtQueueError>;

/// Failures surfaced by the engine and its store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CourtQueueError {
    #[error("Participant {participant_id} is already in the queue")]
    AlreadyQueued { participant_id: ParticipantId },

    #[error("Participant {participant_id} is not waiting in the queue")]
    NotQueued { participant_id: ParticipantId },

    #[error("Queue is empty")]
    QueueEmpty,

    #[error("Invalid team composition: {reason}")]
    InvalidTeam { reason: String },

    #[error("Invalid score for game {game}: {reason}")]
    InvalidScore { game: usize, reason: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: MatchId },

    #[error("Match {match_id} already resolved as {result}")]
    MatchAlreadyResolved {
        match_id: MatchId,
        result: MatchResult,
    },

    #[error("Permission denied: {action} requires organizer or admin role")]
    PermissionDenied { action: String },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Integrity violation: {message}")]
    IntegrityViolation { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl CourtQueueError {
    /// Shorthand for a store failure
    pub fn store(message: impl Into<String>) -> Self {
        CourtQueueError::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Shorthand for a broken invariant
    pub fn integrity(message: impl Into<String>) -> Self {
        CourtQueueError::IntegrityViolation {
            message: message.into(),
        }
    }

    /// Whether the caller may retry the operation with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, CourtQueueError::StoreUnavailable { .. })
    }

    /// Whether this is a typed domain failure rather than an infrastructure one
    pub fn is_domain_error(&self) -> bool {
        !matches!(
            self,
            CourtQueueError::StoreUnavailable { .. }
                | CourtQueueError::IntegrityViolation { .. }
                | CourtQueueError::ConfigurationError { .. }
        )
    }

    /// Stable label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CourtQueueError::AlreadyQueued { .. } => "already_queued",
            CourtQueueError::NotQueued { .. } => "not_queued",
            CourtQueueError::QueueEmpty => "queue_empty",
            CourtQueueError::InvalidTeam { .. } => "invalid_team",
            CourtQueueError::InvalidScore { .. } => "invalid_score",
            CourtQueueError::MatchNotFound { .. } => "match_not_found",
            CourtQueueError::MatchAlreadyResolved { .. } => "match_already_resolved",
            CourtQueueError::PermissionDenied { .. } => "permission_denied",
            CourtQueueError::StoreUnavailable { .. } => "store_unavailable",
            CourtQueueError::IntegrityViolation { .. } => "integrity_violation",
            CourtQueueError::ConfigurationError { .. } => "configuration_error",
        }
    }
}
