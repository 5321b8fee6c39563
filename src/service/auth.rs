//! Authenticated principals and role capabilities
//!
//! Identity arrives already verified; this module only decides what a role
//! may do.

use crate::error::{CourtQueueError, Result};
use crate::types::ParticipantId;
use serde::{Deserialize, Serialize};

/// Role carried by an authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Organizer,
    Admin,
}

impl Role {
    /// Parse an opaque role string; anything unrecognised is a player
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "organizer" => Role::Organizer,
            "admin" => Role::Admin,
            _ => Role::Player,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Organizer => "organizer",
            Role::Admin => "admin",
        }
    }

    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageQueue | Capability::ManageMatches => {
                matches!(self, Role::Organizer | Role::Admin)
            }
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Privileged actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Calling participants off the line
    ManageQueue,
    /// Creating and resolving matches, viewing completed matches
    ManageMatches,
}

/// Caller identity as supplied by the identity layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub participant_id: ParticipantId,
    pub role: Role,
}

impl Principal {
    pub fn new(participant_id: ParticipantId, role: &str) -> Self {
        Self {
            participant_id,
            role: Role::parse(role),
        }
    }

    pub fn player(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            role: Role::Player,
        }
    }

    /// `PermissionDenied` unless the role grants `capability`
    pub fn require(&self, capability: Capability, action: &str) -> Result<()> {
        if self.role.grants(capability) {
            Ok(())
        } else {
            Err(CourtQueueError::PermissionDenied {
                action: action.to_string(),
            })
        }
    }
}
