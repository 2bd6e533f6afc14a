//! Acting-party identity.
//!
//! Every mutating operation receives an explicit [`Actor`]; there is no
//! thread-local "current user". Audit rows store the actor verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role of the acting party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Client who posts orders and approves bids on them
    Client,
    /// Freelancer who bids on and executes orders
    Freelancer,
    /// Marketplace operator
    Admin,
    /// Internal job (nightly settlement, scheduled sync)
    System,
}

impl ActorRole {
    /// Wire/display name (snake_case, matches serialization).
    pub fn name(&self) -> &'static str {
        match self {
            ActorRole::Client => "client",
            ActorRole::Freelancer => "freelancer",
            ActorRole::Admin => "admin",
            ActorRole::System => "system",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The authenticated party performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identity of the party
    pub id: Uuid,
    /// Role the party acts under
    pub role: ActorRole,
}

impl Actor {
    /// Create an actor.
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    /// Shorthand for a client actor.
    pub fn client(id: Uuid) -> Self {
        Self::new(id, ActorRole::Client)
    }

    /// Shorthand for a freelancer actor.
    pub fn freelancer(id: Uuid) -> Self {
        Self::new(id, ActorRole::Freelancer)
    }

    /// Shorthand for an admin actor.
    pub fn admin(id: Uuid) -> Self {
        Self::new(id, ActorRole::Admin)
    }

    /// The internal system actor used by scheduled jobs.
    pub fn system() -> Self {
        Self::new(Uuid::nil(), ActorRole::System)
    }

    /// Whether the actor holds operator authority.
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, ActorRole::Admin | ActorRole::System)
    }

    /// Whether the actor is the given party, or holds operator authority.
    pub fn is_self_or_privileged(&self, id: Uuid) -> bool {
        self.id == id || self.is_privileged()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role, self.id)
    }
}
