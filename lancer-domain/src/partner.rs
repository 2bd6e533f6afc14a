//! Partner profile.
//!
//! The engine does not own identity; partners are a thin projection of the
//! account collaborator, carrying just what bidding and settlement need.

use crate::ids::PartnerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partner: a client or freelancer profile as seen by this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    /// Identity shared with the account collaborator
    pub id: PartnerId,
    /// Human-readable name for logs and timelines
    pub display_name: String,
    /// Whether the partner currently accepts work
    pub available: bool,
    /// When this projection was first seen
    pub created_at: DateTime<Utc>,
    /// Last sync from the account collaborator
    pub updated_at: DateTime<Utc>,
}

impl Partner {
    /// Create a partner projection.
    pub fn new(id: PartnerId, display_name: impl Into<String>, available: bool) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name: display_name.into(),
            available,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flip availability, stamping the sync time.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
        self.updated_at = Utc::now();
    }
}
