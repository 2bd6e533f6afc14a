//! Engine error types.

use lancer_domain::{Actor, DomainError};
use lancer_store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable reason code attached to validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    /// Order is not open for bidding
    OrderNotBiddable,
    /// Freelancer unknown or not accepting work
    FreelancerUnavailable,
    /// A bid for this (order, freelancer) pair already exists
    DuplicateBid,
    /// Earning is not in a claimable state
    EarningNotClaimable,
    /// Order has been charged or assigned and cannot be deleted
    NotDeletable,
    /// A payout without earnings needs an explicit positive amount
    AmountRequired,
}

impl ValidationReason {
    /// Wire code (snake_case, matches serialization).
    pub fn code(&self) -> &'static str {
        match self {
            ValidationReason::OrderNotBiddable => "order_not_biddable",
            ValidationReason::FreelancerUnavailable => "freelancer_unavailable",
            ValidationReason::DuplicateBid => "duplicate_bid",
            ValidationReason::EarningNotClaimable => "earning_not_claimable",
            ValidationReason::NotDeletable => "not_deletable",
            ValidationReason::AmountRequired => "amount_required",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Precondition failed, with a machine-readable reason code
    #[error("Validation failed ({reason}): {message}")]
    Validation {
        /// Reason code
        reason: ValidationReason,
        /// Human-readable detail
        message: String,
    },

    /// Actor lacks the authority for this operation
    #[error("Permission denied for {actor}: {action}")]
    PermissionDenied {
        /// Who tried
        actor: Actor,
        /// What they tried to do
        action: String,
    },

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Cross-entity integrity violation
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// Lock or retry budget exhausted; the caller may retry
    #[error("Resource busy: {0}")]
    ResourceBusy(String),

    /// Entity-level rule violation
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl EngineError {
    /// Build a [`EngineError::Validation`].
    pub fn validation(reason: ValidationReason, message: impl Into<String>) -> Self {
        Self::Validation {
            reason,
            message: message.into(),
        }
    }

    /// Build a [`EngineError::PermissionDenied`].
    pub fn permission_denied(actor: Actor, action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            actor,
            action: action.into(),
        }
    }

    /// Build a [`EngineError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Build a [`EngineError::Consistency`].
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    /// Build a [`EngineError::ResourceBusy`].
    pub fn busy(message: impl Into<String>) -> Self {
        Self::ResourceBusy(message.into())
    }
}

// Store lookups and lock exhaustion keep their meaning across the layer
// boundary; everything else stays a store error.
impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity_type, id } => EngineError::NotFound {
                entity: entity_type,
                id,
            },
            StoreError::Busy(message) => EngineError::ResourceBusy(message),
            other => EngineError::Store(other),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
