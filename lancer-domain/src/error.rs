//! Domain errors shared by every entity in this crate.

use thiserror::Error;

/// Errors raised by entity constructors and guarded status changes.
///
/// A failed guard never mutates the entity: status, timestamps and
/// metadata are exactly what they were before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Requested status change is not in the entity's lifecycle table
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        /// Entity kind ("order", "bid", "earning", "payout")
        entity: &'static str,
        /// Status the entity is in
        from: String,
        /// Status that was requested
        to: String,
    },

    /// Field-level validation failure
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    /// Build an [`DomainError::InvalidTransition`] from status names.
    pub fn invalid_transition(
        entity: &'static str,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Build a [`DomainError::Validation`] from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
