//! Payout entity: a batch disbursement of a partner's earnings.
//!
//! ```text
//! pending ---> processing ---> completed
//!    |              |
//!    +--------------+---> cancelled | failed
//! ```
//!
//! `completed` is the settled state; re-completing a completed payout is
//! an accepted no-op, so an external payment webhook may retry safely.

use crate::actor::Actor;
use crate::error::DomainError;
use crate::ids::{PartnerId, PayoutId};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Payout Status
// =============================================================================

/// Lifecycle status of a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Created, earnings claimed
    Pending,
    /// Disbursement in flight
    Processing,
    /// Funds delivered (settled)
    Completed,
    /// Disbursement failed (terminal)
    Failed,
    /// Called off before settlement (terminal)
    Cancelled,
}

impl PayoutStatus {
    /// Wire/display name (snake_case, matches serialization).
    pub fn name(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the status accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Failed | PayoutStatus::Cancelled)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Payout Entity
// =============================================================================

/// Payout: a disbursement request covering one partner's claimed earnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    /// Human-facing number, e.g. `PAY-00043`
    pub id: PayoutId,
    /// Partner being paid
    pub partner: PartnerId,
    /// Total to disburse; equals the sum of claimed earnings
    pub amount: Amount,
    /// Lifecycle status
    pub status: PayoutStatus,
    /// How the money travels ("bank_transfer", "paypal", ...)
    pub payment_method: String,
    /// Method-specific routing details
    pub payment_details: String,

    /// Who requested the payout
    pub requested_by: Actor,
    /// Who ran the settlement
    pub processed_by: Option<Actor>,
    /// External payment reference recorded at settlement
    pub transaction_id: Option<String>,
    /// When the payout settled
    pub processed_date: Option<DateTime<Utc>>,
    /// Message recorded when the disbursement failed
    pub failure_message: Option<String>,
    /// Reason recorded when the payout was called off
    pub cancel_reason: Option<String>,

    /// When the payout was requested
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl Payout {
    /// Create a pending payout.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] when the payment method is
    /// empty.
    pub fn new(
        id: PayoutId,
        partner: PartnerId,
        amount: Amount,
        payment_method: impl Into<String>,
        payment_details: impl Into<String>,
        requested_by: Actor,
    ) -> Result<Self, DomainError> {
        let payment_method = payment_method.into();
        if payment_method.trim().is_empty() {
            return Err(DomainError::validation("Payment method is required"));
        }

        let now = Utc::now();
        Ok(Self {
            id,
            partner,
            amount,
            status: PayoutStatus::Pending,
            payment_method,
            payment_details: payment_details.into(),
            requested_by,
            processed_by: None,
            transaction_id: None,
            processed_date: None,
            failure_message: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the payout has settled.
    pub fn is_settled(&self) -> bool {
        self.status == PayoutStatus::Completed
    }

    /// Hand the payout to the payment rail: `pending -> processing`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] from any other status.
    pub fn mark_processing(&mut self) -> Result<(), DomainError> {
        if self.status != PayoutStatus::Pending {
            return Err(DomainError::invalid_transition(
                "payout",
                self.status.name(),
                PayoutStatus::Processing.name(),
            ));
        }
        self.status = PayoutStatus::Processing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Settle the payout, recording the external reference and who ran it.
    ///
    /// Legal from `pending` (a rail may settle in one step), `processing`,
    /// and `completed`. Returns `true` when the payout moved, `false` for
    /// the already-completed no-op.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] from `failed` or
    /// `cancelled`.
    pub fn complete(
        &mut self,
        transaction_id: impl Into<String>,
        by: Actor,
    ) -> Result<bool, DomainError> {
        match self.status {
            PayoutStatus::Completed => Ok(false),
            PayoutStatus::Pending | PayoutStatus::Processing => {
                let now = Utc::now();
                self.status = PayoutStatus::Completed;
                self.transaction_id = Some(transaction_id.into());
                self.processed_by = Some(by);
                self.processed_date = Some(now);
                self.updated_at = now;
                Ok(true)
            }
            PayoutStatus::Failed | PayoutStatus::Cancelled => {
                Err(DomainError::invalid_transition(
                    "payout",
                    self.status.name(),
                    PayoutStatus::Completed.name(),
                ))
            }
        }
    }

    /// Call the payout off: `pending|processing -> cancelled`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] from any other status.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        if !matches!(self.status, PayoutStatus::Pending | PayoutStatus::Processing) {
            return Err(DomainError::invalid_transition(
                "payout",
                self.status.name(),
                PayoutStatus::Cancelled.name(),
            ));
        }
        self.status = PayoutStatus::Cancelled;
        self.cancel_reason = Some(reason.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record a rail failure: `pending|processing -> failed`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] from any other status.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), DomainError> {
        if !matches!(self.status, PayoutStatus::Pending | PayoutStatus::Processing) {
            return Err(DomainError::invalid_transition(
                "payout",
                self.status.name(),
                PayoutStatus::Failed.name(),
            ));
        }
        self.status = PayoutStatus::Failed;
        self.failure_message = Some(message.into());
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_payout() -> Payout {
        Payout::new(
            PayoutId::from_seq(7),
            Uuid::now_v7(),
            Amount::new(dec!(450)).unwrap(),
            "bank_transfer",
            "IBAN DE89 3704 0044 0532 0130 00",
            Actor::admin(Uuid::now_v7()),
        )
        .unwrap()
    }

    #[test]
    fn test_new_payout_is_pending() {
        let payout = sample_payout();
        assert_eq!(payout.status, PayoutStatus::Pending);
        assert!(payout.transaction_id.is_none());
        assert!(!payout.is_settled());
    }

    #[test]
    fn test_empty_payment_method_rejected() {
        let err = Payout::new(
            PayoutId::from_seq(1),
            Uuid::now_v7(),
            Amount::new(dec!(10)).unwrap(),
            " ",
            "",
            Actor::system(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_complete_from_processing() {
        let admin = Actor::admin(Uuid::now_v7());
        let mut payout = sample_payout();
        payout.mark_processing().unwrap();
        let changed = payout.complete("wire-123", admin).unwrap();
        assert!(changed);
        assert_eq!(payout.status, PayoutStatus::Completed);
        assert_eq!(payout.transaction_id.as_deref(), Some("wire-123"));
        assert_eq!(payout.processed_by, Some(admin));
        assert!(payout.processed_date.is_some());
    }

    #[test]
    fn test_complete_straight_from_pending() {
        let mut payout = sample_payout();
        assert!(payout.complete("wire-9", Actor::system()).unwrap());
        assert!(payout.is_settled());
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut payout = sample_payout();
        payout.complete("wire-1", Actor::system()).unwrap();
        let first_date = payout.processed_date;

        let changed = payout.complete("wire-2", Actor::system()).unwrap();
        assert!(!changed);
        // The original settlement record stands.
        assert_eq!(payout.transaction_id.as_deref(), Some("wire-1"));
        assert_eq!(payout.processed_date, first_date);
    }

    #[test]
    fn test_complete_refused_after_failure_or_cancel() {
        let mut failed = sample_payout();
        failed.fail("insufficient rail balance").unwrap();
        assert!(failed.complete("wire-1", Actor::system()).is_err());

        let mut cancelled = sample_payout();
        cancelled.cancel("requested by partner").unwrap();
        assert!(cancelled.complete("wire-1", Actor::system()).is_err());
    }

    #[test]
    fn test_mark_processing_only_from_pending() {
        let mut payout = sample_payout();
        payout.mark_processing().unwrap();
        let err = payout.mark_processing().unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cancel_from_pending_and_processing() {
        let mut payout = sample_payout();
        payout.cancel("partner asked").unwrap();
        assert_eq!(payout.status, PayoutStatus::Cancelled);
        assert_eq!(payout.cancel_reason.as_deref(), Some("partner asked"));

        let mut payout = sample_payout();
        payout.mark_processing().unwrap();
        payout.cancel("rail outage").unwrap();
        assert_eq!(payout.status, PayoutStatus::Cancelled);
    }

    #[test]
    fn test_fail_records_message() {
        let mut payout = sample_payout();
        payout.fail("account closed").unwrap();
        assert_eq!(payout.status, PayoutStatus::Failed);
        assert_eq!(payout.failure_message.as_deref(), Some("account closed"));

        // Terminal states refuse further changes.
        assert!(payout.cancel("too late").is_err());
        assert!(payout.fail("again").is_err());
        assert!(payout.status.is_terminal());
    }

    #[test]
    fn test_status_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&PayoutStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::to_string(&PayoutStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
