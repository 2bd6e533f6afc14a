//! Bid entity: a freelancer's priced proposal against an open order.
//!
//! ```text
//! pending ---> under_review ---> revision_requested ---> pending (resubmit)
//!    |              |                    |
//!    +--------------+--------------------+---> withdrawn
//!    |              |
//!    +--------------+---> approved | rejected
//! ```
//!
//! `approved`, `rejected` and `withdrawn` are terminal.

use crate::actor::Actor;
use crate::error::DomainError;
use crate::ids::{BidId, OrderId, PartnerId};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Bid Status
// =============================================================================

/// Lifecycle status of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    /// Awaiting a decision
    Pending,
    /// Won the order (terminal)
    Approved,
    /// Turned down (terminal)
    Rejected,
    /// Pulled by the freelancer (terminal)
    Withdrawn,
    /// Client is actively evaluating
    UnderReview,
    /// Sent back to the freelancer for changes
    RevisionRequested,
}

impl BidStatus {
    /// Wire/display name (snake_case, matches serialization).
    pub fn name(&self) -> &'static str {
        match self {
            BidStatus::Pending => "pending",
            BidStatus::Approved => "approved",
            BidStatus::Rejected => "rejected",
            BidStatus::Withdrawn => "withdrawn",
            BidStatus::UnderReview => "under_review",
            BidStatus::RevisionRequested => "revision_requested",
        }
    }

    /// Whether the status accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BidStatus::Approved | BidStatus::Rejected | BidStatus::Withdrawn
        )
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Bid Entity
// =============================================================================

/// Bid: a freelancer's proposal to perform an order at a price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    /// Unique bid id
    pub id: BidId,
    /// Order the bid targets
    pub order_id: OrderId,
    /// Freelancer who submitted the bid
    pub freelancer: PartnerId,
    /// Proposed price
    pub amount: Amount,
    /// Proposed effort, in hours
    pub estimated_hours: Decimal,
    /// Pitch text
    pub proposal: String,

    /// Lifecycle status
    pub status: BidStatus,
    /// Times the bid went back to `pending` after a revision request
    pub revision_count: u32,

    /// Who approved the bid
    pub approved_by: Option<Actor>,
    /// When the bid was approved
    pub approved_at: Option<DateTime<Utc>>,
    /// Who rejected the bid
    pub rejected_by: Option<Actor>,
    /// When the bid was rejected
    pub rejected_at: Option<DateTime<Utc>>,
    /// Who moved the bid into review or asked for a revision
    pub reviewed_by: Option<Actor>,
    /// Note attached to a rejection or revision request
    pub decision_note: Option<String>,

    /// When the bid was submitted
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    /// Create a pending bid.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] for non-positive hours or an
    /// empty proposal.
    pub fn new(
        order_id: OrderId,
        freelancer: PartnerId,
        amount: Amount,
        estimated_hours: Decimal,
        proposal: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if estimated_hours <= Decimal::ZERO {
            return Err(DomainError::validation("Estimated hours must be positive"));
        }
        let proposal = proposal.into();
        if proposal.trim().is_empty() {
            return Err(DomainError::validation("Proposal text is required"));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            order_id,
            freelancer,
            amount,
            estimated_hours,
            proposal,
            status: BidStatus::Pending,
            revision_count: 0,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            reviewed_by: None,
            decision_note: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the bid still awaits a decision.
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether the bid can be decided right now (approved or rejected).
    pub fn is_decidable(&self) -> bool {
        matches!(self.status, BidStatus::Pending | BidStatus::UnderReview)
    }

    /// Approve the bid.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] unless the bid is
    /// `pending` or `under_review`.
    pub fn approve(&mut self, by: Actor) -> Result<(), DomainError> {
        if !self.is_decidable() {
            return Err(DomainError::invalid_transition(
                "bid",
                self.status.name(),
                BidStatus::Approved.name(),
            ));
        }
        let now = Utc::now();
        self.status = BidStatus::Approved;
        self.approved_by = Some(by);
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Reject the bid with a required note.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] unless the bid is
    /// `pending` or `under_review`, or [`DomainError::Validation`] when
    /// the note is empty.
    pub fn reject(&mut self, by: Actor, note: impl Into<String>) -> Result<(), DomainError> {
        if !self.is_decidable() {
            return Err(DomainError::invalid_transition(
                "bid",
                self.status.name(),
                BidStatus::Rejected.name(),
            ));
        }
        let note = note.into();
        if note.trim().is_empty() {
            return Err(DomainError::validation("Rejection requires a note"));
        }
        let now = Utc::now();
        self.status = BidStatus::Rejected;
        self.rejected_by = Some(by);
        self.rejected_at = Some(now);
        self.decision_note = Some(note);
        self.updated_at = now;
        Ok(())
    }

    /// Move the bid into active review.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] unless the bid is `pending`.
    pub fn mark_under_review(&mut self, by: Actor) -> Result<(), DomainError> {
        if self.status != BidStatus::Pending {
            return Err(DomainError::invalid_transition(
                "bid",
                self.status.name(),
                BidStatus::UnderReview.name(),
            ));
        }
        self.status = BidStatus::UnderReview;
        self.reviewed_by = Some(by);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Send the bid back for changes, with a required note.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] unless the bid is
    /// `pending` or `under_review`, or [`DomainError::Validation`] when
    /// the note is empty.
    pub fn request_revision(
        &mut self,
        by: Actor,
        note: impl Into<String>,
    ) -> Result<(), DomainError> {
        if !self.is_decidable() {
            return Err(DomainError::invalid_transition(
                "bid",
                self.status.name(),
                BidStatus::RevisionRequested.name(),
            ));
        }
        let note = note.into();
        if note.trim().is_empty() {
            return Err(DomainError::validation("Revision request requires a note"));
        }
        self.status = BidStatus::RevisionRequested;
        self.reviewed_by = Some(by);
        self.decision_note = Some(note);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Withdraw the bid. Legal from any non-terminal status.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] if the bid is already
    /// decided or withdrawn.
    pub fn withdraw(&mut self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(
                "bid",
                self.status.name(),
                BidStatus::Withdrawn.name(),
            ));
        }
        self.status = BidStatus::Withdrawn;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Resubmit after a revision request, returning the bid to `pending`
    /// and bumping `revision_count`. `None` fields keep their value.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] unless the bid is
    /// `revision_requested`, or [`DomainError::Validation`] for bad
    /// replacement values.
    pub fn resubmit(
        &mut self,
        amount: Option<Amount>,
        estimated_hours: Option<Decimal>,
        proposal: Option<String>,
    ) -> Result<(), DomainError> {
        if self.status != BidStatus::RevisionRequested {
            return Err(DomainError::invalid_transition(
                "bid",
                self.status.name(),
                BidStatus::Pending.name(),
            ));
        }
        if matches!(estimated_hours, Some(hours) if hours <= Decimal::ZERO) {
            return Err(DomainError::validation("Estimated hours must be positive"));
        }
        if matches!(&proposal, Some(text) if text.trim().is_empty()) {
            return Err(DomainError::validation("Proposal text is required"));
        }

        if let Some(amount) = amount {
            self.amount = amount;
        }
        if let Some(hours) = estimated_hours {
            self.estimated_hours = hours;
        }
        if let Some(text) = proposal {
            self.proposal = text;
        }
        self.status = BidStatus::Pending;
        self.revision_count += 1;
        self.decision_note = None;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_bid() -> Bid {
        Bid::new(
            OrderId::from_seq(1),
            Uuid::now_v7(),
            Amount::new(dec!(800)).unwrap(),
            dec!(16),
            "I have shipped three similar sites.",
        )
        .unwrap()
    }

    #[test]
    fn test_new_bid_is_pending() {
        let bid = sample_bid();
        assert_eq!(bid.status, BidStatus::Pending);
        assert_eq!(bid.revision_count, 0);
        assert!(bid.is_open());
        assert!(bid.is_decidable());
    }

    #[test]
    fn test_empty_proposal_rejected() {
        let err = Bid::new(
            OrderId::from_seq(1),
            Uuid::now_v7(),
            Amount::new(dec!(800)).unwrap(),
            dec!(16),
            "  ",
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_non_positive_hours_rejected() {
        let err = Bid::new(
            OrderId::from_seq(1),
            Uuid::now_v7(),
            Amount::new(dec!(800)).unwrap(),
            Decimal::ZERO,
            "pitch",
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_approve_from_pending_and_under_review() {
        let admin = Actor::admin(Uuid::now_v7());

        let mut bid = sample_bid();
        bid.approve(admin).unwrap();
        assert_eq!(bid.status, BidStatus::Approved);
        assert_eq!(bid.approved_by, Some(admin));
        assert!(bid.approved_at.is_some());

        let mut bid = sample_bid();
        bid.mark_under_review(admin).unwrap();
        bid.approve(admin).unwrap();
        assert_eq!(bid.status, BidStatus::Approved);
    }

    #[test]
    fn test_approve_twice_fails() {
        let admin = Actor::admin(Uuid::now_v7());
        let mut bid = sample_bid();
        bid.approve(admin).unwrap();
        let err = bid.approve(admin).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_reject_requires_note() {
        let admin = Actor::admin(Uuid::now_v7());
        let mut bid = sample_bid();
        let err = bid.reject(admin, "   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(bid.status, BidStatus::Pending);

        bid.reject(admin, "Budget mismatch").unwrap();
        assert_eq!(bid.status, BidStatus::Rejected);
        assert_eq!(bid.decision_note.as_deref(), Some("Budget mismatch"));
        assert_eq!(bid.rejected_by, Some(admin));
    }

    #[test]
    fn test_revision_cycle_increments_count_and_clears_note() {
        let client = Actor::client(Uuid::now_v7());
        let mut bid = sample_bid();

        bid.request_revision(client, "Please quote hosting separately")
            .unwrap();
        assert_eq!(bid.status, BidStatus::RevisionRequested);
        assert_eq!(bid.reviewed_by, Some(client));
        assert!(bid.decision_note.is_some());

        bid.resubmit(Some(Amount::new(dec!(850)).unwrap()), None, None)
            .unwrap();
        assert_eq!(bid.status, BidStatus::Pending);
        assert_eq!(bid.revision_count, 1);
        assert_eq!(bid.amount.as_decimal(), dec!(850));
        assert!(bid.decision_note.is_none());

        // A second round keeps counting.
        bid.request_revision(client, "And a delivery date").unwrap();
        bid.resubmit(None, None, Some("Delivery in two weeks.".to_string()))
            .unwrap();
        assert_eq!(bid.revision_count, 2);
        assert_eq!(bid.proposal, "Delivery in two weeks.");
    }

    #[test]
    fn test_resubmit_only_from_revision_requested() {
        let mut bid = sample_bid();
        let err = bid.resubmit(None, None, None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_resubmit_rejects_bad_replacement_without_mutating() {
        let client = Actor::client(Uuid::now_v7());
        let mut bid = sample_bid();
        bid.request_revision(client, "tighten the estimate").unwrap();

        let err = bid
            .resubmit(
                Some(Amount::new(dec!(900)).unwrap()),
                Some(dec!(-5)),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        // Nothing applied, not even the valid amount.
        assert_eq!(bid.amount.as_decimal(), dec!(800));
        assert_eq!(bid.status, BidStatus::RevisionRequested);
        assert_eq!(bid.revision_count, 0);
    }

    #[test]
    fn test_withdraw_from_open_states() {
        let client = Actor::client(Uuid::now_v7());

        let mut bid = sample_bid();
        bid.withdraw().unwrap();
        assert_eq!(bid.status, BidStatus::Withdrawn);

        let mut bid = sample_bid();
        bid.mark_under_review(client).unwrap();
        bid.withdraw().unwrap();
        assert_eq!(bid.status, BidStatus::Withdrawn);

        let mut bid = sample_bid();
        bid.request_revision(client, "needs detail").unwrap();
        bid.withdraw().unwrap();
        assert_eq!(bid.status, BidStatus::Withdrawn);
    }

    #[test]
    fn test_withdraw_after_decision_fails() {
        let admin = Actor::admin(Uuid::now_v7());
        let mut bid = sample_bid();
        bid.approve(admin).unwrap();
        assert!(bid.withdraw().is_err());
    }

    #[test]
    fn test_under_review_only_from_pending() {
        let admin = Actor::admin(Uuid::now_v7());
        let mut bid = sample_bid();
        bid.mark_under_review(admin).unwrap();
        let err = bid.mark_under_review(admin).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_status_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&BidStatus::UnderReview).unwrap(),
            "\"under_review\""
        );
        assert_eq!(
            serde_json::to_string(&BidStatus::RevisionRequested).unwrap(),
            "\"revision_requested\""
        );
    }
}
