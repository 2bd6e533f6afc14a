//! Earning entity: money owed to a partner, tracked from accrual to payout.
//!
//! ```text
//! pending ----------------> available ---> processing ---> paid
//!    |                          ^    ^          |
//!    v                          |    +----------+ (payout cancelled/failed)
//! pending_approval --approve----+
//!    |
//!    +---> rejected
//!
//! any non-paid state ---> cancelled
//! ```
//!
//! Status changes here return `bool`: `true` when the earning moved,
//! `false` when the call was a no-op from the current status. Callers that
//! need hard failures (the engine does) check the flag.

use crate::actor::Actor;
use crate::error::DomainError;
use crate::ids::{EarningId, OrderId, PartnerId, PayoutId};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Earning Status / Source
// =============================================================================

/// Lifecycle status of an earning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningStatus {
    /// Accrued but not yet released
    Pending,
    /// Held at the approval gate
    PendingApproval,
    /// Released, claimable by a payout
    Available,
    /// Claimed by an in-flight payout
    Processing,
    /// Settled (terminal)
    Paid,
    /// Voided (terminal)
    Cancelled,
    /// Refused at the approval gate (terminal)
    Rejected,
}

impl EarningStatus {
    /// Wire/display name (snake_case, matches serialization).
    pub fn name(&self) -> &'static str {
        match self {
            EarningStatus::Pending => "pending",
            EarningStatus::PendingApproval => "pending_approval",
            EarningStatus::Available => "available",
            EarningStatus::Processing => "processing",
            EarningStatus::Paid => "paid",
            EarningStatus::Cancelled => "cancelled",
            EarningStatus::Rejected => "rejected",
        }
    }

    /// Whether the status accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EarningStatus::Paid | EarningStatus::Cancelled | EarningStatus::Rejected
        )
    }
}

impl fmt::Display for EarningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where an earning came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningSource {
    /// Referral commission
    Referral,
    /// One-off bonus
    Bonus,
    /// Marketing promotion credit
    Promotion,
    /// Everything else
    Other,
}

impl EarningSource {
    /// Wire/display name.
    pub fn name(&self) -> &'static str {
        match self {
            EarningSource::Referral => "referral",
            EarningSource::Bonus => "bonus",
            EarningSource::Promotion => "promotion",
            EarningSource::Other => "other",
        }
    }

    /// Whether this source must pass the approval gate before release.
    pub fn requires_approval(&self) -> bool {
        matches!(self, EarningSource::Referral | EarningSource::Promotion)
    }
}

// =============================================================================
// Earning Entity
// =============================================================================

/// Earning: an amount owed to a partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Earning {
    /// Unique earning id
    pub id: EarningId,
    /// Partner the money is owed to
    pub partner: PartnerId,
    /// Amount owed
    pub amount: Amount,
    /// Origin of the earning
    pub source: EarningSource,
    /// Lifecycle status
    pub status: EarningStatus,
    /// Order the earning accrued from, if any
    pub order_id: Option<OrderId>,
    /// Payout currently claiming this earning
    pub payout_id: Option<PayoutId>,
    /// When the earning settled
    pub paid_date: Option<DateTime<Utc>>,

    /// Who passed the approval gate
    pub approved_by: Option<Actor>,
    /// When the gate was passed
    pub approved_at: Option<DateTime<Utc>>,
    /// Who refused the earning at the gate
    pub rejected_by: Option<Actor>,
    /// When the earning was refused
    pub rejected_at: Option<DateTime<Utc>>,
    /// Reason given on rejection
    pub rejection_reason: Option<String>,
    /// Reason given on cancellation
    pub cancel_reason: Option<String>,

    /// When the earning was recorded
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl Earning {
    /// Create an earning.
    ///
    /// `requested` picks the initial status (`pending`, `pending_approval`
    /// or `available`), defaulting to `pending_approval`. Sources that
    /// require approval are forced into `pending_approval` regardless of
    /// the request.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] if `requested` names a status
    /// an earning cannot start in.
    pub fn new(
        partner: PartnerId,
        amount: Amount,
        source: EarningSource,
        order_id: Option<OrderId>,
        requested: Option<EarningStatus>,
    ) -> Result<Self, DomainError> {
        let initial = match requested {
            None => EarningStatus::PendingApproval,
            Some(
                status @ (EarningStatus::Pending
                | EarningStatus::PendingApproval
                | EarningStatus::Available),
            ) => status,
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "An earning cannot start as {}",
                    other.name()
                )));
            }
        };
        let status = if source.requires_approval() {
            EarningStatus::PendingApproval
        } else {
            initial
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            partner,
            amount,
            source,
            status,
            order_id,
            payout_id: None,
            paid_date: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether a payout can claim this earning right now.
    pub fn is_claimable(&self) -> bool {
        self.status == EarningStatus::Available && self.payout_id.is_none()
    }

    /// Release to `available`.
    ///
    /// Moves from `pending` or `pending_approval`, but never releases an
    /// approval-gated source; those go through [`Earning::approve`].
    /// Returns `false` otherwise.
    pub fn mark_available(&mut self) -> bool {
        let allowed = match self.status {
            EarningStatus::Pending | EarningStatus::PendingApproval => {
                !self.source.requires_approval()
            }
            _ => false,
        };
        if !allowed {
            return false;
        }
        self.status = EarningStatus::Available;
        self.updated_at = Utc::now();
        true
    }

    /// Claim for a payout: `available -> processing`, linking the payout.
    /// Returns `false` from any other status.
    pub fn mark_processing(&mut self, payout_id: PayoutId) -> bool {
        if self.status != EarningStatus::Available {
            return false;
        }
        self.status = EarningStatus::Processing;
        self.payout_id = Some(payout_id);
        self.updated_at = Utc::now();
        true
    }

    /// Settle: `processing` or `available` -> `paid`, stamping `paid_date`.
    /// Returns `false` from any other status.
    pub fn mark_paid(&mut self) -> bool {
        if !matches!(
            self.status,
            EarningStatus::Processing | EarningStatus::Available
        ) {
            return false;
        }
        let now = Utc::now();
        self.status = EarningStatus::Paid;
        self.paid_date = Some(now);
        self.updated_at = now;
        true
    }

    /// Pass the approval gate: `pending_approval -> available`, recording
    /// who approved. Returns `false` from any other status.
    pub fn approve(&mut self, by: Actor) -> bool {
        if self.status != EarningStatus::PendingApproval {
            return false;
        }
        let now = Utc::now();
        self.approved_by = Some(by);
        self.approved_at = Some(now);
        self.status = EarningStatus::Available;
        self.updated_at = now;
        true
    }

    /// Refuse at the approval gate: `pending_approval -> rejected`.
    /// Returns `false` from any other status.
    pub fn reject(&mut self, by: Actor, reason: impl Into<String>) -> bool {
        if self.status != EarningStatus::PendingApproval {
            return false;
        }
        let now = Utc::now();
        self.rejected_by = Some(by);
        self.rejected_at = Some(now);
        self.rejection_reason = Some(reason.into());
        self.status = EarningStatus::Rejected;
        self.updated_at = now;
        true
    }

    /// Void the earning. Legal from any non-`paid`, non-`cancelled`
    /// status; clears a payout link if one was held.
    pub fn cancel(&mut self, reason: impl Into<String>) -> bool {
        if matches!(self.status, EarningStatus::Paid | EarningStatus::Cancelled) {
            return false;
        }
        self.status = EarningStatus::Cancelled;
        self.cancel_reason = Some(reason.into());
        self.payout_id = None;
        self.updated_at = Utc::now();
        true
    }

    /// Reversal when the claiming payout is cancelled or fails:
    /// `processing -> available` with the link cleared. Returns `false`
    /// from any other status.
    pub fn revert_to_available(&mut self) -> bool {
        if self.status != EarningStatus::Processing {
            return false;
        }
        self.status = EarningStatus::Available;
        self.payout_id = None;
        self.updated_at = Utc::now();
        true
    }

    /// Drop the payout link without touching the status. Used when the
    /// claiming payout dies and this earning was linked but not in
    /// `processing`. Settled earnings keep their link; returns `false`
    /// for those and when no link is held.
    pub fn clear_payout_link(&mut self) -> bool {
        if self.payout_id.is_none() || self.status == EarningStatus::Paid {
            return false;
        }
        self.payout_id = None;
        self.updated_at = Utc::now();
        true
    }
}
