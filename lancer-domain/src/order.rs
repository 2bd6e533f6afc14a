//! Order entity and its lifecycle state machine.
//!
//! ```text
//! available ---> assigned ---> start_working ---> in_progress ---> completed
//!     ^             |  |            |  ^              |               |  ^
//!     |             |  |            v  |              v               v  |
//!     +-------------+  +--------> on_hold <-----------+         proceed_to_pay
//!
//! every non-terminal state ---> cancelled (terminal)
//! ```
//!
//! An illegal target raises [`DomainError::InvalidTransition`] and leaves
//! the order untouched, timestamps included.

use crate::error::DomainError;
use crate::ids::{OrderId, PartnerId};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Open for bidding
    Available,
    /// Handed to a freelancer, work not yet cleared to start
    Assigned,
    /// Freelancer cleared to begin
    StartWorking,
    /// Work underway
    InProgress,
    /// Work delivered
    Completed,
    /// Terminal
    Cancelled,
    /// Paused from an active state
    OnHold,
    /// In payment collection
    ProceedToPay,
}

impl OrderStatus {
    /// Wire/display name (snake_case, matches serialization).
    pub fn name(&self) -> &'static str {
        match self {
            OrderStatus::Available => "available",
            OrderStatus::Assigned => "assigned",
            OrderStatus::StartWorking => "start_working",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::OnHold => "on_hold",
            OrderStatus::ProceedToPay => "proceed_to_pay",
        }
    }

    /// Parse a wire name back into a status.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "available" => Some(OrderStatus::Available),
            "assigned" => Some(OrderStatus::Assigned),
            "start_working" => Some(OrderStatus::StartWorking),
            "in_progress" => Some(OrderStatus::InProgress),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            "on_hold" => Some(OrderStatus::OnHold),
            "proceed_to_pay" => Some(OrderStatus::ProceedToPay),
            _ => None,
        }
    }

    /// Whether `to` is a legal next status from `self`.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, to),
            (Available, Assigned | Cancelled)
                | (Assigned, StartWorking | Available | Cancelled | OnHold)
                | (StartWorking, InProgress | OnHold | Cancelled)
                | (InProgress, Completed | OnHold | Cancelled)
                | (OnHold, StartWorking | InProgress | Cancelled)
                | (Completed, ProceedToPay)
                | (ProceedToPay, Completed)
        )
    }

    /// Whether the status accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Payment Status / Priority
// =============================================================================

/// Payment collection state, driven by the billing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No successful charge yet
    Unpaid,
    /// Charge confirmed
    Paid,
    /// Charge reversed
    Refunded,
}

impl PaymentStatus {
    /// Wire/display name.
    pub fn name(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// Client-declared urgency of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// No rush
    Low,
    /// Default
    Medium,
    /// Needed soon
    High,
    /// Needed now
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    /// Wire/display name.
    pub fn name(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

// =============================================================================
// Service Kind
// =============================================================================

/// Variant-specific order payload.
///
/// One order record with a service discriminant; there is no per-service
/// entity hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceKind {
    /// Software development work
    Software {
        /// Requested technology stack, free-form
        stack: String,
    },
    /// Research and writing work
    Research {
        /// Subject area
        field: String,
    },
    /// Anything that fits neither mould
    Custom {
        /// Free-form description of the service
        details: String,
    },
}

impl ServiceKind {
    /// Discriminant name.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceKind::Software { .. } => "software",
            ServiceKind::Research { .. } => "research",
            ServiceKind::Custom { .. } => "custom",
        }
    }
}

// =============================================================================
// Order Entity
// =============================================================================

/// Order: a unit of purchased work tracked through the lifecycle machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Human-facing number, e.g. `ORD-00042`
    pub id: OrderId,
    /// Client who posted the order
    pub client: PartnerId,
    /// Short title
    pub title: String,
    /// Full description of the work
    pub description: String,
    /// Service discriminant plus per-variant payload
    pub service: ServiceKind,
    /// Client's cost estimate, non-negative
    pub cost_estimate: Decimal,

    /// Lifecycle status
    pub status: OrderStatus,
    /// Billing collaborator's view of the charge
    pub payment_status: PaymentStatus,
    /// Client-declared urgency
    pub priority: Priority,

    /// Freelancer the order is assigned to
    pub assigned_to: Option<PartnerId>,
    /// Negotiated amount carried over from the winning bid
    pub bid_amount: Option<Amount>,
    /// Hours estimated by the winning bid
    pub estimated_hours: Option<Decimal>,

    /// First entry into `assigned`
    pub assigned_at: Option<DateTime<Utc>>,
    /// When the freelancer was cleared to start
    pub ready_to_start_at: Option<DateTime<Utc>>,
    /// First entry into `in_progress`
    pub started_at: Option<DateTime<Utc>>,
    /// Latest entry into `completed`
    pub completed_at: Option<DateTime<Utc>>,
    /// Client-facing due date
    pub deadline: Option<DateTime<Utc>>,

    /// When the order was created
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order open for bidding.
    ///
    /// # Errors
    /// Returns [`DomainError::Validation`] for an empty title or a
    /// negative cost estimate.
    pub fn new(
        id: OrderId,
        client: PartnerId,
        title: impl Into<String>,
        description: impl Into<String>,
        service: ServiceKind,
        cost_estimate: Decimal,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("Order title must not be empty"));
        }
        if cost_estimate < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "Cost estimate must not be negative, got {}",
                cost_estimate
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id,
            client,
            title,
            description: description.into(),
            service,
            cost_estimate,
            status: OrderStatus::Available,
            payment_status: PaymentStatus::Unpaid,
            priority: Priority::default(),
            assigned_to: None,
            bid_amount: None,
            estimated_hours: None,
            assigned_at: None,
            ready_to_start_at: None,
            started_at: None,
            completed_at: None,
            deadline: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the order accepts new bids.
    pub fn is_biddable(&self) -> bool {
        self.status == OrderStatus::Available
    }

    /// Whether the order is in its terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the order may be deleted outright: never charged and never
    /// handed to a freelancer.
    pub fn is_deletable(&self) -> bool {
        self.payment_status == PaymentStatus::Unpaid && self.assigned_to.is_none()
    }

    /// Move the order to `to`, stamping entry timestamps.
    ///
    /// Entry effects:
    /// - `assigned` stamps `assigned_at` on first entry only
    /// - `in_progress` stamps `started_at` on first entry only
    /// - `completed` stamps `completed_at` on every entry
    /// - `available` clears the assignment and reopens bidding
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] if the move is not in
    /// the lifecycle table; the order is left untouched.
    pub fn transition_to(&mut self, to: OrderStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::invalid_transition(
                "order",
                self.status.name(),
                to.name(),
            ));
        }

        let now = Utc::now();
        match to {
            OrderStatus::Assigned => {
                if self.assigned_at.is_none() {
                    self.assigned_at = Some(now);
                }
            }
            OrderStatus::InProgress => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            OrderStatus::Completed => {
                self.completed_at = Some(now);
            }
            OrderStatus::Available => {
                self.assigned_to = None;
                self.bid_amount = None;
                self.estimated_hours = None;
                self.assigned_at = None;
                self.ready_to_start_at = None;
            }
            _ => {}
        }

        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_order() -> Order {
        Order::new(
            OrderId::from_seq(1),
            Uuid::now_v7(),
            "Landing page",
            "Five-section landing page with contact form",
            ServiceKind::Software {
                stack: "axum + htmx".to_string(),
            },
            dec!(1200),
        )
        .unwrap()
    }

    #[test]
    fn test_new_order_is_available_and_unpaid() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::Available);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.priority, Priority::Medium);
        assert!(order.is_biddable());
        assert!(order.is_deletable());
        assert!(order.assigned_at.is_none());
    }

    #[test]
    fn test_empty_title_rejected() {
        let err = Order::new(
            OrderId::from_seq(1),
            Uuid::now_v7(),
            "   ",
            "desc",
            ServiceKind::Custom {
                details: "misc".to_string(),
            },
            dec!(10),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_negative_estimate_rejected() {
        let err = Order::new(
            OrderId::from_seq(1),
            Uuid::now_v7(),
            "t",
            "d",
            ServiceKind::Custom {
                details: "misc".to_string(),
            },
            dec!(-1),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_zero_estimate_accepted() {
        // Zero means "to be negotiated"; only negatives are rejected.
        assert!(Order::new(
            OrderId::from_seq(1),
            Uuid::now_v7(),
            "t",
            "d",
            ServiceKind::Research {
                field: "economics".to_string()
            },
            Decimal::ZERO,
        )
        .is_ok());
    }

    #[test]
    fn test_transition_table_exhaustive() {
        use OrderStatus::*;
        let all = [
            Available,
            Assigned,
            StartWorking,
            InProgress,
            Completed,
            Cancelled,
            OnHold,
            ProceedToPay,
        ];
        let legal: &[(OrderStatus, OrderStatus)] = &[
            (Available, Assigned),
            (Available, Cancelled),
            (Assigned, StartWorking),
            (Assigned, Available),
            (Assigned, Cancelled),
            (Assigned, OnHold),
            (StartWorking, InProgress),
            (StartWorking, OnHold),
            (StartWorking, Cancelled),
            (InProgress, Completed),
            (InProgress, OnHold),
            (InProgress, Cancelled),
            (OnHold, StartWorking),
            (OnHold, InProgress),
            (OnHold, Cancelled),
            (Completed, ProceedToPay),
            (ProceedToPay, Completed),
        ];
        for from in all {
            for to in all {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{} -> {}",
                    from.name(),
                    to.name()
                );
            }
        }
    }

    #[test]
    fn test_cancelled_is_terminal() {
        use OrderStatus::*;
        for to in [
            Available,
            Assigned,
            StartWorking,
            InProgress,
            Completed,
            Cancelled,
            OnHold,
            ProceedToPay,
        ] {
            assert!(!Cancelled.can_transition_to(to));
        }
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_illegal_transition_leaves_order_untouched() {
        let mut order = sample_order();
        let before = order.clone();
        let err = order.transition_to(OrderStatus::InProgress).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(order.status, before.status);
        assert_eq!(order.updated_at, before.updated_at);
        assert_eq!(order.started_at, before.started_at);
    }

    #[test]
    fn test_assigned_at_stamped_once() {
        let mut order = sample_order();
        order.transition_to(OrderStatus::Assigned).unwrap();
        let first = order.assigned_at.unwrap();

        // Return to the pool clears it, a later assignment stamps fresh.
        order.transition_to(OrderStatus::Available).unwrap();
        assert!(order.assigned_at.is_none());
        order.transition_to(OrderStatus::Assigned).unwrap();
        assert!(order.assigned_at.unwrap() >= first);
    }

    #[test]
    fn test_started_at_survives_hold_roundtrip() {
        let mut order = sample_order();
        order.transition_to(OrderStatus::Assigned).unwrap();
        order.transition_to(OrderStatus::StartWorking).unwrap();
        order.transition_to(OrderStatus::InProgress).unwrap();
        let started = order.started_at.unwrap();

        order.transition_to(OrderStatus::OnHold).unwrap();
        order.transition_to(OrderStatus::InProgress).unwrap();
        assert_eq!(order.started_at.unwrap(), started);
    }

    #[test]
    fn test_completed_at_stamped_on_every_entry() {
        let mut order = sample_order();
        order.transition_to(OrderStatus::Assigned).unwrap();
        order.transition_to(OrderStatus::StartWorking).unwrap();
        order.transition_to(OrderStatus::InProgress).unwrap();
        order.transition_to(OrderStatus::Completed).unwrap();
        let first = order.completed_at.unwrap();

        order.transition_to(OrderStatus::ProceedToPay).unwrap();
        order.transition_to(OrderStatus::Completed).unwrap();
        assert!(order.completed_at.unwrap() >= first);
    }

    #[test]
    fn test_return_to_available_clears_assignment() {
        let mut order = sample_order();
        order.transition_to(OrderStatus::Assigned).unwrap();
        order.assigned_to = Some(Uuid::now_v7());
        order.bid_amount = Some(Amount::new(dec!(900)).unwrap());
        order.estimated_hours = Some(dec!(20));

        order.transition_to(OrderStatus::Available).unwrap();
        assert!(order.assigned_to.is_none());
        assert!(order.bid_amount.is_none());
        assert!(order.estimated_hours.is_none());
        assert!(order.assigned_at.is_none());
        assert!(order.is_biddable());
    }

    #[test]
    fn test_status_names_roundtrip() {
        use OrderStatus::*;
        for status in [
            Available,
            Assigned,
            StartWorking,
            InProgress,
            Completed,
            Cancelled,
            OnHold,
            ProceedToPay,
        ] {
            assert_eq!(OrderStatus::from_name(status.name()), Some(status));
        }
        assert_eq!(OrderStatus::from_name("paused"), None);
    }

    #[test]
    fn test_status_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::StartWorking).unwrap(),
            "\"start_working\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::ProceedToPay).unwrap(),
            "\"proceed_to_pay\""
        );
    }

    #[test]
    fn test_service_kind_tagged_serialization() {
        let service = ServiceKind::Research {
            field: "colonial history".to_string(),
        };
        let json = serde_json::to_value(&service).unwrap();
        assert_eq!(json["kind"], "research");
        assert_eq!(json["field"], "colonial history");
        assert_eq!(service.kind(), "research");
    }
}
