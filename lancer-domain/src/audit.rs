//! Append-only audit records.
//!
//! One row per status change, written in the same atomic operation as the
//! change itself. Rows carry the acting party verbatim and are never
//! mutated afterwards.

use crate::actor::Actor;
use crate::ids::{OrderId, PayoutId};
use crate::order::OrderStatus;
use crate::payout::PayoutStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit row recording one order status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    /// Row id
    pub id: Uuid,
    /// Order the change belongs to
    pub order_id: OrderId,
    /// Status before the change; `None` on the creation row
    pub previous: Option<OrderStatus>,
    /// Status after the change
    pub new: OrderStatus,
    /// Who made the change
    pub actor: Actor,
    /// Optional free-text note
    pub note: Option<String>,
    /// When the change happened
    pub at: DateTime<Utc>,
}

impl OrderStatusHistory {
    /// Record an order status change.
    pub fn new(
        order_id: OrderId,
        previous: Option<OrderStatus>,
        new: OrderStatus,
        actor: Actor,
        note: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_id,
            previous,
            new,
            actor,
            note,
            at: Utc::now(),
        }
    }
}

/// Audit row recording one payout status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutTimeline {
    /// Row id
    pub id: Uuid,
    /// Payout the change belongs to
    pub payout_id: PayoutId,
    /// Status before the change; `None` on the creation row
    pub previous: Option<PayoutStatus>,
    /// Status after the change
    pub new: PayoutStatus,
    /// Who made the change
    pub actor: Actor,
    /// Optional free-text note
    pub note: Option<String>,
    /// When the change happened
    pub at: DateTime<Utc>,
}

impl PayoutTimeline {
    /// Record a payout status change.
    pub fn new(
        payout_id: PayoutId,
        previous: Option<PayoutStatus>,
        new: PayoutStatus,
        actor: Actor,
        note: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            payout_id,
            previous,
            new,
            actor,
            note,
            at: Utc::now(),
        }
    }
}
