//! Entity identifiers.
//!
//! Orders and payouts carry human-facing numbers rendered from a shared
//! monotonic sequence, so a number is never reused across either scheme.
//! Everything else uses time-ordered UUIDs (v7).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a [`crate::bid::Bid`]
pub type BidId = Uuid;

/// Unique identifier for an [`crate::earning::Earning`]
pub type EarningId = Uuid;

/// Unique identifier for a [`crate::partner::Partner`]
pub type PartnerId = Uuid;

/// Human-facing order number, e.g. `ORD-00042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Render an order number from a sequence value.
    pub fn from_seq(seq: i64) -> Self {
        Self(format!("ORD-{:05}", seq))
    }

    /// The number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Human-facing payout number, e.g. `PAY-00043`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PayoutId(String);

impl PayoutId {
    /// Render a payout number from a sequence value.
    pub fn from_seq(seq: i64) -> Self {
        Self(format!("PAY-{:05}", seq))
    }

    /// The number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PayoutId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PayoutId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_rendering() {
        assert_eq!(OrderId::from_seq(1).as_str(), "ORD-00001");
        assert_eq!(OrderId::from_seq(42).as_str(), "ORD-00042");
        assert_eq!(OrderId::from_seq(123456).as_str(), "ORD-123456");
    }

    #[test]
    fn test_payout_id_rendering() {
        assert_eq!(PayoutId::from_seq(7).as_str(), "PAY-00007");
        assert_eq!(PayoutId::from_seq(99999).as_str(), "PAY-99999");
    }

    #[test]
    fn test_ids_from_shared_sequence_never_collide() {
        // Both schemes draw from one counter, so equal text never appears.
        let order = OrderId::from_seq(10);
        let payout = PayoutId::from_seq(11);
        assert_ne!(order.as_str(), payout.as_str());
    }

    #[test]
    fn test_order_id_serde_is_plain_string() {
        let id = OrderId::from_seq(5);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ORD-00005\"");
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
