//! Repository traits describing the persistence surface.
//!
//! The engine speaks only to these traits; [`crate::memory::MemoryStore`]
//! implements all of them for tests and single-node runs, and the
//! `postgres` feature adds database-backed pieces.

use crate::error::StoreError;
use async_trait::async_trait;
use lancer_domain::{
    Bid, BidId, Earning, EarningId, Order, OrderId, OrderStatus, OrderStatusHistory, Partner,
    PartnerId, Payout, PayoutId, PayoutTimeline,
};

/// Order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Save an order (insert or update).
    async fn save(&self, order: &Order) -> Result<(), StoreError>;

    /// Find an order by number.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders.
    async fn find_all(&self) -> Result<Vec<Order>, StoreError>;

    /// Orders currently in the given status.
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError>;

    /// Orders posted by a client.
    async fn find_by_client(&self, client: &PartnerId) -> Result<Vec<Order>, StoreError>;

    /// Orders assigned to a freelancer.
    async fn find_by_assignee(&self, freelancer: &PartnerId) -> Result<Vec<Order>, StoreError>;

    /// Delete an order outright.
    async fn delete(&self, id: &OrderId) -> Result<(), StoreError>;
}

/// Bid persistence.
#[async_trait]
pub trait BidRepository: Send + Sync {
    /// Save a bid (insert or update).
    async fn save(&self, bid: &Bid) -> Result<(), StoreError>;

    /// Find a bid by id.
    async fn find_by_id(&self, id: &BidId) -> Result<Option<Bid>, StoreError>;

    /// All bids against an order, oldest first.
    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Bid>, StoreError>;

    /// A freelancer's bids against an order, oldest first.
    async fn find_by_order_and_freelancer(
        &self,
        order_id: &OrderId,
        freelancer: &PartnerId,
    ) -> Result<Vec<Bid>, StoreError>;
}

/// Earning persistence.
#[async_trait]
pub trait EarningRepository: Send + Sync {
    /// Save an earning (insert or update).
    async fn save(&self, earning: &Earning) -> Result<(), StoreError>;

    /// Find an earning by id.
    async fn find_by_id(&self, id: &EarningId) -> Result<Option<Earning>, StoreError>;

    /// All of a partner's earnings, oldest first.
    async fn find_by_partner(&self, partner: &PartnerId) -> Result<Vec<Earning>, StoreError>;

    /// A partner's claimable earnings: `available` with no payout link.
    async fn find_available_by_partner(
        &self,
        partner: &PartnerId,
    ) -> Result<Vec<Earning>, StoreError>;

    /// Earnings linked to a payout.
    async fn find_by_payout(&self, payout_id: &PayoutId) -> Result<Vec<Earning>, StoreError>;
}

/// Payout persistence.
#[async_trait]
pub trait PayoutRepository: Send + Sync {
    /// Save a payout (insert or update).
    async fn save(&self, payout: &Payout) -> Result<(), StoreError>;

    /// Find a payout by number.
    async fn find_by_id(&self, id: &PayoutId) -> Result<Option<Payout>, StoreError>;

    /// All of a partner's payouts, oldest first.
    async fn find_by_partner(&self, partner: &PartnerId) -> Result<Vec<Payout>, StoreError>;
}

/// Partner projection persistence.
#[async_trait]
pub trait PartnerRepository: Send + Sync {
    /// Save a partner projection (insert or update).
    async fn save(&self, partner: &Partner) -> Result<(), StoreError>;

    /// Find a partner by id.
    async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, StoreError>;
}

/// Append-only audit persistence.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append an order status change row.
    async fn append_order_history(&self, row: &OrderStatusHistory) -> Result<(), StoreError>;

    /// An order's history, oldest first.
    async fn order_history(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<OrderStatusHistory>, StoreError>;

    /// Append a payout status change row.
    async fn append_payout_timeline(&self, row: &PayoutTimeline) -> Result<(), StoreError>;

    /// A payout's timeline, oldest first.
    async fn payout_timeline(
        &self,
        payout_id: &PayoutId,
    ) -> Result<Vec<PayoutTimeline>, StoreError>;
}

/// Monotonic sequence feeding the `ORD-`/`PAY-` numbering schemes.
///
/// Both schemes draw from one counter, so a value is handed out exactly
/// once across all callers. Exhausting the lock retry budget surfaces as
/// [`StoreError::Busy`], never as a reused value.
#[async_trait]
pub trait SequenceAllocator: Send + Sync {
    /// Allocate the next value, strictly greater than all previous ones.
    async fn next_id(&self) -> Result<i64, StoreError>;
}

/// Aggregate storage surface behind the engine.
#[async_trait]
pub trait Store: Send + Sync {
    /// Order repository.
    fn orders(&self) -> &dyn OrderRepository;

    /// Bid repository.
    fn bids(&self) -> &dyn BidRepository;

    /// Earning repository.
    fn earnings(&self) -> &dyn EarningRepository;

    /// Payout repository.
    fn payouts(&self) -> &dyn PayoutRepository;

    /// Partner repository.
    fn partners(&self) -> &dyn PartnerRepository;

    /// Audit repository.
    fn audit(&self) -> &dyn AuditRepository;

    /// Shared numbering sequence.
    fn sequence(&self) -> &dyn SequenceAllocator;

    /// Begin a transaction (no-op where the backend has none).
    async fn begin_transaction(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Commit the current transaction (no-op where the backend has none).
    async fn commit(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Roll back the current transaction (no-op where the backend has none).
    async fn rollback(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
