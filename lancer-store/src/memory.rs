//! In-memory store implementation.
//!
//! Keeps everything in `RwLock<HashMap>` collections (audit rows in plain
//! `Vec`s so insertion order is the chronology). Used for tests and
//! single-node development runs; nothing here survives a restart.

use crate::error::StoreError;
use crate::repository::{
    AuditRepository, BidRepository, EarningRepository, OrderRepository, PartnerRepository,
    PayoutRepository, SequenceAllocator, Store,
};
use async_trait::async_trait;
use lancer_domain::{
    Bid, BidId, Earning, EarningId, Order, OrderId, OrderStatus, OrderStatusHistory, Partner,
    PartnerId, Payout, PayoutId, PayoutTimeline,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

// =============================================================================
// Sequence Config
// =============================================================================

/// Retry budget for the sequence counter lock.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Attempts before giving up with [`StoreError::Busy`]
    pub max_attempts: u32,
    /// Pause between attempts
    pub retry_delay: Duration,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            retry_delay: Duration::from_millis(1),
        }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Thread-safe in-memory store.
pub struct MemoryStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    bids: RwLock<HashMap<BidId, Bid>>,
    earnings: RwLock<HashMap<EarningId, Earning>>,
    payouts: RwLock<HashMap<PayoutId, Payout>>,
    partners: RwLock<HashMap<PartnerId, Partner>>,
    order_history: RwLock<Vec<OrderStatusHistory>>,
    payout_timeline: RwLock<Vec<PayoutTimeline>>,
    counter: Arc<Mutex<i64>>,
    sequence_config: SequenceConfig,
}

impl MemoryStore {
    /// Create an empty store with the default sequence retry budget.
    pub fn new() -> Self {
        Self::with_sequence_config(SequenceConfig::default())
    }

    /// Create an empty store with an explicit sequence retry budget.
    pub fn with_sequence_config(sequence_config: SequenceConfig) -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            bids: RwLock::new(HashMap::new()),
            earnings: RwLock::new(HashMap::new()),
            payouts: RwLock::new(HashMap::new()),
            partners: RwLock::new(HashMap::new()),
            order_history: RwLock::new(Vec::new()),
            payout_timeline: RwLock::new(Vec::new()),
            counter: Arc::new(Mutex::new(0)),
            sequence_config,
        }
    }

    /// Drop all stored data (for tests). The sequence counter keeps
    /// counting so numbers are never reused within a process.
    pub fn clear(&self) {
        self.orders.write().unwrap().clear();
        self.bids.write().unwrap().clear();
        self.earnings.write().unwrap().clear();
        self.payouts.write().unwrap().clear();
        self.partners.write().unwrap().clear();
        self.order_history.write().unwrap().clear();
        self.payout_timeline.write().unwrap().clear();
    }

    /// Number of orders held.
    pub fn order_count(&self) -> usize {
        self.orders.read().unwrap().len()
    }

    /// Number of bids held.
    pub fn bid_count(&self) -> usize {
        self.bids.read().unwrap().len()
    }

    /// Number of earnings held.
    pub fn earning_count(&self) -> usize {
        self.earnings.read().unwrap().len()
    }

    /// Number of payouts held.
    pub fn payout_count(&self) -> usize {
        self.payouts.read().unwrap().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Repository Implementations
// =============================================================================

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        self.orders
            .write()
            .unwrap()
            .insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().unwrap().get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self.orders.read().unwrap().values().cloned().collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .unwrap()
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }

    async fn find_by_client(&self, client: &PartnerId) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .unwrap()
            .values()
            .filter(|o| o.client == *client)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }

    async fn find_by_assignee(&self, freelancer: &PartnerId) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .unwrap()
            .values()
            .filter(|o| o.assigned_to == Some(*freelancer))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }

    async fn delete(&self, id: &OrderId) -> Result<(), StoreError> {
        match self.orders.write().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found("order", id.as_str())),
        }
    }
}

#[async_trait]
impl BidRepository for MemoryStore {
    async fn save(&self, bid: &Bid) -> Result<(), StoreError> {
        self.bids.write().unwrap().insert(bid.id, bid.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &BidId) -> Result<Option<Bid>, StoreError> {
        Ok(self.bids.read().unwrap().get(id).cloned())
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Bid>, StoreError> {
        let mut bids: Vec<Bid> = self
            .bids
            .read()
            .unwrap()
            .values()
            .filter(|b| b.order_id == *order_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(bids)
    }

    async fn find_by_order_and_freelancer(
        &self,
        order_id: &OrderId,
        freelancer: &PartnerId,
    ) -> Result<Vec<Bid>, StoreError> {
        let mut bids: Vec<Bid> = self
            .bids
            .read()
            .unwrap()
            .values()
            .filter(|b| b.order_id == *order_id && b.freelancer == *freelancer)
            .cloned()
            .collect();
        bids.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(bids)
    }
}

#[async_trait]
impl EarningRepository for MemoryStore {
    async fn save(&self, earning: &Earning) -> Result<(), StoreError> {
        self.earnings
            .write()
            .unwrap()
            .insert(earning.id, earning.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &EarningId) -> Result<Option<Earning>, StoreError> {
        Ok(self.earnings.read().unwrap().get(id).cloned())
    }

    async fn find_by_partner(&self, partner: &PartnerId) -> Result<Vec<Earning>, StoreError> {
        let mut earnings: Vec<Earning> = self
            .earnings
            .read()
            .unwrap()
            .values()
            .filter(|e| e.partner == *partner)
            .cloned()
            .collect();
        earnings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(earnings)
    }

    async fn find_available_by_partner(
        &self,
        partner: &PartnerId,
    ) -> Result<Vec<Earning>, StoreError> {
        let mut earnings: Vec<Earning> = self
            .earnings
            .read()
            .unwrap()
            .values()
            .filter(|e| e.partner == *partner && e.is_claimable())
            .cloned()
            .collect();
        earnings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(earnings)
    }

    async fn find_by_payout(&self, payout_id: &PayoutId) -> Result<Vec<Earning>, StoreError> {
        let mut earnings: Vec<Earning> = self
            .earnings
            .read()
            .unwrap()
            .values()
            .filter(|e| e.payout_id.as_ref() == Some(payout_id))
            .cloned()
            .collect();
        earnings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(earnings)
    }
}

#[async_trait]
impl PayoutRepository for MemoryStore {
    async fn save(&self, payout: &Payout) -> Result<(), StoreError> {
        self.payouts
            .write()
            .unwrap()
            .insert(payout.id.clone(), payout.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PayoutId) -> Result<Option<Payout>, StoreError> {
        Ok(self.payouts.read().unwrap().get(id).cloned())
    }

    async fn find_by_partner(&self, partner: &PartnerId) -> Result<Vec<Payout>, StoreError> {
        let mut payouts: Vec<Payout> = self
            .payouts
            .read()
            .unwrap()
            .values()
            .filter(|p| p.partner == *partner)
            .cloned()
            .collect();
        payouts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(payouts)
    }
}

#[async_trait]
impl PartnerRepository for MemoryStore {
    async fn save(&self, partner: &Partner) -> Result<(), StoreError> {
        self.partners
            .write()
            .unwrap()
            .insert(partner.id, partner.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, StoreError> {
        Ok(self.partners.read().unwrap().get(id).cloned())
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn append_order_history(&self, row: &OrderStatusHistory) -> Result<(), StoreError> {
        self.order_history.write().unwrap().push(row.clone());
        Ok(())
    }

    async fn order_history(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<OrderStatusHistory>, StoreError> {
        Ok(self
            .order_history
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.order_id == *order_id)
            .cloned()
            .collect())
    }

    async fn append_payout_timeline(&self, row: &PayoutTimeline) -> Result<(), StoreError> {
        self.payout_timeline.write().unwrap().push(row.clone());
        Ok(())
    }

    async fn payout_timeline(
        &self,
        payout_id: &PayoutId,
    ) -> Result<Vec<PayoutTimeline>, StoreError> {
        Ok(self
            .payout_timeline
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.payout_id == *payout_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SequenceAllocator for MemoryStore {
    async fn next_id(&self) -> Result<i64, StoreError> {
        for attempt in 0..self.sequence_config.max_attempts {
            if let Ok(mut guard) = self.counter.try_lock() {
                *guard += 1;
                return Ok(*guard);
            }
            if attempt + 1 < self.sequence_config.max_attempts {
                tokio::time::sleep(self.sequence_config.retry_delay).await;
            }
        }
        warn!(
            attempts = self.sequence_config.max_attempts,
            "sequence counter stayed locked, giving up"
        );
        Err(StoreError::busy("sequence counter is locked"))
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn bids(&self) -> &dyn BidRepository {
        self
    }

    fn earnings(&self) -> &dyn EarningRepository {
        self
    }

    fn payouts(&self) -> &dyn PayoutRepository {
        self
    }

    fn partners(&self) -> &dyn PartnerRepository {
        self
    }

    fn audit(&self) -> &dyn AuditRepository {
        self
    }

    fn sequence(&self) -> &dyn SequenceAllocator {
        self
    }
}
