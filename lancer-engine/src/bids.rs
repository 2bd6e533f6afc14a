//! Bid operations: submission, review, decision, resubmission.

use crate::error::{EngineError, EngineResult, ValidationReason};
use crate::orders::apply_assignment;
use crate::Engine;
use lancer_domain::{Actor, ActorRole, Amount, Bid, BidId, BidStatus, Order, OrderId, PartnerId};
use lancer_store::Store;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters for submitting a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBid {
    /// Order the bid targets
    pub order_id: OrderId,
    /// Bidding freelancer
    pub freelancer: PartnerId,
    /// Proposed price
    pub amount: Amount,
    /// Proposed effort, in hours
    pub estimated_hours: Decimal,
    /// Pitch text
    pub proposal: String,
}

impl<S: Store> Engine<S> {
    /// Submit a bid against an open order.
    ///
    /// Preconditions, checked in order: the order is open for bidding, the
    /// freelancer exists and accepts work, and the pair has no earlier bid
    /// (withdrawn and rejected ones included).
    pub async fn submit_bid(&self, new: NewBid, actor: Actor) -> EngineResult<Bid> {
        match actor.role {
            ActorRole::Freelancer if actor.id != new.freelancer => {
                return Err(EngineError::permission_denied(
                    actor,
                    "bid on behalf of another freelancer",
                ));
            }
            ActorRole::Client => {
                return Err(EngineError::permission_denied(actor, "submit a bid"));
            }
            _ => {}
        }

        let _guard = self.lock_txn().await?;

        let order = self.get_order(&new.order_id).await?;
        if !order.is_biddable() {
            return Err(EngineError::validation(
                ValidationReason::OrderNotBiddable,
                format!("order {} is {}, not open for bids", order.id, order.status),
            ));
        }
        let partner = self.store().partners().find_by_id(&new.freelancer).await?;
        if !partner.map(|p| p.available).unwrap_or(false) {
            return Err(EngineError::validation(
                ValidationReason::FreelancerUnavailable,
                format!(
                    "freelancer {} is unknown or not accepting work",
                    new.freelancer
                ),
            ));
        }
        let existing = self
            .store()
            .bids()
            .find_by_order_and_freelancer(&new.order_id, &new.freelancer)
            .await?;
        if existing.is_some() {
            return Err(EngineError::validation(
                ValidationReason::DuplicateBid,
                format!(
                    "freelancer {} already bid on order {}",
                    new.freelancer, new.order_id
                ),
            ));
        }

        let bid = Bid::new(
            new.order_id,
            new.freelancer,
            new.amount,
            new.estimated_hours,
            new.proposal,
        )?;
        self.store().bids().save(&bid).await?;

        info!(bid_id = %bid.id, order_id = %bid.order_id, freelancer = %bid.freelancer, "bid submitted");
        Ok(bid)
    }

    /// Fetch one bid.
    pub async fn get_bid(&self, id: &BidId) -> EngineResult<Bid> {
        self.store()
            .bids()
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("bid", id.to_string()))
    }

    /// All bids on an order, oldest first.
    pub async fn list_bids(&self, order_id: &OrderId) -> EngineResult<Vec<Bid>> {
        self.get_order(order_id).await?;
        Ok(self.store().bids().find_by_order(order_id).await?)
    }

    /// Approve a bid: the bid wins, the order goes to the bidder
    /// (`available -> assigned -> start_working`) at the bid's price, and
    /// every sibling still in `pending` is rejected. Siblings parked in
    /// `under_review` are left for an explicit decision. One atomic
    /// operation; any failure leaves all three parts untouched.
    pub async fn approve_bid(&self, id: &BidId, actor: Actor) -> EngineResult<(Bid, Order)> {
        let _guard = self.lock_txn().await?;

        let mut bid = self.get_bid(id).await?;
        let mut order = self.order_for_bid(&bid).await?;
        ensure_decider(&order, actor, format!("decide bids on order {}", order.id))?;

        bid.approve(actor)?;
        let rows = apply_assignment(
            &mut order,
            bid.freelancer,
            Some(bid.amount),
            Some(bid.estimated_hours),
            actor,
            Some(format!("Bid {} approved", bid.id)),
        )?;

        let mut losers = Vec::new();
        for mut sibling in self.store().bids().find_by_order(&bid.order_id).await? {
            if sibling.id != bid.id && sibling.status == BidStatus::Pending {
                sibling.reject(actor, "Another bid was approved")?;
                losers.push(sibling);
            }
        }

        let applied: EngineResult<()> = async {
            self.store().begin_transaction().await?;
            self.store().bids().save(&bid).await?;
            self.store().orders().save(&order).await?;
            for row in &rows {
                self.store().audit().append_order_history(row).await?;
            }
            for loser in &losers {
                self.store().bids().save(loser).await?;
            }
            self.store().commit().await?;
            Ok(())
        }
        .await;
        if let Err(err) = applied {
            let _ = self.store().rollback().await;
            return Err(err);
        }

        info!(
            bid_id = %bid.id,
            order_id = %order.id,
            freelancer = %bid.freelancer,
            rejected_siblings = losers.len(),
            "bid approved"
        );
        Ok((bid, order))
    }

    /// Reject a bid with a note for the freelancer.
    pub async fn reject_bid(&self, id: &BidId, note: String, actor: Actor) -> EngineResult<Bid> {
        let _guard = self.lock_txn().await?;

        let mut bid = self.get_bid(id).await?;
        let order = self.order_for_bid(&bid).await?;
        ensure_decider(&order, actor, format!("decide bids on order {}", order.id))?;

        bid.reject(actor, note)?;
        self.store().bids().save(&bid).await?;

        info!(bid_id = %bid.id, order_id = %bid.order_id, "bid rejected");
        Ok(bid)
    }

    /// Move a bid into active review.
    pub async fn mark_bid_under_review(&self, id: &BidId, actor: Actor) -> EngineResult<Bid> {
        let _guard = self.lock_txn().await?;

        let mut bid = self.get_bid(id).await?;
        let order = self.order_for_bid(&bid).await?;
        ensure_decider(&order, actor, format!("review bids on order {}", order.id))?;

        bid.mark_under_review(actor)?;
        self.store().bids().save(&bid).await?;

        info!(bid_id = %bid.id, order_id = %bid.order_id, "bid under review");
        Ok(bid)
    }

    /// Send a bid back to the freelancer for changes.
    pub async fn request_bid_revision(
        &self,
        id: &BidId,
        note: String,
        actor: Actor,
    ) -> EngineResult<Bid> {
        let _guard = self.lock_txn().await?;

        let mut bid = self.get_bid(id).await?;
        let order = self.order_for_bid(&bid).await?;
        ensure_decider(&order, actor, format!("review bids on order {}", order.id))?;

        bid.request_revision(actor, note)?;
        self.store().bids().save(&bid).await?;

        info!(bid_id = %bid.id, order_id = %bid.order_id, "bid revision requested");
        Ok(bid)
    }

    /// Withdraw an open bid.
    pub async fn withdraw_bid(&self, id: &BidId, actor: Actor) -> EngineResult<Bid> {
        let _guard = self.lock_txn().await?;

        let mut bid = self.get_bid(id).await?;
        self.ensure_self_or_privileged(actor, bid.freelancer, "withdraw this bid")?;

        bid.withdraw()?;
        self.store().bids().save(&bid).await?;

        info!(bid_id = %bid.id, order_id = %bid.order_id, "bid withdrawn");
        Ok(bid)
    }

    /// Resubmit after a revision request, optionally replacing the price,
    /// hours or pitch.
    pub async fn resubmit_bid(
        &self,
        id: &BidId,
        amount: Option<Amount>,
        estimated_hours: Option<Decimal>,
        proposal: Option<String>,
        actor: Actor,
    ) -> EngineResult<Bid> {
        let _guard = self.lock_txn().await?;

        let mut bid = self.get_bid(id).await?;
        self.ensure_self_or_privileged(actor, bid.freelancer, "resubmit this bid")?;

        bid.resubmit(amount, estimated_hours, proposal)?;
        self.store().bids().save(&bid).await?;

        info!(bid_id = %bid.id, revision = bid.revision_count, "bid resubmitted");
        Ok(bid)
    }

    /// Resolve the order a bid points at. A dangling reference means the
    /// store broke an invariant, not that the caller asked for something
    /// missing.
    async fn order_for_bid(&self, bid: &Bid) -> EngineResult<Order> {
        self.store()
            .orders()
            .find_by_id(&bid.order_id)
            .await?
            .ok_or_else(|| {
                EngineError::consistency(format!(
                    "bid {} references missing order {}",
                    bid.id, bid.order_id
                ))
            })
    }
}

/// Bids are decided by the order's client or an operator.
fn ensure_decider(order: &Order, actor: Actor, action: String) -> EngineResult<()> {
    if actor.is_privileged() || (actor.role == ActorRole::Client && order.client == actor.id) {
        Ok(())
    } else {
        Err(EngineError::permission_denied(actor, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::NewOrder;
    use lancer_domain::{OrderStatus, ServiceKind};
    use lancer_store::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    struct Fixture {
        engine: Engine<MemoryStore>,
        client: Actor,
        order_id: OrderId,
    }

    async fn fixture() -> Fixture {
        let engine = Engine::new(Arc::new(MemoryStore::new()));
        let client = Actor::client(Uuid::now_v7());
        let order = engine
            .create_order(
                NewOrder {
                    client: client.id,
                    title: "API integration".to_string(),
                    description: "Wire the CRM to the billing system".to_string(),
                    service: ServiceKind::Software {
                        stack: "rust".to_string(),
                    },
                    cost_estimate: dec!(2000),
                    priority: None,
                    deadline: None,
                },
                client,
            )
            .await
            .unwrap();
        Fixture {
            engine,
            client,
            order_id: order.id,
        }
    }

    async fn seed_freelancer(engine: &Engine<MemoryStore>) -> Actor {
        let id = Uuid::now_v7();
        engine
            .upsert_partner(id, "Freelancer".to_string(), true, Actor::system())
            .await
            .unwrap();
        Actor::freelancer(id)
    }

    fn new_bid(order_id: &OrderId, freelancer: PartnerId, amount: Decimal) -> NewBid {
        NewBid {
            order_id: order_id.clone(),
            freelancer,
            amount: Amount::new(amount).unwrap(),
            estimated_hours: dec!(20),
            proposal: "I can deliver this in two weeks.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_bid() {
        let f = fixture().await;
        let me = seed_freelancer(&f.engine).await;

        let bid = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1800)), me)
            .await
            .unwrap();
        assert_eq!(bid.status, BidStatus::Pending);
        assert_eq!(bid.order_id, f.order_id);

        let listed = f.engine.list_bids(&f.order_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, bid.id);
    }

    #[tokio::test]
    async fn test_submit_rejects_closed_order() {
        let f = fixture().await;
        let me = seed_freelancer(&f.engine).await;
        f.engine
            .transition_order(&f.order_id, OrderStatus::Cancelled, f.client, None)
            .await
            .unwrap();

        let err = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1800)), me)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                reason: ValidationReason::OrderNotBiddable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_or_unavailable_freelancer() {
        let f = fixture().await;

        // Never synced.
        let ghost = Actor::freelancer(Uuid::now_v7());
        let err = f
            .engine
            .submit_bid(new_bid(&f.order_id, ghost.id, dec!(1800)), ghost)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                reason: ValidationReason::FreelancerUnavailable,
                ..
            }
        ));

        // Synced but not accepting work.
        let busy = Uuid::now_v7();
        f.engine
            .upsert_partner(busy, "Busy".to_string(), false, Actor::system())
            .await
            .unwrap();
        let err = f
            .engine
            .submit_bid(
                new_bid(&f.order_id, busy, dec!(1800)),
                Actor::freelancer(busy),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                reason: ValidationReason::FreelancerUnavailable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_one_bid_per_pair_even_after_withdrawal() {
        let f = fixture().await;
        let me = seed_freelancer(&f.engine).await;

        let bid = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1800)), me)
            .await
            .unwrap();
        let err = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1700)), me)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                reason: ValidationReason::DuplicateBid,
                ..
            }
        ));

        // Withdrawing does not reopen the slot.
        f.engine.withdraw_bid(&bid.id, me).await.unwrap();
        let err = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1600)), me)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                reason: ValidationReason::DuplicateBid,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_submit_authority() {
        let f = fixture().await;
        let me = seed_freelancer(&f.engine).await;

        // A client never bids.
        let err = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1800)), f.client)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        // One freelancer cannot bid as another.
        let other = Actor::freelancer(Uuid::now_v7());
        let err = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1800)), other)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_approve_bid_assigns_order_and_rejects_pending_siblings() {
        let f = fixture().await;
        let winner = seed_freelancer(&f.engine).await;
        let pending_loser = seed_freelancer(&f.engine).await;
        let reviewed = seed_freelancer(&f.engine).await;

        let winning = f
            .engine
            .submit_bid(new_bid(&f.order_id, winner.id, dec!(1800)), winner)
            .await
            .unwrap();
        let losing = f
            .engine
            .submit_bid(new_bid(&f.order_id, pending_loser.id, dec!(1500)), pending_loser)
            .await
            .unwrap();
        let parked = f
            .engine
            .submit_bid(new_bid(&f.order_id, reviewed.id, dec!(1900)), reviewed)
            .await
            .unwrap();
        f.engine
            .mark_bid_under_review(&parked.id, f.client)
            .await
            .unwrap();

        let (approved, order) = f.engine.approve_bid(&winning.id, f.client).await.unwrap();
        assert_eq!(approved.status, BidStatus::Approved);
        assert_eq!(approved.approved_by, Some(f.client));

        // The order went to the winner at the bid's terms.
        assert_eq!(order.status, OrderStatus::StartWorking);
        assert_eq!(order.assigned_to, Some(winner.id));
        assert_eq!(order.bid_amount.map(|a| a.as_decimal()), Some(dec!(1800)));
        assert_eq!(order.estimated_hours, Some(dec!(20)));
        assert!(order.ready_to_start_at.is_some());

        // Pending sibling auto-rejected, reviewed sibling untouched.
        let losing = f.engine.get_bid(&losing.id).await.unwrap();
        assert_eq!(losing.status, BidStatus::Rejected);
        assert_eq!(
            losing.decision_note.as_deref(),
            Some("Another bid was approved")
        );
        let parked = f.engine.get_bid(&parked.id).await.unwrap();
        assert_eq!(parked.status, BidStatus::UnderReview);

        // Two transitions were recorded.
        let history = f.engine.order_history(&f.order_id).await.unwrap();
        let transitions: Vec<OrderStatus> = history.iter().map(|r| r.new).collect();
        assert_eq!(
            transitions,
            vec![
                OrderStatus::Available,
                OrderStatus::Assigned,
                OrderStatus::StartWorking
            ]
        );
    }

    #[tokio::test]
    async fn test_approve_fails_whole_when_order_not_available() {
        let f = fixture().await;
        let first = seed_freelancer(&f.engine).await;
        let second = seed_freelancer(&f.engine).await;

        let a = f
            .engine
            .submit_bid(new_bid(&f.order_id, first.id, dec!(1800)), first)
            .await
            .unwrap();
        let b = f
            .engine
            .submit_bid(new_bid(&f.order_id, second.id, dec!(1700)), second)
            .await
            .unwrap();
        // Park b in review so the first approval does not auto-reject it.
        f.engine.mark_bid_under_review(&b.id, f.client).await.unwrap();

        f.engine.approve_bid(&a.id, f.client).await.unwrap();

        // Approving b now passes the bid gate but fails the order gate;
        // the bid must come out untouched.
        let err = f.engine.approve_bid(&b.id, f.client).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(lancer_domain::DomainError::InvalidTransition { .. })
        ));
        let b = f.engine.get_bid(&b.id).await.unwrap();
        assert_eq!(b.status, BidStatus::UnderReview);
        assert!(b.approved_at.is_none());
        let order = f.engine.get_order(&f.order_id).await.unwrap();
        assert_eq!(order.assigned_to, Some(first.id));
        assert_eq!(f.engine.order_history(&f.order_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_decision_authority() {
        let f = fixture().await;
        let me = seed_freelancer(&f.engine).await;
        let bid = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1800)), me)
            .await
            .unwrap();

        // The bidder cannot decide their own bid.
        let err = f.engine.approve_bid(&bid.id, me).await.unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        // Neither can an unrelated client.
        let stranger = Actor::client(Uuid::now_v7());
        let err = f
            .engine
            .reject_bid(&bid.id, "not a fit".to_string(), stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        // The order's client can.
        f.engine
            .reject_bid(&bid.id, "Budget mismatch".to_string(), f.client)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reject_requires_note() {
        let f = fixture().await;
        let me = seed_freelancer(&f.engine).await;
        let bid = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1800)), me)
            .await
            .unwrap();

        let err = f
            .engine
            .reject_bid(&bid.id, "  ".to_string(), f.client)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(lancer_domain::DomainError::Validation(_))
        ));
        let bid = f.engine.get_bid(&bid.id).await.unwrap();
        assert_eq!(bid.status, BidStatus::Pending);
    }

    #[tokio::test]
    async fn test_revision_roundtrip() {
        let f = fixture().await;
        let me = seed_freelancer(&f.engine).await;
        let bid = f
            .engine
            .submit_bid(new_bid(&f.order_id, me.id, dec!(1800)), me)
            .await
            .unwrap();

        f.engine
            .request_bid_revision(&bid.id, "Split out hosting costs".to_string(), f.client)
            .await
            .unwrap();

        // Only the bid's owner resubmits.
        let other = Actor::freelancer(Uuid::now_v7());
        let err = f
            .engine
            .resubmit_bid(&bid.id, None, None, None, other)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        let revised = f
            .engine
            .resubmit_bid(
                &bid.id,
                Some(Amount::new(dec!(1850)).unwrap()),
                None,
                None,
                me,
            )
            .await
            .unwrap();
        assert_eq!(revised.status, BidStatus::Pending);
        assert_eq!(revised.revision_count, 1);
        assert_eq!(revised.amount.as_decimal(), dec!(1850));

        // The revised bid can win.
        let (approved, _) = f.engine.approve_bid(&bid.id, f.client).await.unwrap();
        assert_eq!(approved.status, BidStatus::Approved);
    }

    #[tokio::test]
    async fn test_get_bid_not_found() {
        let f = fixture().await;
        let err = f.engine.get_bid(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "bid", .. }));
    }
}
