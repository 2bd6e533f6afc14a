//! Order operations: creation, lifecycle transitions, assignment.

use crate::error::{EngineError, EngineResult, ValidationReason};
use crate::Engine;
use chrono::{DateTime, Utc};
use lancer_domain::{
    Actor, ActorRole, Amount, Order, OrderId, OrderStatus, OrderStatusHistory, PartnerId,
    Priority, ServiceKind,
};
use lancer_store::Store;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// Client the order belongs to
    pub client: PartnerId,
    /// Short title
    pub title: String,
    /// Full description of the work
    pub description: String,
    /// Service discriminant plus payload
    pub service: ServiceKind,
    /// Client's cost estimate, non-negative
    pub cost_estimate: Decimal,
    /// Urgency, defaults to `medium`
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Client-facing due date
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// Drive `available -> assigned -> start_working` on an order, stamping
/// the assignment fields. Returns the history rows to append, one per
/// transition. The `available -> assigned` gate rejects any other start
/// state before anything is touched.
pub(crate) fn apply_assignment(
    order: &mut Order,
    freelancer: PartnerId,
    bid_amount: Option<Amount>,
    estimated_hours: Option<Decimal>,
    actor: Actor,
    note: Option<String>,
) -> EngineResult<Vec<OrderStatusHistory>> {
    let mut rows = Vec::with_capacity(2);

    let previous = order.status;
    order.transition_to(OrderStatus::Assigned)?;
    order.assigned_to = Some(freelancer);
    if bid_amount.is_some() {
        order.bid_amount = bid_amount;
    }
    if estimated_hours.is_some() {
        order.estimated_hours = estimated_hours;
    }
    rows.push(OrderStatusHistory::new(
        order.id.clone(),
        Some(previous),
        OrderStatus::Assigned,
        actor,
        note,
    ));

    order.transition_to(OrderStatus::StartWorking)?;
    order.ready_to_start_at = Some(Utc::now());
    rows.push(OrderStatusHistory::new(
        order.id.clone(),
        Some(OrderStatus::Assigned),
        OrderStatus::StartWorking,
        actor,
        None,
    ));

    Ok(rows)
}

impl<S: Store> Engine<S> {
    /// Create an order open for bidding, allocating its number and writing
    /// the creation history row.
    pub async fn create_order(&self, new: NewOrder, actor: Actor) -> EngineResult<Order> {
        match actor.role {
            ActorRole::Client if actor.id != new.client => {
                return Err(EngineError::permission_denied(
                    actor,
                    "create an order for another client",
                ));
            }
            ActorRole::Freelancer => {
                return Err(EngineError::permission_denied(actor, "create an order"));
            }
            _ => {}
        }

        let _guard = self.lock_txn().await?;

        let seq = self.store().sequence().next_id().await?;
        let mut order = Order::new(
            OrderId::from_seq(seq),
            new.client,
            new.title,
            new.description,
            new.service,
            new.cost_estimate,
        )?;
        if let Some(priority) = new.priority {
            order.priority = priority;
        }
        order.deadline = new.deadline;
        let row = OrderStatusHistory::new(order.id.clone(), None, order.status, actor, None);

        self.store().begin_transaction().await?;
        self.store().orders().save(&order).await?;
        self.store().audit().append_order_history(&row).await?;
        self.store().commit().await?;

        info!(order_id = %order.id, client = %order.client, "order created");
        Ok(order)
    }

    /// Fetch one order.
    pub async fn get_order(&self, id: &OrderId) -> EngineResult<Order> {
        self.store()
            .orders()
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("order", id.as_str()))
    }

    /// List orders, optionally narrowed to one status.
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> EngineResult<Vec<Order>> {
        let orders = match status {
            Some(status) => self.store().orders().find_by_status(status).await?,
            None => self.store().orders().find_all().await?,
        };
        Ok(orders)
    }

    /// Orders posted by a client.
    pub async fn list_orders_for_client(&self, client: &PartnerId) -> EngineResult<Vec<Order>> {
        Ok(self.store().orders().find_by_client(client).await?)
    }

    /// Orders assigned to a freelancer.
    pub async fn list_orders_for_assignee(
        &self,
        freelancer: &PartnerId,
    ) -> EngineResult<Vec<Order>> {
        Ok(self.store().orders().find_by_assignee(freelancer).await?)
    }

    /// An order's status history, oldest first.
    pub async fn order_history(&self, id: &OrderId) -> EngineResult<Vec<OrderStatusHistory>> {
        self.get_order(id).await?;
        Ok(self.store().audit().order_history(id).await?)
    }

    /// Drive one status transition, appending the history row in the same
    /// operation.
    pub async fn transition_order(
        &self,
        id: &OrderId,
        to: OrderStatus,
        actor: Actor,
        note: Option<String>,
    ) -> EngineResult<Order> {
        let _guard = self.lock_txn().await?;

        let mut order = self.get_order(id).await?;
        ensure_may_transition(&order, to, actor)?;

        let previous = order.status;
        order.transition_to(to)?;
        let row = OrderStatusHistory::new(order.id.clone(), Some(previous), to, actor, note);

        self.store().begin_transaction().await?;
        self.store().orders().save(&order).await?;
        self.store().audit().append_order_history(&row).await?;
        self.store().commit().await?;

        info!(order_id = %order.id, from = %previous, to = %to, actor = %actor, "order transitioned");
        Ok(order)
    }

    /// Hand an order to a freelancer and clear them to start
    /// (`available -> assigned -> start_working`), optionally recording a
    /// negotiated amount.
    pub async fn assign_order(
        &self,
        id: &OrderId,
        freelancer: PartnerId,
        bid_amount: Option<Amount>,
        actor: Actor,
        note: Option<String>,
    ) -> EngineResult<Order> {
        self.ensure_privileged(actor, "assign an order")?;
        let _guard = self.lock_txn().await?;

        let mut order = self.get_order(id).await?;
        let partner = self.store().partners().find_by_id(&freelancer).await?;
        if !partner.map(|p| p.available).unwrap_or(false) {
            return Err(EngineError::validation(
                ValidationReason::FreelancerUnavailable,
                format!("freelancer {} is unknown or not accepting work", freelancer),
            ));
        }

        let rows = apply_assignment(&mut order, freelancer, bid_amount, None, actor, note)?;

        self.store().begin_transaction().await?;
        self.store().orders().save(&order).await?;
        for row in &rows {
            self.store().audit().append_order_history(row).await?;
        }
        self.store().commit().await?;

        info!(order_id = %order.id, freelancer = %freelancer, "order assigned");
        Ok(order)
    }

    /// Delete an order that was never charged and never assigned.
    pub async fn delete_order(&self, id: &OrderId, actor: Actor) -> EngineResult<()> {
        let _guard = self.lock_txn().await?;

        let order = self.get_order(id).await?;
        let owner = actor.role == ActorRole::Client && order.client == actor.id;
        if !(owner || actor.is_privileged()) {
            return Err(EngineError::permission_denied(
                actor,
                format!("delete order {}", id),
            ));
        }
        if !order.is_deletable() {
            return Err(EngineError::validation(
                ValidationReason::NotDeletable,
                format!("order {} has been charged or assigned", id),
            ));
        }

        self.store().orders().delete(id).await?;
        info!(order_id = %id, actor = %actor, "order deleted");
        Ok(())
    }
}

/// Authority table for plain transitions: operators move anything; a
/// client may cancel or hold their own order; the assigned freelancer
/// drives work progress.
fn ensure_may_transition(order: &Order, to: OrderStatus, actor: Actor) -> EngineResult<()> {
    if actor.is_privileged() {
        return Ok(());
    }
    let allowed = match actor.role {
        ActorRole::Client => {
            order.client == actor.id
                && matches!(to, OrderStatus::Cancelled | OrderStatus::OnHold)
        }
        ActorRole::Freelancer => {
            order.assigned_to == Some(actor.id)
                && matches!(
                    to,
                    OrderStatus::StartWorking | OrderStatus::InProgress | OrderStatus::Completed
                )
        }
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(EngineError::permission_denied(
            actor,
            format!("transition order {} to {}", order.id, to),
        ))
    }
}
