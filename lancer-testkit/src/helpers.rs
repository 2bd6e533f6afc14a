//! Seeding helpers over an in-memory engine.

use anyhow::Result;
use lancer_domain::{
    Actor, Amount, Bid, Earning, EarningSource, EarningStatus, Order, OrderId, PartnerId,
    ServiceKind,
};
use lancer_engine::{Engine, NewBid, NewEarning, NewOrder};
use lancer_store::MemoryStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

/// Fresh engine over an empty in-memory store.
pub fn test_engine() -> Engine<MemoryStore> {
    Engine::new(Arc::new(MemoryStore::new()))
}

/// Sync a partner who accepts work, returning their id.
pub async fn seed_partner(engine: &Engine<MemoryStore>, name: &str) -> Result<PartnerId> {
    let id = Uuid::now_v7();
    engine
        .upsert_partner(id, name.to_string(), true, Actor::system())
        .await?;
    Ok(id)
}

/// Create an order open for bidding, with sensible defaults.
pub async fn seed_available_order(
    engine: &Engine<MemoryStore>,
    client: PartnerId,
) -> Result<Order> {
    let order = engine
        .create_order(
            NewOrder {
                client,
                title: "Marketing site".to_string(),
                description: "Landing page with five sections and a contact form".to_string(),
                service: ServiceKind::Software {
                    stack: "axum".to_string(),
                },
                cost_estimate: dec!(1500),
                priority: None,
                deadline: None,
            },
            Actor::client(client),
        )
        .await?;
    Ok(order)
}

/// Submit a pending bid at the given price, with default effort and pitch.
pub async fn submit_pending_bid(
    engine: &Engine<MemoryStore>,
    order_id: &OrderId,
    freelancer: PartnerId,
    amount: Decimal,
) -> Result<Bid> {
    let bid = engine
        .submit_bid(
            NewBid {
                order_id: order_id.clone(),
                freelancer,
                amount: Amount::new(amount)?,
                estimated_hours: dec!(24),
                proposal: "Fixed scope, delivery in two weeks.".to_string(),
            },
            Actor::freelancer(freelancer),
        )
        .await?;
    Ok(bid)
}

/// Record an already-released earning, claimable by a payout.
pub async fn seed_released_earning(
    engine: &Engine<MemoryStore>,
    partner: PartnerId,
    amount: Decimal,
) -> Result<Earning> {
    let earning = engine
        .create_earning(
            NewEarning {
                partner,
                amount,
                source: EarningSource::Other,
                order_id: None,
                initial_status: Some(EarningStatus::Available),
            },
            Actor::system(),
        )
        .await?;
    Ok(earning)
}

/// Record an approval-gated earning, held at the gate.
pub async fn seed_gated_earning(
    engine: &Engine<MemoryStore>,
    partner: PartnerId,
    amount: Decimal,
    source: EarningSource,
) -> Result<Earning> {
    let earning = engine
        .create_earning(
            NewEarning {
                partner,
                amount,
                source,
                order_id: None,
                initial_status: None,
            },
            Actor::system(),
        )
        .await?;
    Ok(earning)
}
