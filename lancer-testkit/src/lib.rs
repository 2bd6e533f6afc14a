//! Test helpers for engine-backed tests.
//!
//! Provides a fresh in-memory engine plus seeding helpers for partners,
//! orders, bids and earnings, so flow tests read as the scenario they
//! exercise instead of setup noise.

mod helpers;

pub use helpers::{
    seed_available_order, seed_gated_earning, seed_partner, seed_released_earning,
    submit_pending_bid, test_engine,
};

#[cfg(test)]
mod tests {
    use super::*;
    use lancer_domain::OrderStatus;

    #[tokio::test]
    async fn test_helpers_compose() {
        let engine = test_engine();
        let client = seed_partner(&engine, "Client").await.unwrap();
        let freelancer = seed_partner(&engine, "Freelancer").await.unwrap();

        let order = seed_available_order(&engine, client).await.unwrap();
        assert_eq!(order.id.as_str(), "ORD-00001");
        assert_eq!(order.status, OrderStatus::Available);

        let bid = submit_pending_bid(&engine, &order.id, freelancer, rust_decimal_macros::dec!(900))
            .await
            .unwrap();
        assert_eq!(bid.order_id, order.id);
    }
}
