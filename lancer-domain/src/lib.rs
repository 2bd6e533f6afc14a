//! # Lancer Domain Layer
//!
//! Entities, status machines and value objects for the order lifecycle
//! and settlement engine. Pure domain logic: no I/O, no storage, no
//! clock beyond `Utc::now()` stamps.
//!
//! ## Components
//!
//! - **Order**: purchased work tracked through an eight-state lifecycle
//! - **Bid**: a freelancer's priced proposal, with a revision loop
//! - **Earning**: money owed to a partner, gated by source-level approval
//! - **Payout**: batch disbursement claiming a partner's earnings
//! - **Audit**: append-only status history rows for orders and payouts
//!
//! ## Example
//!
//! ```rust
//! use lancer_domain::{Order, OrderId, OrderStatus, ServiceKind};
//! use rust_decimal_macros::dec;
//! use uuid::Uuid;
//!
//! let mut order = Order::new(
//!     OrderId::from_seq(1),
//!     Uuid::now_v7(),
//!     "Landing page",
//!     "Five sections plus contact form",
//!     ServiceKind::Software { stack: "axum".to_string() },
//!     dec!(1200),
//! ).unwrap();
//!
//! order.transition_to(OrderStatus::Assigned).unwrap();
//! assert!(order.assigned_at.is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actor;
pub mod audit;
pub mod bid;
pub mod earning;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;
pub mod partner;
pub mod payout;

pub use actor::{Actor, ActorRole};
pub use audit::{OrderStatusHistory, PayoutTimeline};
pub use bid::{Bid, BidStatus};
pub use earning::{Earning, EarningSource, EarningStatus};
pub use error::DomainError;
pub use ids::{BidId, EarningId, OrderId, PartnerId, PayoutId};
pub use money::Amount;
pub use order::{Order, OrderStatus, PaymentStatus, Priority, ServiceKind};
pub use partner::Partner;
pub use payout::{Payout, PayoutStatus};
