//! # Lancer Store
//!
//! Persistence layer for the order lifecycle and settlement engine.
//!
//! ## Components
//!
//! - **Repository traits**: the surface the engine talks to
//! - **MemoryStore**: thread-safe in-memory implementation for tests and
//!   single-node runs
//! - **PgSequenceAllocator** (`postgres` feature): database-backed
//!   numbering counter
//!
//! ## Example
//!
//! ```rust
//! use lancer_store::{MemoryStore, SequenceAllocator, Store};
//!
//! # async fn demo() {
//! let store = MemoryStore::new();
//! let first = store.sequence().next_id().await.unwrap();
//! assert_eq!(first, 1);
//! # }
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod memory;
pub mod repository;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::StoreError;
pub use memory::{MemoryStore, SequenceConfig};
pub use repository::{
    AuditRepository, BidRepository, EarningRepository, OrderRepository, PartnerRepository,
    PayoutRepository, SequenceAllocator, Store,
};

#[cfg(feature = "postgres")]
pub use postgres::PgSequenceAllocator;
