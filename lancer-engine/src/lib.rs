//! # Lancer Engine
//!
//! Transactional operation layer for the order lifecycle and settlement
//! engine. Every mutating operation validates first, then applies all of
//! its writes inside one critical section, so observers never see a
//! half-applied bid approval or payout settlement.
//!
//! ## Components
//!
//! - **Engine**: façade over a [`Store`], one instance per process
//! - **Order operations** (`orders`): creation, lifecycle transitions,
//!   assignment, deletion, history
//! - **Bid operations** (`bids`): submission preconditions, review loop,
//!   the atomic approve
//! - **Ledger operations** (`ledger`): earning creation, approval gate,
//!   release, cancellation
//! - **Payout operations** (`payouts`): creation with conditional earning
//!   claims, the single settlement path, cancel/fail reversal
//! - **Partner operations** (`partners`): identity feed upkeep
//!
//! ## Example
//!
//! ```rust,ignore
//! use lancer_engine::{Engine, NewOrder};
//! use lancer_store::MemoryStore;
//! use std::sync::Arc;
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()));
//! let order = engine.create_order(new_order, actor).await?;
//! ```

#![warn(clippy::all)]

pub mod bids;
pub mod error;
pub mod ledger;
pub mod orders;
pub mod partners;
pub mod payouts;

pub use bids::NewBid;
pub use error::{EngineError, EngineResult, ValidationReason};
pub use ledger::NewEarning;
pub use orders::NewOrder;
pub use payouts::{NewPayout, Settlement};

use lancer_domain::{Actor, PartnerId};
use lancer_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Default bound on waiting for the engine's critical section.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Operation façade over a [`Store`].
///
/// All mutating operations serialize on an internal lock; acquisition is
/// bounded, and hitting the bound surfaces as
/// [`EngineError::ResourceBusy`] so callers can retry instead of queueing
/// forever.
pub struct Engine<S: Store> {
    store: Arc<S>,
    txn: Mutex<()>,
    lock_timeout: Duration,
}

impl<S: Store> Engine<S> {
    /// Create an engine over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_lock_timeout(store, DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an engine with an explicit critical-section wait bound.
    pub fn with_lock_timeout(store: Arc<S>, lock_timeout: Duration) -> Self {
        Self {
            store,
            txn: Mutex::new(()),
            lock_timeout,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Enter the engine's critical section, bounded by the lock timeout.
    pub(crate) async fn lock_txn(&self) -> EngineResult<MutexGuard<'_, ()>> {
        tokio::time::timeout(self.lock_timeout, self.txn.lock())
            .await
            .map_err(|_| EngineError::busy("engine is busy, try again"))
    }

    /// Require operator authority.
    pub(crate) fn ensure_privileged(&self, actor: Actor, action: &str) -> EngineResult<()> {
        if actor.is_privileged() {
            Ok(())
        } else {
            Err(EngineError::permission_denied(actor, action))
        }
    }

    /// Require the acting party to be `owner`, or an operator.
    pub(crate) fn ensure_self_or_privileged(
        &self,
        actor: Actor,
        owner: PartnerId,
        action: &str,
    ) -> EngineResult<()> {
        if actor.is_self_or_privileged(owner) {
            Ok(())
        } else {
            Err(EngineError::permission_denied(actor, action))
        }
    }
}
