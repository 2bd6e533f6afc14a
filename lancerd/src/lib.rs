//! Lancer Daemon Library
//!
//! Runtime orchestrator for the order lifecycle and settlement engine.
//!
//! # Architecture
//!
//! ```text
//! Platform gateway → API Server → Engine → Store
//!                                   ↑
//!                      payment-rail callbacks
//!                      (complete / fail / sync)
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **API**: HTTP endpoints for orders, bids, earnings, payouts, partners
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use lancerd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::in_memory(config);
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;

// Re-exports for convenience
pub use api::{create_router, ApiState};
pub use config::{ApiConfig, Config, EngineConfig, Environment};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
