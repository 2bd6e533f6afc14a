//! Daemon: main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Engine (order lifecycle and settlement operations)
//! - Store (persistence)
//! - API server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Initialize engine over the store
//! 3. Report store state
//! 4. Start API server
//! 5. Wait for shutdown signal (SIGINT)
//! 6. Graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use lancer_engine::Engine;
use lancer_store::{MemoryStore, Store};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Daemon
// =============================================================================

/// The main lancer daemon.
pub struct Daemon<S: Store + 'static> {
    /// Configuration
    config: Config,
    /// Operation engine
    engine: Arc<Engine<S>>,
}

impl Daemon<MemoryStore> {
    /// Create a daemon over an in-memory store (testing/development).
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(Engine::with_lock_timeout(
            store,
            config.engine.lock_timeout(),
        ));

        Self { config, engine }
    }
}

impl<S: Store + 'static> Daemon<S> {
    /// Create a daemon over a provided engine.
    pub fn new(config: Config, engine: Arc<Engine<S>>) -> Self {
        Self { config, engine }
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting lancer daemon"
        );

        // 1. Report store state
        self.report_open_orders().await?;

        // 2. Start API server
        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        // 3. Wait for shutdown signal
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Received shutdown signal");

        // 4. Graceful shutdown
        self.shutdown().await?;

        Ok(())
    }

    /// Count orders still in flight and log the result.
    async fn report_open_orders(&self) -> DaemonResult<()> {
        let orders = self.engine.store().orders().find_all().await?;
        let open = orders.iter().filter(|o| !o.is_terminal()).count();

        if open > 0 {
            info!(total = orders.len(), open, "Orders present in store");
        } else {
            info!("No open orders in store");
        }

        Ok(())
    }

    /// Start the API server.
    async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let state = Arc::new(ApiState {
            engine: self.engine.clone(),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| DaemonError::Config(format!("Failed to get local address: {}", e)))?;

        // Spawn the server task
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "API server error");
            }
        });

        Ok(local_addr)
    }

    /// Graceful shutdown.
    async fn shutdown(&self) -> DaemonResult<()> {
        info!("Initiating graceful shutdown");

        // Nothing is buffered outside the store; shutdown only reports.
        let orders = self.engine.store().orders().find_all().await?;
        let open = orders.iter().filter(|o| !o.is_terminal()).count();
        info!(open_orders = open, "Shutdown complete");

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
