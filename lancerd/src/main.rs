//! Lancer Daemon
//!
//! Runtime orchestrator for the order lifecycle and settlement engine.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p lancerd
//!
//! # Start with custom environment
//! LANCER_ENV=test LANCER_API_PORT=8081 cargo run -p lancerd
//! ```
//!
//! # Environment Variables
//!
//! - `LANCER_ENV`: Environment (test, development, production)
//! - `LANCER_API_HOST`: API host (default: 0.0.0.0)
//! - `LANCER_API_PORT`: API port (default: 8080)
//! - `LANCER_LOCK_TIMEOUT_MS`: Engine critical-section wait bound (default: 5000)

use lancerd::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("lancerd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Lancer Daemon"
    );

    // Create and run daemon
    let daemon = Daemon::in_memory(config);
    daemon.run().await?;

    Ok(())
}
