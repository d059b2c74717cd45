//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order (metrics, composer, server)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use tokio::net::TcpListener;

use crate::config::ComposerConfig;
use crate::http::ComposeServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Run the composer until a stop signal arrives.
pub async fn run(config: ComposerConfig) -> Result<(), std::io::Error> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        proxy = %format!("{}:{}", config.proxy.host, config.proxy.port),
        reject_unauthorized = config.tls.reject_unauthorized,
        history = config.history.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = ComposeServer::new(&config).map_err(std::io::Error::other)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    server.run(listener, shutdown.subscribe()).await
}
