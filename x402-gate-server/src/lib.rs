//! HTTP server exposing a resource behind the X402 signature gate.
//!
//! Configuration comes from the environment, see [`config::ServerConfig`].

pub mod config;
pub mod error;
pub mod routes;

use std::{net::SocketAddr, sync::Arc};

use x402_gate::gate::PaymentGate;
use x402_gate_core::ledger::MemoryLedger;

use crate::{config::ServerConfig, error::ServerError};

/// Assemble the payment gate for `config` on top of `ledger`.
pub fn build_gate(config: &ServerConfig, ledger: Arc<MemoryLedger>) -> PaymentGate<MemoryLedger> {
    PaymentGate::builder()
        .ledger(ledger)
        .offers(config.offers.clone())
        .build()
}

/// Run the server until Ctrl-C or SIGTERM.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    for chain in [config.offers.preferred, config.offers.preferred.other()] {
        if !config.offers.is_configured(chain) {
            tracing::warn!("No receiver configured for chain '{}'", chain);
        }
    }

    let ledger = MemoryLedger::start(config.ledger)?;
    let app = routes::app(build_gate(&config, Arc::clone(&ledger)), &config.cors);

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ledger.shutdown();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
