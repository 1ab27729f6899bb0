use tracing_subscriber::EnvFilter;
use x402_gate_server::{config::ServerConfig, error::ServerError};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    x402_gate_server::serve(config).await
}
