use tokio::runtime::TryCurrentError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Nonce ledger needs a Tokio runtime: {0}")]
    Runtime(#[from] TryCurrentError),
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
