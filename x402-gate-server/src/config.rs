//! Server configuration read from the environment.

use std::{num::ParseIntError, str::FromStr, time::Duration};

use http::HeaderValue;
use x402_gate::offer::{ChainOffer, DEFAULT_EVM_PRICE_WEI, DEFAULT_SOLANA_PRICE_LAMPORTS, Offers};
use x402_gate_core::{
    ledger::{LedgerConfig, MAX_WINDOW},
    networks::{evm::EvmAddress, svm::SvmAddress},
    types::{AmountValue, Chain},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be an unsigned integer, got '{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[error("{name} must be at most {max} seconds, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        max: u64,
    },
    #[error("{name} is not a valid {chain} account '{value}': {reason}")]
    InvalidReceiver {
        name: &'static str,
        chain: Chain,
        value: String,
        reason: String,
    },
    #[error("CORS_ORIGIN contains an invalid origin '{0}'")]
    InvalidCorsOrigin(String),
}

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub ledger: LedgerConfig,
    pub offers: Offers,
    pub cors: CorsOrigins,
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        ServerConfig::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`. Unset and blank values take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            var(name).map_or(Ok(default), |value| {
                value
                    .parse()
                    .map_err(|source| ConfigError::InvalidNumber {
                        name,
                        value,
                        source,
                    })
            })
        };

        let seconds = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            let value = number(name, default)?;
            let max = MAX_WINDOW.as_secs();
            if value > max {
                return Err(ConfigError::OutOfRange { name, value, max });
            }
            Ok(Duration::from_secs(value))
        };

        let port = match var("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidNumber {
                    name: "PORT",
                    value,
                    source,
                })?,
            None => 3000,
        };

        let ledger = LedgerConfig::builder()
            .ttl(seconds("NONCE_TTL_SECONDS", 300)?)
            .grace(seconds("NONCE_GRACE_SECONDS", 60)?)
            .collect_every(seconds("NONCE_COLLECT_INTERVAL_SECONDS", 30)?)
            .build();

        let solana = ChainOffer::builder()
            .maybe_receiver(receiver::<SvmAddress>(
                "SOLANA_RECEIVER",
                Chain::Solana,
                var("SOLANA_RECEIVER"),
            )?)
            .price(price(
                "SOLANA_PRICE_LAMPORTS",
                var("SOLANA_PRICE_LAMPORTS"),
                DEFAULT_SOLANA_PRICE_LAMPORTS,
            )?)
            .build();
        let evm = ChainOffer::builder()
            .maybe_receiver(receiver::<EvmAddress>(
                "EVM_RECEIVER",
                Chain::Evm,
                var("EVM_RECEIVER"),
            )?)
            .price(price(
                "EVM_PRICE_WEI",
                var("EVM_PRICE_WEI"),
                DEFAULT_EVM_PRICE_WEI,
            )?)
            .build();

        let cors = match var("CORS_ORIGIN").as_deref() {
            None | Some("*") => CorsOrigins::Any,
            Some(list) => CorsOrigins::List(
                list.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(|origin| {
                        HeaderValue::from_str(origin)
                            .map_err(|_| ConfigError::InvalidCorsOrigin(origin.to_string()))
                    })
                    .collect::<Result<_, _>>()?,
            ),
        };

        Ok(ServerConfig {
            port,
            ledger,
            offers: Offers::builder().solana(solana).evm(evm).build(),
            cors,
        })
    }
}

/// Validate a receiver account and return its canonical form.
fn receiver<A>(
    name: &'static str,
    chain: Chain,
    value: Option<String>,
) -> Result<Option<String>, ConfigError>
where
    A: FromStr + ToString,
    A::Err: ToString,
{
    value
        .map(|value| match A::from_str(&value) {
            Ok(account) => Ok(account.to_string()),
            Err(err) => Err(ConfigError::InvalidReceiver {
                name,
                chain,
                value,
                reason: err.to_string(),
            }),
        })
        .transpose()
}

fn price(
    name: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<AmountValue, ConfigError> {
    match value {
        Some(value) => value
            .parse::<AmountValue>()
            .map_err(|source| ConfigError::InvalidNumber {
                name,
                value,
                source,
            }),
        None => Ok(default.into()),
    }
}
