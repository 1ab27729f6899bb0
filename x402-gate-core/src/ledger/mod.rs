//! Single-use, time-bounded challenge nonces.
//!
//! [`NonceLedger`] is the contract the payment gate depends on. [`MemoryLedger`] keeps the table
//! in process; a networked expiring key-value store can stand in behind the same trait when
//! several gate instances must share nonces.

mod memory;

pub use memory::MemoryLedger;

use std::time::Duration;

use bon::Builder;
use tokio::time::Instant;

use crate::errors::NonceError;

/// A freshly issued challenge nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeNonce {
    /// Opaque, unguessable token handed to the caller.
    pub token: String,
    pub created_at: Instant,
    /// `created_at + ttl`; the nonce cannot be consumed after this instant.
    pub expires_at: Instant,
}

/// Upper bound for every ledger duration. Longer values are clamped so deadlines stay
/// representable as an [`Instant`].
pub const MAX_WINDOW: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Ledger timing configuration.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Lifetime of a nonce, measured from issuance.
    #[builder(default = Duration::from_secs(300))]
    pub ttl: Duration,
    /// How long expired or consumed entries are kept before collection.
    #[builder(default = Duration::from_secs(60))]
    pub grace: Duration,
    /// Cadence of the background collector.
    #[builder(default = Duration::from_secs(30))]
    pub collect_every: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig::builder().build()
    }
}

impl LedgerConfig {
    /// This configuration with every duration capped at [`MAX_WINDOW`].
    pub fn clamped(self) -> Self {
        LedgerConfig {
            ttl: self.ttl.min(MAX_WINDOW),
            grace: self.grace.min(MAX_WINDOW),
            collect_every: self.collect_every.min(MAX_WINDOW),
        }
    }
}

/// Lifecycle store for challenge nonces.
///
/// Implementations must be safe to share between request handlers and the collector.
pub trait NonceLedger: Send + Sync {
    /// Issue a fresh nonce that is not already tracked.
    fn issue(&self) -> ChallengeNonce;

    /// Atomically validate and consume `token`.
    ///
    /// Among concurrent calls with the same token exactly one returns `Ok(())`;
    /// the others observe [`NonceError::Replayed`].
    fn consume_if_valid(&self, token: &str) -> Result<(), NonceError>;

    /// Evict stale entries, returning how many were removed.
    fn collect(&self) -> usize;

    /// Configured nonce lifetime.
    fn ttl(&self) -> Duration;
}
