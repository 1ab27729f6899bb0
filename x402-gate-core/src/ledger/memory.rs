use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    runtime::{Handle, TryCurrentError},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    errors::NonceError,
    ledger::{ChallengeNonce, LedgerConfig, NonceLedger},
};

/// Maximum number of deletions performed under one lock acquisition during collection.
const COLLECT_BATCH: usize = 256;

const MIN_COLLECT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
struct NonceEntry {
    expires_at: Instant,
    consumed_at: Option<Instant>,
}

impl NonceEntry {
    fn is_stale(&self, now: Instant, grace: Duration) -> bool {
        let past = |at: Instant| at.checked_add(grace).is_some_and(|deadline| now >= deadline);
        past(self.expires_at) || self.consumed_at.is_some_and(past)
    }
}

/// In-process [`NonceLedger`] backed by a locked hash map.
///
/// Built with [`MemoryLedger::start`], the ledger runs its own collector task on the current
/// Tokio runtime. The task only holds a weak reference and ends when the ledger is dropped or
/// [`shutdown`](MemoryLedger::shutdown) is called.
///
/// ```
/// use x402_gate_core::{errors::NonceError, ledger::{MemoryLedger, NonceLedger}};
///
/// let ledger = MemoryLedger::default();
/// let nonce = ledger.issue();
///
/// assert_eq!(ledger.consume_if_valid(&nonce.token), Ok(()));
/// assert_eq!(ledger.consume_if_valid(&nonce.token), Err(NonceError::Replayed));
/// ```
#[derive(Debug)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<String, NonceEntry>>,
    config: LedgerConfig,
    collector: Mutex<Option<JoinHandle<()>>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        MemoryLedger::new(LedgerConfig::default())
    }
}

impl MemoryLedger {
    /// A ledger without a background collector.
    ///
    /// Durations above [`MAX_WINDOW`](crate::ledger::MAX_WINDOW) are clamped.
    pub fn new(config: LedgerConfig) -> Self {
        let clamped = config.clamped();

        #[cfg(feature = "tracing")]
        if clamped != config {
            tracing::warn!("Ledger durations clamped: {:?}", clamped);
        }

        MemoryLedger {
            entries: Mutex::new(HashMap::new()),
            config: clamped,
            collector: Mutex::new(None),
        }
    }

    /// A shared ledger with its collector running on the current Tokio runtime.
    pub fn start(config: LedgerConfig) -> Result<Arc<Self>, TryCurrentError> {
        let runtime = Handle::try_current()?;
        let ledger = Arc::new(MemoryLedger::new(config));

        let handle = runtime.spawn(run_collector(
            Arc::downgrade(&ledger),
            ledger.config.collect_every.max(MIN_COLLECT_INTERVAL),
        ));
        *ledger.collector.lock() = Some(handle);

        Ok(ledger)
    }

    /// Stop the background collector, if any.
    pub fn shutdown(&self) {
        if let Some(handle) = self.collector.lock().take() {
            handle.abort();

            #[cfg(feature = "tracing")]
            tracing::debug!("Nonce collector stopped");
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Number of tracked entries, including consumed and expired ones not yet collected.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for MemoryLedger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl NonceLedger for MemoryLedger {
    fn issue(&self) -> ChallengeNonce {
        let created_at = Instant::now();
        let expires_at = created_at + self.config.ttl;

        let mut entries = self.entries.lock();
        loop {
            let token = Uuid::new_v4().simple().to_string();
            if let Entry::Vacant(slot) = entries.entry(token.clone()) {
                slot.insert(NonceEntry {
                    expires_at,
                    consumed_at: None,
                });
                return ChallengeNonce {
                    token,
                    created_at,
                    expires_at,
                };
            }
        }
    }

    fn consume_if_valid(&self, token: &str) -> Result<(), NonceError> {
        let now = Instant::now();

        let mut entries = self.entries.lock();
        let entry = entries.get_mut(token).ok_or(NonceError::NotFound)?;
        if now > entry.expires_at {
            return Err(NonceError::Expired);
        }
        if entry.consumed_at.is_some() {
            return Err(NonceError::Replayed);
        }
        entry.consumed_at = Some(now);

        Ok(())
    }

    fn collect(&self) -> usize {
        let now = Instant::now();
        let grace = self.config.grace;

        let stale: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.is_stale(now, grace))
            .map(|(token, _)| token.clone())
            .collect();

        let mut removed = 0;
        for batch in stale.chunks(COLLECT_BATCH) {
            let mut entries = self.entries.lock();
            for token in batch {
                // Re-check: the entry may have changed since the snapshot.
                if entries
                    .get(token)
                    .is_some_and(|entry| entry.is_stale(now, grace))
                {
                    entries.remove(token);
                    removed += 1;
                }
            }
        }

        #[cfg(feature = "tracing")]
        if removed > 0 {
            tracing::debug!("Collected {} stale nonces", removed);
        }

        removed
    }

    fn ttl(&self) -> Duration {
        self.config.ttl
    }
}

async fn run_collector(weak: Weak<MemoryLedger>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(ledger) = weak.upgrade() else {
            break;
        };
        ledger.collect();
    }
}
