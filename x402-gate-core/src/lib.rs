//! X402 gate core library.
//!
//! Building blocks for gating a resource behind a signed, single-use payment challenge:
//!
//! - [`proof`]: The compact `kind:account:nonce:signature` proof header codec.
//! - [`verifier`]: Per-scheme signature verification behind a single [`Verdict`](verifier::Verdict) contract.
//! - [`ledger`]: Issuing and atomically consuming time-bounded challenge nonces.
//! - [`networks`]: EVM / SVM address and signature types.
//! - [`types`]: Chains, proof kinds and amounts.
//! - [`errors`]: Error types for proof parsing and nonce consumption.

pub mod errors;
pub mod ledger;
pub mod networks;
pub mod proof;
pub mod types;
pub mod verifier;
