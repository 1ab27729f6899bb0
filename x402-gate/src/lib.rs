//! # X402 Gate
//!
//! A framework-agnostic HTTP 402 gate that unlocks a resource once the caller proves control of
//! a wallet by signing a single-use challenge nonce.
//!
//! This crate provides [`PaymentGate`](gate::PaymentGate), which combines a
//! [`NonceLedger`](x402_gate_core::ledger::NonceLedger), a
//! [`VerifierRegistry`](x402_gate_core::verifier::VerifierRegistry) and per-chain
//! [`Offers`](offer::Offers).
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use x402_gate::{
//!     gate::{GateRequest, PaymentGate},
//!     offer::{ChainOffer, Offers},
//! };
//! use x402_gate_core::ledger::MemoryLedger;
//!
//! let gate = PaymentGate::builder()
//!     .ledger(Arc::new(MemoryLedger::default()))
//!     .offers(
//!         Offers::builder()
//!             .solana(ChainOffer::builder().price(1_000_000u64).build())
//!             .evm(
//!                 ChainOffer::builder()
//!                     .receiver("0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20")
//!                     .price(100_000_000_000_000u64)
//!                     .build(),
//!             )
//!             .build(),
//!     )
//!     .build();
//!
//! // No proof yet: the caller gets a challenge on the only configured chain.
//! assert!(gate.decide(GateRequest::default()).is_ok());
//! ```
//!
//! ## Modules
//!
//! - [`gate`]: The [`PaymentGate`](gate::PaymentGate) decision flow.
//! - [`offer`]: Receivers, prices and the challenge body.
//! - [`errors`]: [`ErrorResponse`](errors::ErrorResponse), the HTTP error carrier.
//!
//! ## Framework Integration
//!
//! With the `axum` feature, both [`ErrorResponse`](errors::ErrorResponse) and
//! [`GrantResponse`](gate::GrantResponse) implement `IntoResponse`:
//!
//! ```rust,ignore
//! async fn protected(State(gate): State<PaymentGate<MemoryLedger>>, req: Request) -> Response {
//!     gate.handle(GateRequest::from_request(&req), |grant| async move {
//!         Ok::<_, Infallible>(json!({ "message": format!("Hello, {}", grant.who) }))
//!     })
//!     .await
//!     .into_response()
//! }
//! ```
//!
//! ## Error Handling
//!
//! - `402 Payment Required` with a challenge: no proof, a malformed proof, or a bad signature.
//! - `402 Payment Required` with a reason: the nonce is unknown, expired or already used.
//! - `500 Internal Server Error`: no receiver configured, or the payload could not be built.

pub mod errors;
pub mod gate;
pub mod offer;
