//! Core types used across the X402 gate.

mod amount;
mod chain;

pub use amount::*;
pub use chain::*;
