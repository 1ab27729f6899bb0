//! Network-specific account and signature types.

pub mod evm;
pub mod svm;
