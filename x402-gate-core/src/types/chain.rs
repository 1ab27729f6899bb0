//! Chains a payment can be made on, and the proof kinds that target them.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ProofError;

/// A chain family that can receive payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Solana, paid in lamports.
    Solana,
    /// An EVM chain, paid in wei.
    Evm,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Evm => "evm",
        }
    }

    /// The other chain family.
    pub fn other(&self) -> Chain {
        match self {
            Chain::Solana => Chain::Evm,
            Chain::Evm => Chain::Solana,
        }
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown chain: {0}")]
pub struct UnknownChain(pub String);

impl FromStr for Chain {
    type Err = UnknownChain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solana" | "sol" => Ok(Chain::Solana),
            "evm" | "eth" | "ethereum" => Ok(Chain::Evm),
            _ => Err(UnknownChain(s.to_string())),
        }
    }
}

/// Wallet scheme a proof was produced with.
///
/// Each kind is bound to exactly one [`Chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    /// Ed25519 detached signature from a base58 public key.
    Phantom,
    /// secp256k1 personal-sign signature from a `0x` address.
    Metamask,
}

impl ProofKind {
    pub const ALL: [ProofKind; 2] = [ProofKind::Phantom, ProofKind::Metamask];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProofKind::Phantom => "phantom",
            ProofKind::Metamask => "metamask",
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            ProofKind::Phantom => Chain::Solana,
            ProofKind::Metamask => Chain::Evm,
        }
    }

    /// Resolve the kind from the first colon-delimited segment of a header,
    /// even if the rest of the header is malformed.
    pub fn from_header_prefix(header: &str) -> Option<ProofKind> {
        header.split(':').next().and_then(|kind| kind.parse().ok())
    }
}

impl Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofKind {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProofKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProofError::BadKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_chain_binding() {
        assert_eq!(ProofKind::Phantom.chain(), Chain::Solana);
        assert_eq!(ProofKind::Metamask.chain(), Chain::Evm);
    }

    #[test]
    fn test_kind_from_header_prefix() {
        assert_eq!(
            ProofKind::from_header_prefix("metamask:not-enough"),
            Some(ProofKind::Metamask)
        );
        assert_eq!(ProofKind::from_header_prefix("ledger:a:b:c"), None);
        assert_eq!(ProofKind::from_header_prefix(""), None);
    }

    #[test]
    fn test_chain_parse() {
        assert_eq!("Solana".parse::<Chain>().unwrap(), Chain::Solana);
        assert_eq!("evm".parse::<Chain>().unwrap(), Chain::Evm);
        assert!("bitcoin".parse::<Chain>().is_err());
    }
}
