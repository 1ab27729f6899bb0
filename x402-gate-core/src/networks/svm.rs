use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use ed25519_dalek::{Signature as Ed25519Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use solana_pubkey::{ParsePubkeyError, Pubkey};

/// Address of the Solana system program, which owns native transfers.
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SvmAddress(pub Pubkey);

impl From<Pubkey> for SvmAddress {
    fn from(pk: Pubkey) -> Self {
        SvmAddress(pk)
    }
}

impl FromStr for SvmAddress {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pk = Pubkey::from_str(s)?;
        Ok(SvmAddress(pk))
    }
}

impl Display for SvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for SvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SvmAddress({})", self.0)
    }
}

impl Serialize for SvmAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SvmAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SvmAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SvmVerifyError {
    #[error("Account is not a valid ed25519 public key: {0}")]
    InvalidKey(ed25519_dalek::SignatureError),
    #[error("Malformed ed25519 signature: {0}")]
    InvalidSignature(ed25519_dalek::SignatureError),
    #[error("Signature does not match: {0}")]
    Mismatch(ed25519_dalek::SignatureError),
}

impl SvmAddress {
    /// Check a detached ed25519 signature made by this account over `message`.
    pub fn verify_detached(
        &self,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SvmVerifyError> {
        let key =
            VerifyingKey::from_bytes(&self.0.to_bytes()).map_err(SvmVerifyError::InvalidKey)?;
        let signature =
            Ed25519Signature::from_slice(signature).map_err(SvmVerifyError::InvalidSignature)?;
        key.verify_strict(message, &signature)
            .map_err(SvmVerifyError::Mismatch)
    }
}
