use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmAddress(pub alloy_primitives::Address);

impl From<alloy_primitives::Address> for EvmAddress {
    fn from(addr: alloy_primitives::Address) -> Self {
        EvmAddress(addr)
    }
}

impl FromStr for EvmAddress {
    type Err = alloy_primitives::AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = alloy_primitives::Address::from_str(s)?;
        Ok(EvmAddress(addr))
    }
}

/// Renders the EIP-55 checksummed form.
impl Display for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_checksum(None))
    }
}

impl Debug for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EvmAddress({})", self)
    }
}

impl Serialize for EvmAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EvmAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EvmAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl EvmAddress {
    /// Compare against an address string without regard to letter case.
    ///
    /// Mixed case is only an EIP-55 checksum rendering; it carries no identity.
    pub fn matches_ignore_case(&self, other: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(other)
    }
}

/// A 65-byte recoverable secp256k1 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmSignature(pub alloy_primitives::Signature);

impl EvmSignature {
    /// Recover the signer of an EIP-191 personal message.
    pub fn recover_personal_signer(
        &self,
        message: &[u8],
    ) -> Result<EvmAddress, alloy_primitives::SignatureError> {
        self.0.recover_address_from_msg(message).map(EvmAddress)
    }
}

impl Display for EvmSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl Debug for EvmSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EvmSignature({})", self)
    }
}

impl FromStr for EvmSignature {
    type Err = alloy_primitives::SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sig = alloy_primitives::Signature::from_str(s)?;
        Ok(EvmSignature(sig))
    }
}

impl From<alloy_primitives::Signature> for EvmSignature {
    fn from(sig: alloy_primitives::Signature) -> Self {
        EvmSignature(sig)
    }
}
