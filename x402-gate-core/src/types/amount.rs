//! [`AmountValue`] represents a price in a chain's smallest unit.
//!
//! This module holds its type definition and implementations.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Represents a price in the chain-native smallest unit (lamports, wei).
///
/// Uses a `u128` internally so wei amounts fit. Serialized as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountValue(pub u128);

impl From<u32> for AmountValue {
    fn from(value: u32) -> Self {
        AmountValue(value as u128)
    }
}

impl From<u64> for AmountValue {
    fn from(value: u64) -> Self {
        AmountValue(value as u128)
    }
}

impl From<u128> for AmountValue {
    fn from(value: u128) -> Self {
        AmountValue(value)
    }
}

impl FromStr for AmountValue {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u128>().map(AmountValue)
    }
}

impl Display for AmountValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AmountValue {
    /// `0x`-prefixed lowercase hex rendering, as used in EVM transaction fields.
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }
}

impl Serialize for AmountValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u128(self.0)
    }
}

impl<'de> Deserialize<'de> for AmountValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(AmountValue(n as u128)),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_amount_serializes_as_number() {
        let value = serde_json::to_value(AmountValue(1_000_000)).unwrap();
        assert_eq!(value, json!(1_000_000));
    }

    #[test]
    fn test_amount_accepts_number_or_string() {
        let a: AmountValue = serde_json::from_value(json!(42)).unwrap();
        let b: AmountValue = serde_json::from_value(json!("100000000000000000000")).unwrap();
        assert_eq!(a, AmountValue(42));
        assert_eq!(b, AmountValue(100_000_000_000_000_000_000));
    }

    #[test]
    fn test_amount_hex() {
        assert_eq!(AmountValue(255).to_hex(), "0xff");
        assert_eq!(AmountValue(0).to_hex(), "0x0");
    }
}
