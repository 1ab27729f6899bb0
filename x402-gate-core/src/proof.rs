//! Compact proof header codec.
//!
//! A proof is a single header value with exactly four colon-delimited fields:
//!
//! ```text
//! <kind>:<account>:<nonce>:<base64-signature>
//! ```
//!
//! ```
//! use x402_gate_core::{proof::ProofHeader, types::ProofKind};
//!
//! let proof: ProofHeader = "phantom:4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T:abc:AQID"
//!     .parse()
//!     .unwrap();
//!
//! assert_eq!(proof.kind, ProofKind::Phantom);
//! assert_eq!(proof.nonce, "abc");
//! assert_eq!(proof.signature, vec![1, 2, 3]);
//! ```

use std::{fmt::Display, str::FromStr};

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{errors::ProofError, types::ProofKind};

/// Prefix of the canonical message signed by the payer.
pub const PROOF_MESSAGE_PREFIX: &str = "x402-proof:";

/// The canonical message a payer signs for `nonce`.
pub fn challenge_message(nonce: &str) -> String {
    format!("{PROOF_MESSAGE_PREFIX}{nonce}")
}

/// A parsed proof header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofHeader {
    pub kind: ProofKind,
    /// Claimed account, in the scheme's own encoding.
    pub account: String,
    /// The challenge nonce the signature covers.
    pub nonce: String,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

/// Parse a proof header value.
///
/// `None` stands for an absent header, or one that is not a valid string.
pub fn parse(header: Option<&str>) -> Result<ProofHeader, ProofError> {
    let header = header.ok_or(ProofError::MissingHeader)?;

    let fields: Vec<&str> = header.split(':').collect();
    let [kind, account, nonce, signature] = fields.as_slice() else {
        return Err(ProofError::BadFormat);
    };
    if [kind, account, nonce, signature]
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(ProofError::BadFormat);
    }

    let kind = kind.parse::<ProofKind>()?;
    let signature = STANDARD.decode(signature)?;

    Ok(ProofHeader {
        kind,
        account: account.to_string(),
        nonce: nonce.to_string(),
        signature,
    })
}

impl FromStr for ProofHeader {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(Some(s))
    }
}

impl Display for ProofHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.kind,
            self.account,
            self.nonce,
            STANDARD.encode(&self.signature)
        )
    }
}

impl ProofHeader {
    /// The canonical message this proof's signature is expected to cover.
    pub fn message(&self) -> String {
        challenge_message(&self.nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_header() {
        assert!(matches!(parse(None), Err(ProofError::MissingHeader)));
    }

    #[test]
    fn test_three_fields_is_bad_format() {
        let err = parse(Some("metamask:0xabc:nonce")).unwrap_err();
        assert!(matches!(err, ProofError::BadFormat), "got {err:?}");
    }

    #[test]
    fn test_five_fields_is_bad_format() {
        let err = parse(Some("metamask:0xabc:nonce:AQID:extra")).unwrap_err();
        assert!(matches!(err, ProofError::BadFormat), "got {err:?}");
    }

    #[test]
    fn test_empty_field_is_bad_format() {
        let err = parse(Some("phantom::nonce:AQID")).unwrap_err();
        assert!(matches!(err, ProofError::BadFormat), "got {err:?}");
    }

    #[test]
    fn test_unknown_kind() {
        let err = parse(Some("ledger:acct:nonce:AQID")).unwrap_err();
        assert!(matches!(err, ProofError::BadKind(k) if k == "ledger"));
    }

    #[test]
    fn test_bad_base64() {
        let err = parse(Some("phantom:acct:nonce:***")).unwrap_err();
        assert!(matches!(err, ProofError::BadEncoding(_)), "got {err:?}");
    }

    #[test]
    fn test_header_round_trip() {
        let original = ProofHeader {
            kind: ProofKind::Metamask,
            account: "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20".to_string(),
            nonce: "6f1c1d3e0a2b4c5d8e9f00112233aabb".to_string(),
            signature: (0u8..65).collect(),
        };

        let parsed: ProofHeader = original.to_string().parse().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_challenge_message() {
        assert_eq!(challenge_message("abc"), "x402-proof:abc");
    }
}
