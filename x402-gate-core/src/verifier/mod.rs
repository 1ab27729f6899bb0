//! Signature verification over the canonical challenge message.
//!
//! Each wallet scheme implements [`SchemeVerifier`] and is registered in a [`VerifierRegistry`]
//! under its [`ProofKind`]. The registry never fails outward: every decode or library error
//! comes back as a negative [`Verdict`] carrying a [`Rejection`].
//!
//! ```
//! use x402_gate_core::{types::ProofKind, verifier::VerifierRegistry};
//!
//! let registry = VerifierRegistry::default();
//! let verdict = registry.verify(ProofKind::Metamask, "0xabc", "nonce", &[0u8; 3]);
//!
//! assert!(!verdict.ok);
//! assert_eq!(verdict.rejection.unwrap().code(), "metamask_verify_error");
//! ```

mod evm;
mod svm;

pub use evm::RecoveringVerifier;
pub use svm::DetachedKeyVerifier;

use std::{collections::HashMap, fmt::Display, sync::Arc};

use crate::{
    proof::ProofHeader,
    types::{Chain, ProofKind},
};

/// Verifies one signature scheme.
pub trait SchemeVerifier: Send + Sync {
    /// Chain the scheme's accounts live on.
    fn chain(&self) -> Chain;

    /// Decide whether `account` signed `"x402-proof:" + nonce`.
    fn verify(&self, account: &str, nonce: &str, signature: &[u8]) -> Verdict;
}

/// Why a signature was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The account or signature could not be decoded, or the crypto library refused it.
    VerifyError { kind: ProofKind, detail: String },
    /// The signature is well-formed but was not produced by the claimed account.
    Mismatch { kind: ProofKind },
    /// No verifier is registered for the kind.
    UnknownKind { kind: ProofKind },
}

impl Rejection {
    pub fn verify_error(kind: ProofKind, detail: impl Display) -> Self {
        Rejection::VerifyError {
            kind,
            detail: detail.to_string(),
        }
    }

    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::VerifyError {
                kind: ProofKind::Phantom,
                ..
            } => "phantom_verify_error",
            Rejection::VerifyError {
                kind: ProofKind::Metamask,
                ..
            } => "metamask_verify_error",
            Rejection::Mismatch {
                kind: ProofKind::Phantom,
            } => "phantom_bad_signature",
            Rejection::Mismatch {
                kind: ProofKind::Metamask,
            } => "metamask_address_mismatch",
            Rejection::UnknownKind { .. } => "unknown_kind",
        }
    }
}

impl Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::VerifyError { detail, .. } => write!(f, "{}: {}", self.code(), detail),
            _ => f.write_str(self.code()),
        }
    }
}

/// Outcome of verifying a proof signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub ok: bool,
    /// Resolved signer identity, present on success.
    pub who: Option<String>,
    pub chain: Chain,
    /// Present when `ok` is false.
    pub rejection: Option<Rejection>,
}

impl Verdict {
    pub fn success(chain: Chain, who: impl Into<String>) -> Self {
        Verdict {
            ok: true,
            who: Some(who.into()),
            chain,
            rejection: None,
        }
    }

    pub fn rejected(chain: Chain, rejection: Rejection) -> Self {
        Verdict {
            ok: false,
            who: None,
            chain,
            rejection: Some(rejection),
        }
    }
}

/// Maps proof kinds to their verifiers.
///
/// `VerifierRegistry::default()` registers the built-in `phantom` and `metamask` schemes.
#[derive(Clone)]
pub struct VerifierRegistry {
    verifiers: HashMap<ProofKind, Arc<dyn SchemeVerifier>>,
}

impl VerifierRegistry {
    /// A registry with no schemes.
    pub fn empty() -> Self {
        VerifierRegistry {
            verifiers: HashMap::new(),
        }
    }

    /// Register `verifier` for `kind`, replacing any previous one.
    pub fn register(
        &mut self,
        kind: ProofKind,
        verifier: impl SchemeVerifier + 'static,
    ) -> &mut Self {
        self.verifiers.insert(kind, Arc::new(verifier));
        self
    }

    pub fn with(mut self, kind: ProofKind, verifier: impl SchemeVerifier + 'static) -> Self {
        self.register(kind, verifier);
        self
    }

    pub fn supports(&self, kind: ProofKind) -> bool {
        self.verifiers.contains_key(&kind)
    }

    /// Verify a signature with the scheme registered for `kind`.
    pub fn verify(
        &self,
        kind: ProofKind,
        account: &str,
        nonce: &str,
        signature: &[u8],
    ) -> Verdict {
        let verdict = match self.verifiers.get(&kind) {
            Some(verifier) => verifier.verify(account, nonce, signature),
            None => Verdict::rejected(kind.chain(), Rejection::UnknownKind { kind }),
        };

        #[cfg(feature = "tracing")]
        match &verdict.rejection {
            None => tracing::debug!(
                "Signature verified: kind='{}', who='{:?}'",
                kind,
                verdict.who
            ),
            Some(rejection) => {
                tracing::debug!("Signature rejected: kind='{}', reason='{}'", kind, rejection)
            }
        }

        verdict
    }

    /// Verify a parsed proof header.
    pub fn verify_proof(&self, proof: &ProofHeader) -> Verdict {
        self.verify(proof.kind, &proof.account, &proof.nonce, &proof.signature)
    }
}

impl Default for VerifierRegistry {
    fn default() -> Self {
        VerifierRegistry::empty()
            .with(ProofKind::Phantom, DetachedKeyVerifier)
            .with(ProofKind::Metamask, RecoveringVerifier)
    }
}

impl std::fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.verifiers.keys()).finish()
    }
}
