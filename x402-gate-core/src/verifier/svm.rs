use std::str::FromStr;

use crate::{
    networks::svm::{SvmAddress, SvmVerifyError},
    proof::challenge_message,
    types::{Chain, ProofKind},
    verifier::{Rejection, SchemeVerifier, Verdict},
};

/// Ed25519 detached-signature scheme used by Solana wallets.
///
/// The account is the base58 public key itself, so the resolved signer is the claimed account.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedKeyVerifier;

impl SchemeVerifier for DetachedKeyVerifier {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    fn verify(&self, account: &str, nonce: &str, signature: &[u8]) -> Verdict {
        let address = match SvmAddress::from_str(account) {
            Ok(address) => address,
            Err(err) => {
                return Verdict::rejected(
                    self.chain(),
                    Rejection::verify_error(ProofKind::Phantom, err),
                );
            }
        };

        let message = challenge_message(nonce);
        match address.verify_detached(message.as_bytes(), signature) {
            Ok(()) => Verdict::success(self.chain(), account),
            Err(SvmVerifyError::Mismatch(_)) => Verdict::rejected(
                self.chain(),
                Rejection::Mismatch {
                    kind: ProofKind::Phantom,
                },
            ),
            Err(err) => Verdict::rejected(
                self.chain(),
                Rejection::verify_error(ProofKind::Phantom, err),
            ),
        }
    }
}
