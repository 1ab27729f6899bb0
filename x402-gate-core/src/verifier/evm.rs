use std::str::FromStr;

use crate::{
    networks::evm::EvmSignature,
    proof::challenge_message,
    types::{Chain, ProofKind},
    verifier::{Rejection, SchemeVerifier, Verdict},
};

/// secp256k1 personal-sign scheme used by EVM wallets.
///
/// The signer address is recovered from the signature over the EIP-191 personal message hash
/// and compared with the claimed `0x` address without regard to letter case.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveringVerifier;

impl SchemeVerifier for RecoveringVerifier {
    fn chain(&self) -> Chain {
        Chain::Evm
    }

    fn verify(&self, account: &str, nonce: &str, signature: &[u8]) -> Verdict {
        let rejected = |rejection| Verdict::rejected(Chain::Evm, rejection);

        let signature = match EvmSignature::from_str(&format!("0x{}", hex::encode(signature))) {
            Ok(signature) => signature,
            Err(err) => return rejected(Rejection::verify_error(ProofKind::Metamask, err)),
        };

        let message = challenge_message(nonce);
        let recovered = match signature.recover_personal_signer(message.as_bytes()) {
            Ok(recovered) => recovered,
            Err(err) => return rejected(Rejection::verify_error(ProofKind::Metamask, err)),
        };

        if recovered.matches_ignore_case(account) {
            Verdict::success(Chain::Evm, recovered.to_string())
        } else {
            rejected(Rejection::Mismatch {
                kind: ProofKind::Metamask,
            })
        }
    }
}
