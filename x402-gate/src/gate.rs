//! Request-level payment decision.
//!
//! For details, see the [`PaymentGate`] struct documentation.

use std::{fmt::Display, sync::Arc};

use bon::Builder;
use http::{HeaderMap, Request};
use serde::Serialize;
use x402_gate_core::{
    errors::NonceError,
    ledger::NonceLedger,
    proof,
    types::{Chain, ProofKind},
    verifier::VerifierRegistry,
};

use crate::{
    errors::ErrorResponse,
    offer::{Challenge, Offers},
};

/// Request header carrying the payment proof.
pub const PROOF_HEADER: &str = "x-payment-proof";

/// Query parameter naming the chain the caller wants to pay on.
pub const CHAIN_QUERY_PARAM: &str = "chain";

/// Where a request ended up in the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NoProof,
    ProofMalformed,
    ProofInvalidSignature,
    NonceInvalid,
    Granted,
}

/// The parts of an HTTP request the gate looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateRequest<'a> {
    /// Raw proof header value.
    pub proof: Option<&'a str>,
    /// Chain explicitly requested by the caller.
    pub chain: Option<Chain>,
}

impl<'a> GateRequest<'a> {
    /// Read the proof header. A value that is not visible ASCII counts as absent.
    pub fn from_headers(headers: &'a HeaderMap, chain: Option<Chain>) -> Self {
        GateRequest {
            proof: headers.get(PROOF_HEADER).and_then(|v| v.to_str().ok()),
            chain,
        }
    }

    /// Read the proof header, and the requested chain from a raw query string.
    pub fn from_parts(headers: &'a HeaderMap, query: Option<&str>) -> Self {
        GateRequest::from_headers(headers, requested_chain(query))
    }

    /// Read the proof header and the `chain` query parameter.
    pub fn from_request<B>(request: &'a Request<B>) -> Self {
        GateRequest::from_parts(request.headers(), request.uri().query())
    }
}

/// Chain named by the `chain` parameter of a url-encoded query string.
///
/// The first recognized value wins. Anything else is skipped rather than rejected.
pub fn requested_chain(query: Option<&str>) -> Option<Chain> {
    url::form_urlencoded::parse(query?.as_bytes()).find_map(|(key, value)| {
        if key == CHAIN_QUERY_PARAM {
            value.parse().ok()
        } else {
            None
        }
    })
}

/// An accepted payment proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Verified payer identity.
    pub who: String,
    pub chain: Chain,
}

/// Decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Pay first. A fresh nonce has been issued.
    Challenge {
        state: GateState,
        challenge: Challenge,
    },
    /// The proof was authentic but its nonce was not usable.
    Rejected(NonceError),
    Granted(Grant),
}

impl Outcome {
    pub fn state(&self) -> GateState {
        match self {
            Outcome::Challenge { state, .. } => *state,
            Outcome::Rejected(_) => GateState::NonceInvalid,
            Outcome::Granted(_) => GateState::Granted,
        }
    }
}

/// Body of a successful unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantResponse<T> {
    pub unlocked: bool,
    pub who: String,
    pub chain: Chain,
    pub payload: T,
}

#[cfg(feature = "axum")]
impl<T: Serialize> axum::response::IntoResponse for GrantResponse<T> {
    fn into_response(self) -> axum::response::Response {
        axum::extract::Json(self).into_response()
    }
}

/// A pay-per-request gate backed by a nonce ledger.
///
/// Each request goes through these steps:
///
/// 1. Without a proof header, a nonce is issued and a challenge is returned for the selected chain
///    (see [`Offers::select`]).
/// 2. A header that does not parse gets the same generic challenge.
/// 3. The signature is verified with the registered scheme. A bad signature gets a new challenge
///    on the chain of the attempted scheme.
/// 4. Only then is the nonce consumed. A ledger failure is rejected with its reason and no new
///    nonce is issued.
/// 5. Otherwise the request is granted.
///
/// Invalid proofs therefore never burn a nonce.
///
/// ```
/// use std::sync::Arc;
///
/// use x402_gate::{
///     gate::{GateRequest, GateState, PaymentGate},
///     offer::{ChainOffer, Offers},
/// };
/// use x402_gate_core::ledger::MemoryLedger;
///
/// let gate = PaymentGate::builder()
///     .ledger(Arc::new(MemoryLedger::default()))
///     .offers(
///         Offers::builder()
///             .solana(
///                 ChainOffer::builder()
///                     .receiver("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin")
///                     .price(1_000_000u64)
///                     .build(),
///             )
///             .evm(ChainOffer::builder().price(1u64).build())
///             .build(),
///     )
///     .build();
///
/// let outcome = gate.decide(GateRequest::default()).unwrap();
/// assert_eq!(outcome.state(), GateState::NoProof);
/// ```
#[derive(Builder, Debug)]
pub struct PaymentGate<L: NonceLedger> {
    pub ledger: Arc<L>,
    /// Signature schemes accepted in proofs.
    #[builder(default)]
    pub verifiers: VerifierRegistry,
    pub offers: Offers,
}

impl<L: NonceLedger> Clone for PaymentGate<L> {
    fn clone(&self) -> Self {
        PaymentGate {
            ledger: Arc::clone(&self.ledger),
            verifiers: self.verifiers.clone(),
            offers: self.offers.clone(),
        }
    }
}

impl<L: NonceLedger> PaymentGate<L> {
    /// Decide what to do with a request.
    ///
    /// The only error is a server-side fault: the selected chain has no receiver.
    pub fn decide(&self, request: GateRequest<'_>) -> Result<Outcome, ErrorResponse> {
        let Some(raw) = request.proof else {
            return self.challenge(GateState::NoProof, self.offers.select(request.chain));
        };

        let proof = match proof::parse(Some(raw)) {
            Ok(proof) => proof,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Malformed payment proof: {}", _err);

                let chain = request.chain.or_else(|| {
                    ProofKind::from_header_prefix(raw)
                        .map(|kind| kind.chain())
                        .filter(|chain| self.offers.is_configured(*chain))
                });
                return self.challenge(GateState::ProofMalformed, self.offers.select(chain));
            }
        };

        let verdict = self.verifiers.verify_proof(&proof);
        if !verdict.ok {
            return self.challenge(GateState::ProofInvalidSignature, proof.kind.chain());
        }

        if let Err(err) = self.ledger.consume_if_valid(&proof.nonce) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Nonce rejected: kind='{}', reason='{}'", proof.kind, err);

            return Ok(Outcome::Rejected(err));
        }

        let grant = Grant {
            who: verdict.who.unwrap_or(proof.account),
            chain: verdict.chain,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Payment proof accepted: who='{}', chain='{}'", grant.who, grant.chain);

        Ok(Outcome::Granted(grant))
    }

    /// Standard gate flow.
    ///
    /// Runs [`decide`](PaymentGate::decide) and, on a grant, builds the protected payload with
    /// `payload`. A failing payload is reported as a generic internal error.
    pub async fn handle<Fun, Fut, T, E>(
        &self,
        request: GateRequest<'_>,
        payload: Fun,
    ) -> Result<GrantResponse<T>, ErrorResponse>
    where
        Fun: FnOnce(Grant) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let grant = match self.decide(request)? {
            Outcome::Challenge { challenge, .. } => {
                return Err(ErrorResponse::payment_required(challenge));
            }
            Outcome::Rejected(err) => return Err(ErrorResponse::nonce_rejected(err)),
            Outcome::Granted(grant) => grant,
        };

        let Grant { who, chain } = grant.clone();
        let payload = payload(grant).await.map_err(|_err| {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to build protected payload: {}", _err);

            ErrorResponse::internal_error()
        })?;

        Ok(GrantResponse {
            unlocked: true,
            who,
            chain,
            payload,
        })
    }

    fn challenge(&self, state: GateState, chain: Chain) -> Result<Outcome, ErrorResponse> {
        let offer = self.offers.get(chain);
        let Some(receiver) = offer.receiver.as_deref() else {
            #[cfg(feature = "tracing")]
            tracing::warn!("No receiver configured for chain '{}'", chain);

            return Err(ErrorResponse::receiver_not_configured(chain));
        };

        let nonce = self.ledger.issue();
        let ttl = self.ledger.ttl().as_secs();

        #[cfg(feature = "tracing")]
        tracing::info!("Issued payment challenge: chain='{}', state={:?}", chain, state);

        Ok(Outcome::Challenge {
            state,
            challenge: Challenge::new(chain, receiver, offer.price, ttl, nonce.token),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{convert::Infallible, time::Duration};

    use alloy::signers::{SignerSync, local::PrivateKeySigner};
    use base64::{Engine, prelude::BASE64_STANDARD};
    use ed25519_dalek::{Signer, SigningKey};
    use http::StatusCode;
    use solana_pubkey::Pubkey;
    use x402_gate_core::{
        ledger::{LedgerConfig, MemoryLedger},
        proof::challenge_message,
    };

    use super::*;
    use crate::offer::ChainOffer;

    const SOLANA_RECEIVER: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
    const EVM_RECEIVER: &str = "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20";

    fn offers(solana: bool, evm: bool) -> Offers {
        Offers::builder()
            .solana(
                ChainOffer::builder()
                    .maybe_receiver(solana.then_some(SOLANA_RECEIVER))
                    .price(1_000_000u64)
                    .build(),
            )
            .evm(
                ChainOffer::builder()
                    .maybe_receiver(evm.then_some(EVM_RECEIVER))
                    .price(100_000_000_000_000u64)
                    .build(),
            )
            .build()
    }

    fn gate_with(ledger: MemoryLedger, offers: Offers) -> PaymentGate<MemoryLedger> {
        PaymentGate::builder()
            .ledger(Arc::new(ledger))
            .offers(offers)
            .build()
    }

    fn gate() -> PaymentGate<MemoryLedger> {
        gate_with(MemoryLedger::default(), offers(true, true))
    }

    fn issue_nonce(gate: &PaymentGate<MemoryLedger>, chain: Chain) -> String {
        let request = GateRequest {
            proof: None,
            chain: Some(chain),
        };
        match gate.decide(request).unwrap() {
            Outcome::Challenge { challenge, .. } => challenge.nonce,
            other => panic!("Expected a challenge, got {other:?}"),
        }
    }

    fn phantom_proof(key: &SigningKey, nonce: &str) -> (String, String) {
        let account = Pubkey::new_from_array(key.verifying_key().to_bytes()).to_string();
        let signature = key.sign(challenge_message(nonce).as_bytes());
        let header = format!(
            "phantom:{account}:{nonce}:{}",
            BASE64_STANDARD.encode(signature.to_bytes())
        );
        (account, header)
    }

    fn metamask_proof(signer: &PrivateKeySigner, account: &str, nonce: &str) -> String {
        let signature = signer
            .sign_message_sync(challenge_message(nonce).as_bytes())
            .unwrap();
        format!(
            "metamask:{account}:{nonce}:{}",
            BASE64_STANDARD.encode(signature.as_bytes())
        )
    }

    fn with_proof(header: &str) -> GateRequest<'_> {
        GateRequest {
            proof: Some(header),
            chain: None,
        }
    }

    #[test]
    fn test_no_proof_challenges_preferred_chain() {
        let gate = gate();

        let outcome = gate.decide(GateRequest::default()).unwrap();

        let Outcome::Challenge { state, challenge } = outcome else {
            panic!("Expected a challenge");
        };
        assert_eq!(state, GateState::NoProof);
        assert_eq!(challenge.chain, Chain::Solana);
        assert_eq!(challenge.receiver, SOLANA_RECEIVER);
        assert_eq!(challenge.ttl, 300);
        assert_eq!(challenge.message, format!("x402-proof:{}", challenge.nonce));
        assert_eq!(gate.ledger.len(), 1, "The nonce should be tracked");
    }

    #[test]
    fn test_no_proof_honors_requested_chain() {
        let gate = gate();
        let request = GateRequest {
            proof: None,
            chain: Some(Chain::Evm),
        };

        let Outcome::Challenge { challenge, .. } = gate.decide(request).unwrap() else {
            panic!("Expected a challenge");
        };
        assert_eq!(challenge.chain, Chain::Evm);
        assert_eq!(challenge.receiver, EVM_RECEIVER);
    }

    #[test]
    fn test_no_proof_falls_back_to_configured_chain() {
        let gate = gate_with(MemoryLedger::default(), offers(false, true));

        let Outcome::Challenge { challenge, .. } = gate.decide(GateRequest::default()).unwrap()
        else {
            panic!("Expected a challenge");
        };
        assert_eq!(challenge.chain, Chain::Evm);
    }

    #[test]
    fn test_missing_receiver_is_server_fault() {
        let gate = gate_with(MemoryLedger::default(), offers(false, false));

        let err = gate.decide(GateRequest::default()).unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.code(), "receiver_not_configured");
        assert!(gate.ledger.is_empty(), "No nonce should be issued");
    }

    #[test]
    fn test_three_fields_is_challenged() {
        let gate = gate();

        let outcome = gate.decide(with_proof("metamask:0xabc:nonce")).unwrap();

        let Outcome::Challenge { state, challenge } = outcome else {
            panic!("Expected a challenge");
        };
        assert_eq!(state, GateState::ProofMalformed);
        assert_eq!(challenge.chain, Chain::Evm, "Kind prefix selects the chain");
    }

    #[test]
    fn test_malformed_keeps_requested_chain() {
        let gate = gate();
        let request = GateRequest {
            proof: Some("garbage"),
            chain: Some(Chain::Evm),
        };

        assert_eq!(gate.decide(request).unwrap().state(), GateState::ProofMalformed);
        let Outcome::Challenge { challenge, .. } = gate.decide(request).unwrap() else {
            panic!("Expected a challenge");
        };
        assert_eq!(challenge.chain, Chain::Evm);
    }

    #[test]
    fn test_malformed_prefix_for_unconfigured_chain() {
        let gate = gate_with(MemoryLedger::default(), offers(true, false));

        let Outcome::Challenge { state, challenge } =
            gate.decide(with_proof("metamask:0xabc:nonce")).unwrap()
        else {
            panic!("Expected a challenge");
        };
        assert_eq!(state, GateState::ProofMalformed);
        assert_eq!(challenge.chain, Chain::Solana, "Fall back to a configured chain");
    }

    #[test]
    fn test_phantom_grant_then_replay() {
        let gate = gate();
        let key = SigningKey::from_bytes(&[7; 32]);
        let nonce = issue_nonce(&gate, Chain::Solana);
        let (account, header) = phantom_proof(&key, &nonce);

        let outcome = gate.decide(with_proof(&header)).unwrap();
        assert_eq!(
            outcome,
            Outcome::Granted(Grant {
                who: account,
                chain: Chain::Solana
            })
        );

        let replay = gate.decide(with_proof(&header)).unwrap();
        assert_eq!(replay, Outcome::Rejected(NonceError::Replayed));
        assert_eq!(gate.ledger.len(), 1, "A rejection must not issue a nonce");
    }

    #[test]
    fn test_bad_signature_does_not_burn_nonce() {
        let gate = gate();
        let signer = PrivateKeySigner::random();
        let account = signer.address().to_checksum(None);
        let nonce = issue_nonce(&gate, Chain::Solana);

        let forged = metamask_proof(&PrivateKeySigner::random(), &account, &nonce);
        let Outcome::Challenge { state, challenge } = gate.decide(with_proof(&forged)).unwrap()
        else {
            panic!("Expected a challenge");
        };
        assert_eq!(state, GateState::ProofInvalidSignature);
        assert_eq!(challenge.chain, Chain::Evm, "Challenge the attempted scheme");

        let genuine = metamask_proof(&signer, &account, &nonce);
        assert_eq!(
            gate.decide(with_proof(&genuine)).unwrap().state(),
            GateState::Granted
        );
    }

    #[test]
    fn test_metamask_account_case_is_ignored() {
        let gate = gate();
        let signer = PrivateKeySigner::random();
        let checksummed = signer.address().to_checksum(None);
        let nonce = issue_nonce(&gate, Chain::Evm);

        let header = metamask_proof(&signer, &checksummed.to_ascii_lowercase(), &nonce);

        assert_eq!(
            gate.decide(with_proof(&header)).unwrap(),
            Outcome::Granted(Grant {
                who: checksummed,
                chain: Chain::Evm
            })
        );
    }

    #[test]
    fn test_unknown_nonce_rejected() {
        let gate = gate();
        let key = SigningKey::from_bytes(&[9; 32]);
        let (_, header) = phantom_proof(&key, "never-issued");

        assert_eq!(
            gate.decide(with_proof(&header)).unwrap(),
            Outcome::Rejected(NonceError::NotFound)
        );
        assert!(gate.ledger.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_nonce_rejected() {
        let config = LedgerConfig::builder().ttl(Duration::from_secs(1)).build();
        let gate = gate_with(MemoryLedger::new(config), offers(true, true));
        let key = SigningKey::from_bytes(&[3; 32]);
        let nonce = issue_nonce(&gate, Chain::Solana);

        tokio::time::advance(Duration::from_secs(2)).await;

        let (_, header) = phantom_proof(&key, &nonce);
        let outcome = gate.decide(with_proof(&header)).unwrap();
        assert_eq!(outcome, Outcome::Rejected(NonceError::Expired));
        assert_eq!(outcome.state(), GateState::NonceInvalid);
    }

    #[tokio::test]
    async fn test_handle_builds_payload() {
        let gate = gate();
        let key = SigningKey::from_bytes(&[5; 32]);
        let nonce = issue_nonce(&gate, Chain::Solana);
        let (account, header) = phantom_proof(&key, &nonce);

        let response = gate
            .handle(with_proof(&header), |grant| async move {
                Ok::<_, Infallible>(format!("hello {}", grant.who))
            })
            .await
            .unwrap();

        assert!(response.unlocked);
        assert_eq!(response.chain, Chain::Solana);
        assert_eq!(response.payload, format!("hello {account}"));
        assert_eq!(response.who, account);
    }

    #[tokio::test]
    async fn test_handle_maps_errors() {
        let gate = gate();

        let challenge = gate
            .handle(GateRequest::default(), |_| async { Ok::<_, Infallible>(()) })
            .await
            .unwrap_err();
        assert_eq!(challenge.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(challenge.body.code(), "payment_required");
        let nonce = challenge.body.challenge().unwrap().nonce.clone();

        let key = SigningKey::from_bytes(&[6; 32]);
        let (_, header) = phantom_proof(&key, &nonce);
        let failed = gate
            .handle(with_proof(&header), |_| async { Err::<(), _>("database down") })
            .await
            .unwrap_err();
        assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.body.code(), "internal_error");

        let replayed = gate
            .handle(with_proof(&header), |_| async { Ok::<_, Infallible>(()) })
            .await
            .unwrap_err();
        assert_eq!(replayed.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(replayed.body.code(), "nonce_replayed");
    }

    #[test]
    fn test_request_from_http() {
        let request = Request::builder()
            .uri("/api/protected?foo=1&chain=evm")
            .header(PROOF_HEADER, "phantom:a:b:c")
            .body(())
            .unwrap();

        assert_eq!(
            GateRequest::from_request(&request),
            GateRequest {
                proof: Some("phantom:a:b:c"),
                chain: Some(Chain::Evm),
            }
        );

        let plain = Request::builder()
            .uri("/api/protected?chain=dogecoin")
            .body(())
            .unwrap();
        assert_eq!(GateRequest::from_request(&plain), GateRequest::default());
    }

    #[test]
    fn test_requested_chain_is_lenient() {
        assert_eq!(requested_chain(None), None);
        assert_eq!(requested_chain(Some("")), None);
        assert_eq!(requested_chain(Some("chain=evm")), Some(Chain::Evm));
        assert_eq!(requested_chain(Some("chain=evm&chain=solana")), Some(Chain::Evm));
        assert_eq!(requested_chain(Some("chain=doge&chain=solana")), Some(Chain::Solana));
        assert_eq!(requested_chain(Some("ch%61in=%65vm")), Some(Chain::Evm));
        assert_eq!(requested_chain(Some("chain=%ZZ&&=")), None);
    }
}
