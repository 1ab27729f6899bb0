//! What the gate asks for: per-chain receivers and prices, and the challenge built from them.

use bon::Builder;
use serde::Serialize;
use x402_gate_core::{
    networks::svm::SYSTEM_PROGRAM_ID,
    proof::challenge_message,
    types::{AmountValue, Chain},
};

/// Default Solana price: 0.001 SOL.
pub const DEFAULT_SOLANA_PRICE_LAMPORTS: u64 = 1_000_000;

/// Default EVM price: 0.0001 ETH.
pub const DEFAULT_EVM_PRICE_WEI: u64 = 100_000_000_000_000;

/// Receiving account and price on one chain.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct ChainOffer {
    /// Account payments are sent to. `None` means the chain is not accepted.
    #[builder(into)]
    pub receiver: Option<String>,
    /// Price in the chain's smallest unit.
    #[builder(into)]
    pub price: AmountValue,
}

/// Offers for every supported chain.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct Offers {
    pub solana: ChainOffer,
    pub evm: ChainOffer,
    /// Chain challenged when the caller did not ask for one and both are configured.
    #[builder(default = Chain::Solana)]
    pub preferred: Chain,
}

impl Default for Offers {
    fn default() -> Self {
        Offers {
            solana: ChainOffer {
                receiver: None,
                price: DEFAULT_SOLANA_PRICE_LAMPORTS.into(),
            },
            evm: ChainOffer {
                receiver: None,
                price: DEFAULT_EVM_PRICE_WEI.into(),
            },
            preferred: Chain::Solana,
        }
    }
}

impl Offers {
    pub fn get(&self, chain: Chain) -> &ChainOffer {
        match chain {
            Chain::Solana => &self.solana,
            Chain::Evm => &self.evm,
        }
    }

    pub fn is_configured(&self, chain: Chain) -> bool {
        self.get(chain).receiver.is_some()
    }

    /// Chain to challenge on.
    ///
    /// An explicit request wins. Otherwise the preferred chain if it has a receiver, then the
    /// other chain if it has one. With neither configured the preferred chain is returned and
    /// challenging it fails as a server fault.
    pub fn select(&self, requested: Option<Chain>) -> Chain {
        requested.unwrap_or_else(|| {
            let preferred = self.preferred;
            if !self.is_configured(preferred) && self.is_configured(preferred.other()) {
                preferred.other()
            } else {
                preferred
            }
        })
    }
}

/// Prebuilt transfer the caller's wallet can submit to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TransactionHint {
    /// System program transfer on Solana.
    #[serde(rename = "solana_transfer", rename_all = "camelCase")]
    SolanaTransfer {
        program_id: String,
        to: String,
        lamports: AmountValue,
    },
    /// Native value transfer on an EVM chain; `value` is `0x` hex wei.
    #[serde(rename = "evm_transfer")]
    EvmTransfer { to: String, value: String },
}

impl TransactionHint {
    pub fn transfer(chain: Chain, to: &str, amount: AmountValue) -> Self {
        match chain {
            Chain::Solana => TransactionHint::SolanaTransfer {
                program_id: SYSTEM_PROGRAM_ID.to_string(),
                to: to.to_string(),
                lamports: amount,
            },
            Chain::Evm => TransactionHint::EvmTransfer {
                to: to.to_string(),
                value: amount.to_hex(),
            },
        }
    }
}

/// Body of a `402 Payment Required` challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Challenge {
    pub chain: Chain,
    pub receiver: String,
    pub amount: AmountValue,
    /// Seconds the nonce stays valid.
    pub ttl: u64,
    pub nonce: String,
    /// Exact message the caller must sign.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<TransactionHint>,
}

impl Challenge {
    pub fn new(chain: Chain, receiver: &str, amount: AmountValue, ttl: u64, nonce: String) -> Self {
        Challenge {
            chain,
            receiver: receiver.to_string(),
            amount,
            ttl,
            message: challenge_message(&nonce),
            nonce,
            tx: Some(TransactionHint::transfer(chain, receiver, amount)),
        }
    }
}
