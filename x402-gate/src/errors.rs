use http::StatusCode;
use serde::Serialize;
use x402_gate_core::{errors::NonceError, types::Chain};

use crate::offer::Challenge;

/// Represents an error response from the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub body: ErrorBody,
}

/// JSON body of a gate error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Challenge {
        error: &'static str,
        /// Boxed to keep the error small on the `Ok` path.
        #[serde(flatten)]
        challenge: Box<Challenge>,
    },
    Reason {
        error: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        chain: Option<Chain>,
    },
}

impl ErrorBody {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorBody::Challenge { error, .. } | ErrorBody::Reason { error, .. } => *error,
        }
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            ErrorBody::Challenge { challenge, .. } => Some(&**challenge),
            ErrorBody::Reason { .. } => None,
        }
    }
}

impl ErrorResponse {
    /// Payment needed to access the resource.
    pub fn payment_required(challenge: Challenge) -> Self {
        ErrorResponse {
            status: StatusCode::PAYMENT_REQUIRED,
            body: ErrorBody::Challenge {
                error: "payment_required",
                challenge: Box::new(challenge),
            },
        }
    }

    /// The proof was authentic but its nonce could not be consumed.
    pub fn nonce_rejected(err: NonceError) -> Self {
        ErrorResponse {
            status: StatusCode::PAYMENT_REQUIRED,
            body: ErrorBody::Reason {
                error: err.code(),
                chain: None,
            },
        }
    }

    pub fn receiver_not_configured(chain: Chain) -> Self {
        ErrorResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody::Reason {
                error: "receiver_not_configured",
                chain: Some(chain),
            },
        }
    }

    /// Generic server fault; carries no detail.
    pub fn internal_error() -> Self {
        ErrorResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody::Reason {
                error: "internal_error",
                chain: None,
            },
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, axum::extract::Json(self.body)).into_response()
    }
}
