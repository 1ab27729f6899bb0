/// Errors produced while parsing a proof header.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// No proof header was attached, or it was not a string value.
    #[error("Proof header is missing")]
    MissingHeader,

    /// The header did not split into four non-empty colon-delimited fields.
    #[error("Proof header must be `kind:account:nonce:signature`")]
    BadFormat,

    /// The scheme kind is not registered.
    #[error("Unsupported proof kind: {0}")]
    BadKind(String),

    /// The signature field is not valid standard base64.
    #[error("Base64 decode error: {0}")]
    BadEncoding(#[from] base64::DecodeError),
}

/// Errors produced when consuming a challenge nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NonceError {
    /// The nonce was never issued, or has already been collected.
    #[error("Nonce not found")]
    NotFound,

    /// The nonce outlived its TTL.
    #[error("Nonce expired")]
    Expired,

    /// The nonce has already been consumed.
    #[error("Nonce already used")]
    Replayed,
}

impl NonceError {
    /// Machine-readable reason code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            NonceError::NotFound => "nonce_not_found",
            NonceError::Expired => "nonce_expired",
            NonceError::Replayed => "nonce_replayed",
        }
    }
}
