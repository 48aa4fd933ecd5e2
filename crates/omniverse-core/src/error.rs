//! Error types for the omniverse core.

use thiserror::Error;

use crate::types::PublicKey;

/// Core errors that can occur while building, encoding or signing transactions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A field does not fit its fixed width in the canonical layout.
    ///
    /// Raised for integers needing more bytes than the field holds and for
    /// address fields whose length is not exactly the field width.
    #[error("encoding overflow: {field} must fit {width} bytes, got {actual}")]
    EncodingOverflow {
        field: &'static str,
        width: usize,
        actual: usize,
    },

    #[error("unknown opcode: {0}")]
    UnknownOpCode(u8),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("signing failed")]
    SigningFailed,

    #[error("sender mismatch: envelope names {expected}, key belongs to {actual}")]
    SenderMismatch {
        expected: PublicKey,
        actual: PublicKey,
    },

    #[error("transaction has no operation")]
    MissingOperation,

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Validation errors for signed transactions.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("signature verification failed")]
    SignatureFailed,

    #[error("signature recovers to {recovered}, expected sender {expected}")]
    SignatureMismatch {
        expected: PublicKey,
        recovered: PublicKey,
    },

    #[error("transaction cannot be encoded: {0}")]
    Unencodable(String),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureFailed
            }
            other => ValidationError::Unencodable(other.to_string()),
        }
    }
}
