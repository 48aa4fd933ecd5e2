//! Error types for the keyring.

use omniverse_core::CoreError;
use thiserror::Error;

/// Errors that can occur loading, switching or persisting a keyring.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// Key index is not within the keyring.
    #[error("key index {index} out of range (keyring holds {len} keys)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The keyring contents are unusable.
    #[error("invalid keyring: {0}")]
    InvalidKeyring(String),

    /// A stored key could not be parsed.
    #[error("invalid key at position {position}: {source}")]
    InvalidKey {
        position: usize,
        #[source]
        source: CoreError,
    },

    /// Signing with the active key failed.
    #[error("signing failed: {0}")]
    Signing(#[source] CoreError),

    /// Keyring file could not be parsed or written.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for keyring operations.
pub type Result<T> = std::result::Result<T, KeyringError>;
