//! Error types for the relay.

use omniverse_chain::{ChainError, ConfigError};
use omniverse_core::{CoreError, PublicKey};
use omniverse_keyring::KeyringError;
use omniverse_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No chain is configured under this name.
    #[error("chain not configured: {0}")]
    ConfigNotFound(String),

    /// An operation field does not fit the canonical layout.
    #[error("encoding overflow: {field} must fit {width} bytes, got {actual}")]
    EncodingOverflow {
        field: &'static str,
        width: usize,
        actual: usize,
    },

    /// The chain could not be reached or did not answer in time.
    #[error("network failure on {chain}{}: {source}", nonce_suffix(.nonce))]
    TransientNetworkFailure {
        chain: String,
        nonce: Option<u128>,
        source: ChainError,
    },

    /// The chain rejected a transaction or admin call.
    #[error("{chain} rejected {operation} from {account}{}: {reason}", nonce_suffix(.nonce))]
    SubmissionRejected {
        chain: String,
        account: PublicKey,
        operation: &'static str,
        nonce: Option<u128>,
        reason: String,
    },

    /// Key index is not within the keyring.
    #[error("key index {index} out of range (keyring holds {len} keys)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Keyring load or persist failed.
    #[error("keyring error: {0}")]
    Keyring(KeyringError),

    /// A sync run ended early.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Envelope construction or signing failed.
    #[error("core error: {0}")]
    Core(CoreError),

    /// Chain configuration could not be loaded.
    #[error("config error: {0}")]
    Config(ConfigError),

    /// A read failed permanently.
    #[error("chain error: {0}")]
    Chain(ChainError),
}

fn nonce_suffix(nonce: &Option<u128>) -> String {
    nonce.map(|n| format!(" at nonce {n}")).unwrap_or_default()
}

impl RelayError {
    /// Whether the same call may succeed if retried unchanged.
    ///
    /// A rejected submission is not retryable as is: the nonce must be read
    /// again first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientNetworkFailure { .. } => true,
            Self::Sync(e) => e.is_retryable(),
            Self::Chain(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<CoreError> for RelayError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EncodingOverflow {
                field,
                width,
                actual,
            } => Self::EncodingOverflow {
                field,
                width,
                actual,
            },
            other => Self::Core(other),
        }
    }
}

impl From<KeyringError> for RelayError {
    fn from(err: KeyringError) -> Self {
        match err {
            KeyringError::IndexOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
            other => Self::Keyring(other),
        }
    }
}

impl From<ConfigError> for RelayError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ChainNotFound(name) => Self::ConfigNotFound(name),
            other => Self::Config(other),
        }
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
