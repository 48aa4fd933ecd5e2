//! Error types for chain access and chain configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors returned by chain clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The chain could not be reached; the call may be retried unchanged.
    #[error("transient failure on {chain}: {reason}")]
    Transient { chain: String, reason: String },

    /// The call did not complete in time; treated as transient.
    #[error("call to {chain} timed out after {after:?}")]
    Timeout { chain: String, after: Duration },

    /// The contract rejected the call.
    #[error("{chain} reverted: {reason}")]
    Reverted { chain: String, reason: String },

    /// No transaction is recorded at this nonce.
    #[error("{chain} has no transaction at nonce {nonce}")]
    TransactionNotFound { chain: String, nonce: u128 },

    /// The chain answered with a value of the wrong shape.
    #[error("{chain} returned an unexpected response to {method}")]
    UnexpectedResponse { chain: String, method: &'static str },
}

impl ChainError {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    /// Name of the chain the error came from.
    pub fn chain(&self) -> &str {
        match self {
            Self::Transient { chain, .. }
            | Self::Timeout { chain, .. }
            | Self::Reverted { chain, .. }
            | Self::TransactionNotFound { chain, .. }
            | Self::UnexpectedResponse { chain, .. } => chain,
        }
    }
}

/// Result type for chain calls.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Errors loading or querying chain configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No chain is configured under this name.
    #[error("chain not configured: {0}")]
    ChainNotFound(String),

    /// Two descriptors share a name.
    #[error("chain configured twice: {0}")]
    DuplicateChain(String),

    /// The file extension is neither `.toml` nor `.json`.
    #[error("unsupported config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
