//! Error types for the sync module.

use omniverse_chain::ChainError;
use omniverse_core::PublicKey;
use thiserror::Error;

/// Errors that can occur during a sync run.
///
/// Every variant raised after relaying began carries the nonces the
/// destination already accepted, so a caller can report partial progress.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The destination did not accept a transaction; the run stopped there.
    #[error("sync for {account} halted at nonce {nonce} on {chain} after relaying {} transactions: {source}", .relayed.len())]
    Halted {
        account: PublicKey,
        chain: String,
        nonce: u128,
        relayed: Vec<u128>,
        source: ChainError,
    },

    /// Reading a transaction from the source failed mid-run.
    #[error("sync for {account} could not fetch nonce {nonce} from {chain} after relaying {} transactions: {source}", .relayed.len())]
    FetchFailed {
        account: PublicKey,
        chain: String,
        nonce: u128,
        relayed: Vec<u128>,
        source: ChainError,
    },

    /// The run was cancelled between submissions.
    #[error("sync for {account} cancelled before nonce {next_nonce}")]
    Cancelled {
        account: PublicKey,
        next_nonce: u128,
        relayed: Vec<u128>,
    },

    /// A transaction read from the source failed verification.
    #[error("invalid transaction at nonce {nonce} on {chain}: {reason}")]
    InvalidTransaction {
        chain: String,
        nonce: u128,
        reason: String,
        relayed: Vec<u128>,
    },

    /// Reading the starting nonces failed.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
}

impl SyncError {
    /// Whether running the sync again could make progress.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Halted { source, .. } | Self::FetchFailed { source, .. } => source.is_transient(),
            Self::Chain(e) => e.is_transient(),
            Self::Cancelled { .. } => true,
            Self::InvalidTransaction { .. } => false,
        }
    }

    /// Nonces accepted by the destination before the run ended.
    pub fn relayed(&self) -> &[u128] {
        match self {
            Self::Halted { relayed, .. }
            | Self::FetchFailed { relayed, .. }
            | Self::Cancelled { relayed, .. }
            | Self::InvalidTransaction { relayed, .. } => relayed,
            Self::Chain(_) => &[],
        }
    }

    /// The nonce the next run will resume from, when known.
    pub fn resume_nonce(&self) -> Option<u128> {
        match self {
            Self::Halted { nonce, .. }
            | Self::FetchFailed { nonce, .. }
            | Self::InvalidTransaction { nonce, .. } => Some(*nonce),
            Self::Cancelled { next_nonce, .. } => Some(*next_nonce),
            Self::Chain(_) => None,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use omniverse_core::SecretKey;

    fn account() -> PublicKey {
        SecretKey::from_bytes(&[0x42; 32]).unwrap().public_key()
    }

    #[test]
    fn test_fetch_failure_keeps_progress() {
        let err = SyncError::FetchFailed {
            account: account(),
            chain: "source".into(),
            nonce: 3,
            relayed: vec![0, 1, 2],
            source: ChainError::Transient {
                chain: "source".into(),
                reason: "connection reset".into(),
            },
        };
        assert_eq!(err.relayed(), &[0, 1, 2]);
        assert_eq!(err.resume_nonce(), Some(3));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("after relaying 3 transactions"));
    }

    #[test]
    fn test_startup_failure_has_no_progress() {
        let err = SyncError::from(ChainError::Transient {
            chain: "dest".into(),
            reason: "refused".into(),
        });
        assert!(err.relayed().is_empty());
        assert_eq!(err.resume_nonce(), None);
    }
}
