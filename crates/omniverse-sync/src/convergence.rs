//! Convergence verification between chains.
//!
//! Two chains hosting the same account must agree on every nonce both have
//! accepted; one log is always a prefix of the other. Comparing digests of
//! the common prefix tells a chain that is merely behind from one that has
//! forked.

use std::fmt;

use omniverse_chain::{call_with_timeout, ChainClient};
use omniverse_core::{Keccak256Hash, PublicKey};
use tracing::warn;

use crate::error::{Result, SyncError};
use crate::protocol::SyncConfig;

/// Digest over a prefix of an account's transaction log.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogDigest(pub [u8; 32]);

impl LogDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for LogDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for LogDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the digest of `account`'s log on `chain` over nonces `[0, upto)`.
///
/// Algorithm:
/// 1. Fetch each transaction in nonce order
/// 2. Hash: H = Blake3(prefix || account || signing_hash(0) || ... )
/// 3. Return final H
pub async fn log_digest(
    chain: &dyn ChainClient,
    account: &PublicKey,
    upto: u128,
    config: &SyncConfig,
) -> Result<LogDigest> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"omniverse-log-v0:");
    hasher.update(account.as_bytes());

    for nonce in 0..upto {
        hasher.update(signing_hash_at(chain, account, nonce, config).await?.as_bytes());
    }

    Ok(LogDigest(*hasher.finalize().as_bytes()))
}

/// Result of convergence verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    /// Both chains hold the same log.
    Converged { nonce: u128 },
    /// The logs agree, but one chain has fewer transactions.
    Behind {
        lagging_chain: String,
        lagging_nonce: u128,
        leading_nonce: u128,
    },
    /// The chains hold different transactions at `nonce`.
    Diverged { nonce: u128 },
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

/// Compare `account`'s logs on two chains.
pub async fn verify_convergence(
    account: &PublicKey,
    a: &dyn ChainClient,
    b: &dyn ChainClient,
    config: &SyncConfig,
) -> Result<Convergence> {
    let timeout = config.call_timeout;
    let nonce_a = call_with_timeout(a.name(), timeout, a.get_nonce(account)).await?;
    let nonce_b = call_with_timeout(b.name(), timeout, b.get_nonce(account)).await?;
    let common = nonce_a.min(nonce_b);

    let digest_a = log_digest(a, account, common, config).await?;
    let digest_b = log_digest(b, account, common, config).await?;

    if digest_a != digest_b {
        for nonce in 0..common {
            let hash_a = signing_hash_at(a, account, nonce, config).await?;
            let hash_b = signing_hash_at(b, account, nonce, config).await?;
            if hash_a != hash_b {
                warn!(a = a.name(), b = b.name(), nonce, "logs diverge");
                return Ok(Convergence::Diverged { nonce });
            }
        }
    }

    Ok(match nonce_a.cmp(&nonce_b) {
        std::cmp::Ordering::Equal => Convergence::Converged { nonce: nonce_a },
        std::cmp::Ordering::Less => Convergence::Behind {
            lagging_chain: a.name().to_string(),
            lagging_nonce: nonce_a,
            leading_nonce: nonce_b,
        },
        std::cmp::Ordering::Greater => Convergence::Behind {
            lagging_chain: b.name().to_string(),
            lagging_nonce: nonce_b,
            leading_nonce: nonce_a,
        },
    })
}

async fn signing_hash_at(
    chain: &dyn ChainClient,
    account: &PublicKey,
    nonce: u128,
    config: &SyncConfig,
) -> Result<Keccak256Hash> {
    let tx = call_with_timeout(
        chain.name(),
        config.call_timeout,
        chain.get_transaction(account, nonce),
    )
    .await?;
    tx.signing_hash()
        .map_err(|e| SyncError::InvalidTransaction {
            chain: chain.name().to_string(),
            nonce,
            reason: e.to_string(),
            relayed: Vec::new(),
        })
}
