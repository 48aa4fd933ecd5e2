//! Sync run state machine.
//!
//! Implements the nonce-gap replay between a source and a destination chain.

use std::time::Duration;

use omniverse_chain::{call_with_timeout, ChainClient};
use omniverse_core::{verify_transaction, OmniverseTransaction, PublicKey};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Deadline for each chain call.
    pub call_timeout: Duration,
    /// Whether to check fetched transactions before relaying them.
    pub verify_before_relay: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            verify_before_relay: true,
        }
    }
}

/// Where a sync run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    ComparingNonces,
    Relaying,
    /// Every missing nonce was accepted.
    Completed,
    /// The destination was not behind; nothing was submitted.
    AlreadySynced,
    Failed,
}

/// Result of a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub account: PublicKey,
    pub source_chain: String,
    pub dest_chain: String,
    /// Source nonce read at the start of the run.
    pub source_nonce: u128,
    /// Destination nonce read at the start of the run.
    pub start_nonce: u128,
    /// Nonces accepted by the destination, in submission order.
    pub relayed: Vec<u128>,
    /// Final phase: `Completed` or `AlreadySynced`.
    pub phase: SyncPhase,
    /// The destination was strictly ahead of the source.
    pub destination_ahead: bool,
}

impl SyncReport {
    /// Number of transactions relayed.
    pub fn relayed_count(&self) -> usize {
        self.relayed.len()
    }
}

/// Replays missing transactions between chains.
#[derive(Debug, Clone, Default)]
pub struct Synchronizer {
    config: SyncConfig,
}

impl Synchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Bring `dest` up to `source` for `account`.
    ///
    /// Callers must not run two syncs for the same account and destination
    /// at the same time.
    pub async fn sync(
        &self,
        account: &PublicKey,
        source: &dyn ChainClient,
        dest: &dyn ChainClient,
    ) -> Result<SyncReport> {
        self.sync_with_cancel(account, source, dest, &CancellationToken::new())
            .await
    }

    /// Like [`sync`](Self::sync), checking `cancel` before each nonce.
    ///
    /// A submission that has started is always allowed to finish.
    pub async fn sync_with_cancel(
        &self,
        account: &PublicKey,
        source: &dyn ChainClient,
        dest: &dyn ChainClient,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let mut run = Run::new(account, source.name(), dest.name());

        // Phase 1: compare nonces
        run.enter(SyncPhase::ComparingNonces);
        let timeout = self.config.call_timeout;
        let source_nonce =
            call_with_timeout(source.name(), timeout, source.get_nonce(account)).await?;
        let dest_nonce = call_with_timeout(dest.name(), timeout, dest.get_nonce(account)).await?;

        let mut report = SyncReport {
            account: *account,
            source_chain: source.name().to_string(),
            dest_chain: dest.name().to_string(),
            source_nonce,
            start_nonce: dest_nonce,
            relayed: Vec::new(),
            phase: SyncPhase::ComparingNonces,
            destination_ahead: dest_nonce > source_nonce,
        };

        if dest_nonce >= source_nonce {
            if report.destination_ahead {
                warn!(
                    source = source.name(),
                    dest = dest.name(),
                    source_nonce,
                    dest_nonce,
                    "destination is ahead of source"
                );
            }
            report.phase = run.enter(SyncPhase::AlreadySynced);
            return Ok(report);
        }

        // Phase 2: relay [dest_nonce, source_nonce) in order
        run.enter(SyncPhase::Relaying);
        info!(
            source = source.name(),
            dest = dest.name(),
            from = dest_nonce,
            to = source_nonce,
            "relaying missing transactions"
        );

        for nonce in dest_nonce..source_nonce {
            if cancel.is_cancelled() {
                run.enter(SyncPhase::Failed);
                info!(next_nonce = nonce, "sync cancelled");
                return Err(SyncError::Cancelled {
                    account: *account,
                    next_nonce: nonce,
                    relayed: report.relayed,
                });
            }

            let tx = match call_with_timeout(
                source.name(),
                timeout,
                source.get_transaction(account, nonce),
            )
            .await
            {
                Ok(tx) => tx,
                Err(fetch_err) => {
                    run.enter(SyncPhase::Failed);
                    warn!(
                        source = source.name(),
                        nonce,
                        error = %fetch_err,
                        "fetch failed, halting sync"
                    );
                    return Err(SyncError::FetchFailed {
                        account: *account,
                        chain: source.name().to_string(),
                        nonce,
                        relayed: report.relayed,
                        source: fetch_err,
                    });
                }
            };

            if self.config.verify_before_relay {
                if let Err(reason) = check_fetched(&tx, account, nonce) {
                    run.enter(SyncPhase::Failed);
                    return Err(SyncError::InvalidTransaction {
                        chain: source.name().to_string(),
                        nonce,
                        reason,
                        relayed: report.relayed,
                    });
                }
            }

            if let Err(source_err) =
                call_with_timeout(dest.name(), timeout, dest.submit(&tx)).await
            {
                run.enter(SyncPhase::Failed);
                warn!(
                    dest = dest.name(),
                    nonce,
                    error = %source_err,
                    "submission failed, halting sync"
                );
                return Err(SyncError::Halted {
                    account: *account,
                    chain: dest.name().to_string(),
                    nonce,
                    relayed: report.relayed,
                    source: source_err,
                });
            }

            debug!(dest = dest.name(), nonce, "relayed");
            report.relayed.push(nonce);
        }

        report.phase = run.enter(SyncPhase::Completed);
        info!(
            dest = dest.name(),
            relayed = report.relayed.len(),
            "sync completed"
        );
        Ok(report)
    }
}

/// A fetched transaction must be the one asked for, from `account`, with a
/// signature that recovers to it.
fn check_fetched(
    tx: &OmniverseTransaction,
    account: &PublicKey,
    nonce: u128,
) -> std::result::Result<(), String> {
    if tx.nonce() != nonce {
        return Err(format!("source returned nonce {}", tx.nonce()));
    }
    if tx.sender() != account {
        return Err(format!("source returned sender {}", tx.sender()));
    }
    verify_transaction(tx).map_err(|e| e.to_string())
}

/// Phase tracking for one run.
struct Run<'a> {
    account: &'a PublicKey,
    source: &'a str,
    dest: &'a str,
    phase: SyncPhase,
}

impl<'a> Run<'a> {
    fn new(account: &'a PublicKey, source: &'a str, dest: &'a str) -> Self {
        Self {
            account,
            source,
            dest,
            phase: SyncPhase::Idle,
        }
    }

    fn enter(&mut self, phase: SyncPhase) -> SyncPhase {
        debug!(
            account = ?self.account,
            source = self.source,
            dest = self.dest,
            from = ?self.phase,
            to = ?phase,
            "sync phase"
        );
        self.phase = phase;
        phase
    }
}
