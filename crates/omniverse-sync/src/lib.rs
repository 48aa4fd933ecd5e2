//! # Omniverse Sync
//!
//! Replays an account's missing transactions from one chain to another.
//!
//! ## Overview
//!
//! Every chain keeps, per account, a log of accepted transactions indexed
//! by nonce. When a destination chain's nonce for an account is behind the
//! source chain's, the transactions in between are fetched from the source
//! and resubmitted, unchanged and in increasing nonce order, to the
//! destination.
//!
//! ## Key Properties
//!
//! - **Ordered**: nonce `n` is only submitted after `n - 1` was accepted
//! - **Halting**: the first failed submission ends the run; nothing is skipped
//! - **Resumable**: the next run starts from the destination's nonce, which
//!   is exactly where the last one stopped
//! - **Idempotent**: a run against a caught-up destination submits nothing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use omniverse_sync::{SyncConfig, Synchronizer};
//!
//! async fn example() {
//!     // let source: Arc<dyn ChainClient> = connector.connect(&goerli).await?;
//!     // let dest: Arc<dyn ChainClient> = connector.connect(&bsc).await?;
//!
//!     let synchronizer = Synchronizer::new(SyncConfig::default());
//!     // let report = synchronizer.sync(&account, &*source, &*dest).await?;
//!     // println!("relayed {:?}", report.relayed);
//! }
//! ```
//!
//! ## Run States
//!
//! ```text
//! Idle -> ComparingNonces -> AlreadySynced
//!                         -> Relaying -> Completed
//!                                     -> Failed (at nonce n)
//! ```

pub mod convergence;
pub mod error;
pub mod protocol;

pub use convergence::{log_digest, verify_convergence, Convergence, LogDigest};
pub use error::{Result, SyncError};
pub use protocol::{SyncConfig, SyncPhase, SyncReport, Synchronizer};
