//! # Omniverse Relay
//!
//! Operator client for omniverse tokens: tokens whose transaction history
//! is replicated, in the same order, across several independent chains.
//!
//! ## Overview
//!
//! - **Sessions**: a [`Session`] binds one configured chain, a connected
//!   client and the active signing key
//! - **Operations**: mint, transfer and burn are built against the chain's
//!   live nonce, signed once and submitted to the origin chain
//! - **Sync**: [`Relay::sync`] replays an account's missing transactions
//!   from one chain to another, one nonce at a time
//! - **Keys**: the keyring's active key can be switched; the choice is
//!   persisted before it takes effect
//!
//! ## Usage
//!
//! ```rust,no_run
//! use omniverse_relay::{Relay, RelayConfig};
//! use omniverse_relay::chain::{ChainRegistry, MemoryNetwork};
//! use omniverse_relay::keyring::FileKeyringStore;
//!
//! async fn example() -> omniverse_relay::Result<()> {
//!     let registry = ChainRegistry::load("chains.toml")?;
//!     let store = FileKeyringStore::new(".secret.json");
//!     let relay = Relay::new(registry, store, MemoryNetwork::new(), RelayConfig::default())?;
//!
//!     let goerli = relay.session("goerli").await?;
//!     let tx = goerli.mint(relay.public_key().fragment(), 1u64).await?;
//!     println!("minted at nonce {}", tx.nonce());
//!
//!     let report = relay.sync("goerli", "bsc", &relay.public_key()).await?;
//!     println!("relayed {:?}", report.relayed);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `omniverse_relay::core` - Envelopes, codec and signatures
//! - `omniverse_relay::keyring` - Keyring and keyring stores
//! - `omniverse_relay::chain` - Chain client interface and configuration
//! - `omniverse_relay::sync` - Replay and convergence

pub mod error;
pub mod relay;
pub mod session;

// Re-export component crates
pub use omniverse_chain as chain;
pub use omniverse_core as core;
pub use omniverse_keyring as keyring;
pub use omniverse_sync as sync;

pub use error::{RelayError, Result};
pub use relay::{Relay, RelayConfig};
pub use session::{AccountOverview, Session};

// Re-export commonly used types
pub use omniverse_core::{Address, OmniverseTransaction, Operation, PublicKey, TokenId};
pub use omniverse_sync::{SyncPhase, SyncReport};
