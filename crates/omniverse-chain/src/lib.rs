//! # Omniverse Chain
//!
//! The boundary between the relay and each participating chain.
//!
//! A chain is reached through a [`ChainClient`]: read an account's nonce,
//! read a transaction by nonce, submit a signed transaction, read auxiliary
//! contract state, and issue owner-only admin calls. Every call may fail
//! transiently (network, timeout) or permanently (contract revert), and
//! [`ChainError`] keeps the two apart.
//!
//! ## Modules
//!
//! - [`config`] - Chain descriptors and the registry they are loaded into
//! - [`traits`] - [`ChainClient`] and [`ChainConnector`]
//! - [`timeout`] - Per-call deadlines
//! - [`memory`] - In-memory chains modelling the omniverse contract

pub mod config;
pub mod error;
pub mod memory;
pub mod timeout;
pub mod traits;

pub use config::{ChainDescriptor, ChainRegistry};
pub use error::{ChainError, ConfigError, Result};
pub use memory::{Failure, MemoryChain, MemoryNetwork, Submission};
pub use timeout::call_with_timeout;
pub use traits::{AdminCall, AuxQuery, AuxValue, ChainClient, ChainConnector, DelayedTx, Member};
