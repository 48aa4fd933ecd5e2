//! # Omniverse Keyring
//!
//! The set of candidate signing keys for an operator, with exactly one key
//! active at a time, and the store that persists it.
//!
//! ## Key Types
//!
//! - [`Keyring`] - Ordered keys plus the active index
//! - [`KeyringStore`] - Load/save interface for the persisted keyring
//! - [`FileKeyringStore`] - JSON file on disk, replaced atomically on save
//! - [`MemoryKeyringStore`] - In-memory store for tests
//!
//! ## File Format
//!
//! ```json
//! {
//!     "keys": ["0x…", "0x…"],
//!     "index": 0
//! }
//! ```
//!
//! The legacy field name `sks` is accepted in place of `keys` when loading.

pub mod error;
pub mod keyring;
pub mod store;

pub use error::{KeyringError, Result};
pub use keyring::Keyring;
pub use store::{FileKeyringStore, KeyringStore, MemoryKeyringStore};
