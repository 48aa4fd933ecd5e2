//! # Omniverse Core
//!
//! Pure primitives for the omniverse relay: accounts, operations, transaction
//! envelopes, their canonical byte encoding and the recoverable signatures
//! over it.
//!
//! This crate contains no I/O and no networking. Everything here must produce
//! byte-identical results on every chain that verifies an omniverse
//! transaction.
//!
//! ## Key Types
//!
//! - [`OmniverseTransaction`] - A signed envelope, immutable once created
//! - [`UnsignedTransaction`] - The envelope before signing
//! - [`Operation`] - Mint, transfer or burn, with its [`OpCode`]
//! - [`PublicKey`] - Chain-agnostic account identity
//! - [`SecretKey`] / [`RecoverableSignature`] - secp256k1 signing
//!
//! ## Canonicalization
//!
//! Envelopes are encoded to a fixed-width, big-endian layout and hashed with
//! Keccak-256. See the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod operation;
pub mod transaction;
pub mod types;
pub mod validation;

pub use canonical::{canonical_bytes, decode_canonical, signing_hash, DecodedTransaction};
pub use crypto::{recover_public_key, Keccak256Hash, RecoverableSignature, SecretKey};
pub use error::{CoreError, ValidationError};
pub use operation::{OpCode, Operation};
pub use transaction::{OmniverseTransaction, TransactionBuilder, UnsignedTransaction};
pub use types::{Address, PublicKey, TokenId};
pub use validation::{validate_transaction_structure, verify_transaction};
