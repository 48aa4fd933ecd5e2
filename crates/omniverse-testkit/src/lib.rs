//! # Omniverse Testkit
//!
//! Testing utilities for the omniverse relay.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known transactions with their expected canonical bytes
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: In-memory networks, registries and relays ready to use
//!
//! ## Golden Vectors
//!
//! Every verifier on every chain must rebuild the same bytes:
//!
//! ```rust
//! use omniverse_testkit::vectors::{all_vectors, generate_transaction_from_vector};
//!
//! for vector in all_vectors() {
//!     let tx = generate_transaction_from_vector(&vector);
//!     let bytes = tx.body().canonical_bytes().unwrap();
//!     assert_eq!(hex::encode(bytes), vector.expected_encoding);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use omniverse_testkit::generators::{transaction_from_params, TxParams};
//!
//! proptest! {
//!     #[test]
//!     fn signing_hash_is_deterministic(params: TxParams) {
//!         let a = transaction_from_params(&params);
//!         let b = transaction_from_params(&params);
//!         prop_assert_eq!(a.signing_hash().unwrap(), b.signing_hash().unwrap());
//!     }
//! }
//! ```
//!
//! ## Network Fixtures
//!
//! Two initialized chains and a relay over them:
//!
//! ```rust,ignore
//! use omniverse_testkit::fixtures::NetworkFixture;
//!
//! let fixture = NetworkFixture::new();
//! fixture.initialize().await;
//! let relay = fixture.relay();
//! let session = relay.session("goerli").await?;
//! session.mint(session.public_key().fragment(), 1u64).await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, test_keys, NetworkFixture};
pub use generators::{transaction_from_params, TxParams};
pub use vectors::{
    all_vectors, generate_transaction_from_vector, vectors_json, verify_all_vectors, GoldenVector,
};
