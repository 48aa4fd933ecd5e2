//! Omniverse transactions: the chain-agnostic signed envelope.
//!
//! An envelope is built once, signed once, and afterwards only ever copied.
//! Relaying to another chain resubmits the same bytes and the same signature.

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::crypto::{Keccak256Hash, RecoverableSignature, SecretKey};
use crate::error::CoreError;
use crate::operation::Operation;
use crate::types::{Address, PublicKey};

/// An envelope before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Position in the sender's log on the origin chain.
    pub nonce: u128,

    /// Omniverse id of the chain that originates the transaction.
    pub chain_id: u32,

    /// Address of the contract instance the transaction was created for.
    pub initiating_contract: Address,

    /// The signing account.
    pub sender: PublicKey,

    /// What the transaction does.
    pub operation: Operation,
}

impl UnsignedTransaction {
    /// Canonical bytes (see [`canonical::canonical_bytes`]).
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CoreError> {
        canonical::canonical_bytes(self)
    }

    /// The digest that gets signed.
    pub fn signing_hash(&self) -> Result<Keccak256Hash, CoreError> {
        canonical::signing_hash(self)
    }

    /// Sign with `key`, which must belong to `sender`.
    pub fn sign(self, key: &SecretKey) -> Result<OmniverseTransaction, CoreError> {
        let actual = key.public_key();
        if actual != self.sender {
            return Err(CoreError::SenderMismatch {
                expected: self.sender,
                actual,
            });
        }

        let hash = self.signing_hash()?;
        let signature = key.sign_prehash(&hash)?;
        Ok(OmniverseTransaction {
            body: self,
            signature,
        })
    }
}

/// A signed omniverse transaction.
///
/// Fields are read-only: there is no way to change a signed envelope, only
/// to build a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmniverseTransaction {
    body: UnsignedTransaction,
    signature: RecoverableSignature,
}

impl OmniverseTransaction {
    /// Reassemble a transaction read back from a chain.
    ///
    /// No verification happens here; see [`crate::verify_transaction`].
    pub fn from_parts(body: UnsignedTransaction, signature: RecoverableSignature) -> Self {
        Self { body, signature }
    }

    pub fn body(&self) -> &UnsignedTransaction {
        &self.body
    }

    pub fn nonce(&self) -> u128 {
        self.body.nonce
    }

    pub fn chain_id(&self) -> u32 {
        self.body.chain_id
    }

    pub fn initiating_contract(&self) -> &Address {
        &self.body.initiating_contract
    }

    pub fn sender(&self) -> &PublicKey {
        &self.body.sender
    }

    pub fn operation(&self) -> &Operation {
        &self.body.operation
    }

    pub fn signature(&self) -> &RecoverableSignature {
        &self.signature
    }

    /// The digest the signature covers.
    pub fn signing_hash(&self) -> Result<Keccak256Hash, CoreError> {
        self.body.signing_hash()
    }
}

/// Builder for transactions.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    nonce: u128,
    chain_id: u32,
    initiating_contract: Address,
    sender: PublicKey,
    operation: Option<Operation>,
}

impl TransactionBuilder {
    /// Start a transaction originating on `chain_id` / `initiating_contract`.
    pub fn new(chain_id: u32, initiating_contract: Address, sender: PublicKey) -> Self {
        Self {
            nonce: 0,
            chain_id,
            initiating_contract,
            sender,
            operation: None,
        }
    }

    /// Set the nonce.
    pub fn nonce(mut self, nonce: u128) -> Self {
        self.nonce = nonce;
        self
    }

    /// Set the operation.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Build the unsigned envelope, checking that it encodes.
    pub fn build(self) -> Result<UnsignedTransaction, CoreError> {
        let operation = self.operation.ok_or(CoreError::MissingOperation)?;
        let tx = UnsignedTransaction {
            nonce: self.nonce,
            chain_id: self.chain_id,
            initiating_contract: self.initiating_contract,
            sender: self.sender,
            operation,
        };
        canonical::canonical_bytes(&tx)?;
        Ok(tx)
    }

    /// Build and sign.
    pub fn sign(self, key: &SecretKey) -> Result<OmniverseTransaction, CoreError> {
        self.build()?.sign(key)
    }
}
