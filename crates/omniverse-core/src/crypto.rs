//! Cryptographic primitives for omniverse transactions.
//!
//! Wraps secp256k1 recoverable ECDSA and Keccak-256 with strong types. The
//! signature layout (r || s || v, with v offset by 27) is what the on-chain
//! verifier expects, so it is fixed here rather than left to callers.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::error::CoreError;
use crate::types::{decode_hex, impl_hex_serde, Address, PublicKey, PUBLIC_KEY_LEN};

/// Length of a serialized recoverable signature.
pub const SIGNATURE_LEN: usize = 65;

/// Offset added to the recovery id when serializing `v`.
pub const RECOVERY_ID_OFFSET: u8 = 27;

/// A 32-byte Keccak-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keccak256Hash(pub [u8; 32]);

impl Keccak256Hash {
    /// Compute the Keccak-256 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(Keccak256::digest(data).into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// The zero hash (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Keccak256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keccak256({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Keccak256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Keccak256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Keccak256Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl_hex_serde!(Keccak256Hash, "a 32-byte hex hash");

/// A 65-byte recoverable ECDSA signature: r (32) || s (32) || v (1).
///
/// `v` is the recovery id plus [`RECOVERY_ID_OFFSET`], so the signer's public
/// key can be recovered from the hash and signature alone.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// The 64-byte core signature (r || s).
    pub fn core(&self) -> &[u8] {
        &self.0[..64]
    }

    /// The recovery indicator byte.
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// The recovery id, accepting both offset (27/28) and raw (0/1) forms.
    pub fn recovery_id(&self) -> Result<RecoveryId, CoreError> {
        let v = self.v();
        let raw = if v >= RECOVERY_ID_OFFSET {
            v - RECOVERY_ID_OFFSET
        } else {
            v
        };
        RecoveryId::from_byte(raw).ok_or(CoreError::InvalidSignature)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; SIGNATURE_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// The zero signature (invalid, used as placeholder).
    pub const ZERO: Self = Self([0u8; SIGNATURE_LEN]);
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for RecoverableSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_LEN]> for RecoverableSignature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }
}

impl_hex_serde!(RecoverableSignature, "a 65-byte hex signature");

/// A secp256k1 private key.
///
/// Signing never mutates the key; clones share nothing mutable.
#[derive(Clone)]
pub struct SecretKey {
    signing_key: SigningKey,
}

impl SecretKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::random(&mut rng),
        }
    }

    /// Create from 32 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// Parse from hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = decode_hex(s)?;
        if bytes.len() != 32 {
            return Err(CoreError::InvalidSecretKey);
        }
        Self::from_bytes(&bytes)
    }

    /// Hex encoding of the secret scalar (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The account identity for this key.
    pub fn public_key(&self) -> PublicKey {
        public_key_from_verifying(self.signing_key.verifying_key())
    }

    /// The 20-byte address derived from the public key.
    pub fn address(&self) -> Address {
        self.public_key().fragment()
    }

    /// Sign a 32-byte digest, producing a recoverable signature.
    ///
    /// Signatures are deterministic (RFC 6979) and low-S normalized.
    pub fn sign_prehash(&self, hash: &Keccak256Hash) -> Result<RecoverableSignature, CoreError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash.as_bytes())
            .map_err(|_| CoreError::SigningFailed)?;

        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte() + RECOVERY_ID_OFFSET;
        Ok(RecoverableSignature(bytes))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({:?})", self.public_key())
    }
}

/// Recover the signer's public key from a digest and a recoverable signature.
pub fn recover_public_key(
    hash: &Keccak256Hash,
    signature: &RecoverableSignature,
) -> Result<PublicKey, CoreError> {
    let sig = Signature::from_slice(signature.core()).map_err(|_| CoreError::InvalidSignature)?;
    let recovery_id = signature.recovery_id()?;
    let key = VerifyingKey::recover_from_prehash(hash.as_bytes(), &sig, recovery_id)
        .map_err(|_| CoreError::InvalidSignature)?;
    Ok(public_key_from_verifying(&key))
}

fn public_key_from_verifying(key: &VerifyingKey) -> PublicKey {
    let point = key.to_encoded_point(false);
    // Drop the SEC1 tag byte (0x04).
    let mut bytes = [0u8; PUBLIC_KEY_LEN];
    bytes.copy_from_slice(&point.as_bytes()[1..]);
    PublicKey(bytes)
}
