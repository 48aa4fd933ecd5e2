//! Strong type definitions for omniverse accounts and tokens.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;

use crate::crypto::Keccak256Hash;
use crate::error::CoreError;

/// Length of an address (and of a public key fragment) in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Length of an uncompressed secp256k1 public key without its SEC1 tag byte.
pub const PUBLIC_KEY_LEN: usize = 64;

/// Implements serde for a type with `to_hex` / `from_hex` as a `0x`-prefixed string.
macro_rules! impl_hex_serde {
    ($ty:ty, $expecting:literal) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&format!("0x{}", self.to_hex()))
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                <$ty>::from_hex(&s).map_err(|_| {
                    serde::de::Error::invalid_value(serde::de::Unexpected::Str(&s), &$expecting)
                })
            }
        }
    };
}

pub(crate) use impl_hex_serde;

/// Decode hex with an optional `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(s)
}

// ─────────────────────────────────────────────────────────────────────────────
// Address
// ─────────────────────────────────────────────────────────────────────────────

/// A 20-byte address: a contract address or the fragment of a public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Convert to hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; ADDRESS_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// The zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; ADDRESS_LEN] = slice.try_into()?;
        Ok(Self(arr))
    }
}

impl From<Address> for bytes::Bytes {
    fn from(address: Address) -> Self {
        bytes::Bytes::copy_from_slice(&address.0)
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl_hex_serde!(Address, "a 20-byte hex address");

// ─────────────────────────────────────────────────────────────────────────────
// PublicKey
// ─────────────────────────────────────────────────────────────────────────────

/// A 64-byte uncompressed secp256k1 public key (x || y).
///
/// This is the account identity, uniform across every participating chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Convert to hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; PUBLIC_KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// The 20-byte fragment of this key: the last 20 bytes of its Keccak-256.
    ///
    /// This is what the canonical encoding carries for the sender.
    pub fn fragment(&self) -> Address {
        let hash = Keccak256Hash::hash(&self.0);
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(&hash.as_bytes()[32 - ADDRESS_LEN..]);
        Address(arr)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PUBLIC_KEY_LEN]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for PublicKey {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl_hex_serde!(PublicKey, "a 64-byte hex public key");

// ─────────────────────────────────────────────────────────────────────────────
// TokenId
// ─────────────────────────────────────────────────────────────────────────────

/// An unsigned integer of arbitrary width: a token id or an amount.
///
/// Width is not limited here. The canonical encoding pads it to 32 bytes and
/// rejects values that do not fit.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(BigUint);

impl TokenId {
    /// Create from big-endian bytes of any length.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }

    /// Create from a `u128`.
    pub fn from_u128(value: u128) -> Self {
        Self(BigUint::from(value))
    }

    /// The minimal big-endian bytes (empty for zero).
    pub fn to_be_bytes(&self) -> Vec<u8> {
        if self.is_zero() {
            Vec::new()
        } else {
            self.0.to_bytes_be()
        }
    }

    /// Number of significant bytes.
    pub fn byte_len(&self) -> usize {
        self.0.bits().div_ceil(8) as usize
    }

    pub fn is_zero(&self) -> bool {
        self.0.bits() == 0
    }

    /// Convert to `u128` if it fits.
    pub fn to_u128(&self) -> Option<u128> {
        u128::try_from(&self.0).ok()
    }

    /// Parse a decimal string of any length.
    pub fn from_dec_str(s: &str) -> Result<Self, CoreError> {
        Self::parse_radix(s, s, 10)
    }

    /// Parse a hex string (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        Self::parse_radix(s, digits, 16)
    }

    /// Render as a decimal string.
    pub fn to_dec_string(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// `parse_bytes` also accepts `_` separators; only plain digits are valid here.
    fn parse_radix(input: &str, digits: &str, radix: u32) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidNumber(input.to_string());
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(invalid());
        }
        BigUint::parse_bytes(digits.as_bytes(), radix)
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.to_dec_string())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dec_string())
    }
}

impl From<u128> for TokenId {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        Self::from_u128(u128::from(value))
    }
}

impl From<u32> for TokenId {
    fn from(value: u32) -> Self {
        Self::from_u128(u128::from(value))
    }
}

impl FromStr for TokenId {
    type Err = CoreError;

    /// Hex when prefixed with `0x`, decimal otherwise.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            Self::from_hex(s)
        } else {
            Self::from_dec_str(s)
        }
    }
}

impl serde::Serialize for TokenId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_dec_string())
    }
}

impl<'de> serde::Deserialize<'de> for TokenId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
