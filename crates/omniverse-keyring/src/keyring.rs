//! The in-memory keyring.

use omniverse_core::{
    Address, Keccak256Hash, OmniverseTransaction, PublicKey, RecoverableSignature, SecretKey,
    UnsignedTransaction,
};

use crate::error::{KeyringError, Result};

/// Ordered signing keys with one active entry.
///
/// A keyring is never empty and its active index is always in range; both
/// are checked on construction and on every switch.
#[derive(Clone)]
pub struct Keyring {
    keys: Vec<SecretKey>,
    index: usize,
}

impl Keyring {
    /// Create a keyring with `index` active.
    pub fn new(keys: Vec<SecretKey>, index: usize) -> Result<Self> {
        if keys.is_empty() {
            return Err(KeyringError::InvalidKeyring("keyring holds no keys".into()));
        }
        check_index(index, keys.len())?;
        Ok(Self { keys, index })
    }

    /// A keyring of one key.
    pub fn single(key: SecretKey) -> Self {
        Self {
            keys: vec![key],
            index: 0,
        }
    }

    /// Parse hex-encoded secret keys.
    pub fn from_hex_keys<S: AsRef<str>>(keys: &[S], index: usize) -> Result<Self> {
        let keys = keys
            .iter()
            .enumerate()
            .map(|(position, hex)| {
                SecretKey::from_hex(hex.as_ref())
                    .map_err(|source| KeyringError::InvalidKey { position, source })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(keys, index)
    }

    /// Hex encoding of every key, in order.
    pub fn to_hex_keys(&self) -> Vec<String> {
        self.keys.iter().map(|k| format!("0x{}", k.to_hex())).collect()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the keyring holds no keys. A keyring from [`Keyring::new`]
    /// always holds at least one.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the active key.
    pub fn active_index(&self) -> usize {
        self.index
    }

    /// The active key.
    pub fn active(&self) -> &SecretKey {
        &self.keys[self.index]
    }

    /// Public key of the active key.
    pub fn public_key(&self) -> PublicKey {
        self.active().public_key()
    }

    /// Address of the active key.
    pub fn address(&self) -> Address {
        self.active().address()
    }

    /// Public keys of every key, in order.
    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.keys.iter().map(SecretKey::public_key).collect()
    }

    /// Make `index` the active key.
    ///
    /// On error the active key is unchanged.
    pub fn switch_key(&mut self, index: usize) -> Result<()> {
        check_index(index, self.keys.len())?;
        self.index = index;
        Ok(())
    }

    /// Sign a prehashed digest with the active key.
    pub fn sign_hash(&self, hash: &Keccak256Hash) -> Result<RecoverableSignature> {
        self.active().sign_prehash(hash).map_err(KeyringError::Signing)
    }

    /// Sign an envelope with the active key.
    pub fn sign_transaction(&self, tx: UnsignedTransaction) -> Result<OmniverseTransaction> {
        tx.sign(self.active()).map_err(KeyringError::Signing)
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("len", &self.keys.len())
            .field("index", &self.index)
            .field("active", &self.public_key())
            .finish()
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(KeyringError::IndexOutOfRange { index, len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniverse_core::{recover_public_key, Operation, TransactionBuilder};

    fn keys(n: u8) -> Vec<SecretKey> {
        (1..=n)
            .map(|i| SecretKey::from_bytes(&[i; 32]).unwrap())
            .collect()
    }

    #[test]
    fn test_new_checks_bounds() {
        assert!(matches!(
            Keyring::new(vec![], 0),
            Err(KeyringError::InvalidKeyring(_))
        ));
        assert!(matches!(
            Keyring::new(keys(2), 2),
            Err(KeyringError::IndexOutOfRange { index: 2, len: 2 })
        ));
        let keyring = Keyring::new(keys(2), 1).unwrap();
        assert_eq!(keyring.active_index(), 1);
        assert_eq!(keyring.len(), 2);
        assert!(!keyring.is_empty());
    }

    #[test]
    fn test_switch_key() {
        let mut ring = Keyring::new(keys(3), 0).unwrap();
        let pks = ring.public_keys();

        ring.switch_key(2).unwrap();
        assert_eq!(ring.active_index(), 2);
        assert_eq!(ring.public_key(), pks[2]);

        // Out of range leaves the active key alone.
        assert!(matches!(
            ring.switch_key(3),
            Err(KeyringError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(ring.active_index(), 2);
    }

    #[test]
    fn test_hex_roundtrip() {
        let ring = Keyring::new(keys(2), 1).unwrap();
        let hex = ring.to_hex_keys();
        assert!(hex.iter().all(|k| k.starts_with("0x")));

        let back = Keyring::from_hex_keys(&hex, 1).unwrap();
        assert_eq!(back.public_keys(), ring.public_keys());
        assert_eq!(back.active_index(), 1);
    }

    #[test]
    fn test_bad_hex_key_reports_position() {
        let good = format!("0x{}", hex_of(1));
        let result = Keyring::from_hex_keys(&[good.as_str(), "0x1234"], 0);
        assert!(matches!(
            result,
            Err(KeyringError::InvalidKey { position: 1, .. })
        ));
    }

    #[test]
    fn test_sign_with_active_key() {
        let mut ring = Keyring::new(keys(2), 0).unwrap();
        ring.switch_key(1).unwrap();

        let tx = TransactionBuilder::new(1, Address::from_bytes([0xcc; 20]), ring.public_key())
            .operation(Operation::mint(ring.address(), 1u64))
            .build()
            .unwrap();
        let hash = tx.signing_hash().unwrap();

        let sig = ring.sign_hash(&hash).unwrap();
        assert_eq!(recover_public_key(&hash, &sig).unwrap(), ring.public_key());

        let signed = ring.sign_transaction(tx).unwrap();
        assert_eq!(signed.signature(), &sig);
    }

    #[test]
    fn test_sign_transaction_for_other_sender_fails() {
        let ring = Keyring::new(keys(2), 0).unwrap();
        let other = ring.public_keys()[1];
        let tx = TransactionBuilder::new(1, Address::ZERO, other)
            .operation(Operation::mint(Address::ZERO, 1u64))
            .build()
            .unwrap();
        assert!(matches!(
            ring.sign_transaction(tx),
            Err(KeyringError::Signing(_))
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let ring = Keyring::new(keys(1), 0).unwrap();
        let debug = format!("{ring:?}");
        assert!(!debug.contains(&hex_of(1)));
    }

    fn hex_of(byte: u8) -> String {
        SecretKey::from_bytes(&[byte; 32]).unwrap().to_hex()
    }
}
