//! Persistence for keyrings.
//!
//! The file store rewrites the whole keyring on every save. Writes go to a
//! temporary file in the same directory which is synced and then renamed
//! over the target, so a crash leaves either the old or the new contents.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{KeyringError, Result};
use crate::keyring::Keyring;

/// Load/save interface for a persisted keyring.
pub trait KeyringStore: Send + Sync {
    /// Read the keyring.
    fn load(&self) -> Result<Keyring>;

    /// Durably replace the stored keyring.
    fn save(&self, keyring: &Keyring) -> Result<()>;
}

/// On-disk representation.
#[derive(Debug, Serialize, Deserialize)]
struct KeyringFile {
    #[serde(alias = "sks")]
    keys: Vec<String>,
    index: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// File store
// ─────────────────────────────────────────────────────────────────────────────

/// Keyring stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileKeyringStore {
    path: PathBuf,
}

impl FileKeyringStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl KeyringStore for FileKeyringStore {
    fn load(&self) -> Result<Keyring> {
        let contents = fs::read_to_string(&self.path)?;
        let file: KeyringFile = serde_json::from_str(&contents)?;
        let keyring = Keyring::from_hex_keys(&file.keys, file.index)?;
        debug!(
            path = %self.path.display(),
            keys = keyring.len(),
            index = keyring.active_index(),
            "loaded keyring"
        );
        Ok(keyring)
    }

    fn save(&self, keyring: &Keyring) -> Result<()> {
        let file = KeyringFile {
            keys: keyring.to_hex_keys(),
            index: keyring.active_index(),
        };

        let mut tmp = NamedTempFile::new_in(self.dir())?;
        serde_json::to_writer_pretty(&mut tmp, &file)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| KeyringError::Io(e.error))?;

        info!(
            path = %self.path.display(),
            index = keyring.active_index(),
            "saved keyring"
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory keyring store.
///
/// Saves can be made to fail, to exercise callers' handling of persistence
/// errors.
#[derive(Default)]
pub struct MemoryKeyringStore {
    inner: RwLock<Option<Keyring>>,
    fail_saves: AtomicBool,
}

impl MemoryKeyringStore {
    /// Create an empty store; `load` fails until something is saved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `keyring`.
    pub fn with_keyring(keyring: Keyring) -> Self {
        Self {
            inner: RwLock::new(Some(keyring)),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The stored active index, if any.
    pub fn stored_index(&self) -> Option<usize> {
        self.inner
            .read()
            .unwrap()
            .as_ref()
            .map(Keyring::active_index)
    }
}

impl KeyringStore for MemoryKeyringStore {
    fn load(&self) -> Result<Keyring> {
        self.inner
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| KeyringError::InvalidKeyring("no keyring stored".into()))
    }

    fn save(&self, keyring: &Keyring) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(KeyringError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "save disabled",
            )));
        }
        *self.inner.write().unwrap() = Some(keyring.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniverse_core::SecretKey;
    use tempfile::TempDir;

    fn ring(n: u8, index: usize) -> Keyring {
        let keys = (1..=n)
            .map(|i| SecretKey::from_bytes(&[i; 32]).unwrap())
            .collect();
        Keyring::new(keys, index).unwrap()
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyringStore::new(dir.path().join("keys.json"));

        let original = ring(3, 2);
        store.save(&original).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.public_keys(), original.public_keys());
        assert_eq!(loaded.active_index(), 2);
    }

    #[test]
    fn test_save_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyringStore::new(dir.path().join("keys.json"));

        let mut keyring = ring(2, 0);
        store.save(&keyring).unwrap();
        keyring.switch_key(1).unwrap();
        store.save(&keyring).unwrap();

        assert_eq!(store.load().unwrap().active_index(), 1);
        // Only the target file remains; the temporary was renamed over it.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_legacy_field_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.json");
        let key = SecretKey::from_bytes(&[9; 32]).unwrap();
        fs::write(
            &path,
            format!(r#"{{"sks": ["0x{}"], "index": 0}}"#, key.to_hex()),
        )
        .unwrap();

        let loaded = FileKeyringStore::new(&path).load().unwrap();
        assert_eq!(loaded.public_key(), key.public_key());
    }

    #[test]
    fn test_stored_index_out_of_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");
        let key = SecretKey::from_bytes(&[9; 32]).unwrap();
        fs::write(
            &path,
            format!(r#"{{"keys": ["{}"], "index": 4}}"#, key.to_hex()),
        )
        .unwrap();

        assert!(matches!(
            FileKeyringStore::new(&path).load(),
            Err(KeyringError::IndexOutOfRange { index: 4, len: 1 })
        ));
    }

    #[test]
    fn test_missing_or_malformed_file() {
        let dir = TempDir::new().unwrap();
        let missing = FileKeyringStore::new(dir.path().join("absent.json"));
        assert!(matches!(missing.load(), Err(KeyringError::Io(_))));

        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileKeyringStore::new(&path).load(),
            Err(KeyringError::Serialization(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryKeyringStore::new();
        assert!(store.load().is_err());

        store.save(&ring(2, 1)).unwrap();
        assert_eq!(store.stored_index(), Some(1));

        store.set_fail_saves(true);
        assert!(store.save(&ring(2, 0)).is_err());
        assert_eq!(store.stored_index(), Some(1));
    }
}
