//! The Relay: unified API for an omniverse operator.
//!
//! The Relay owns everything that would otherwise be process-wide state:
//! the chain registry, the keyring and its store, the connector used to
//! reach chains, and the locks that keep sync runs for the same account and
//! destination from interleaving.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use omniverse_chain::{ChainClient, ChainConnector, ChainDescriptor, ChainRegistry, Member};
use omniverse_core::PublicKey;
use omniverse_keyring::{Keyring, KeyringStore};
use omniverse_sync::{Convergence, SyncConfig, SyncReport, Synchronizer};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{RelayError, Result};
use crate::session::Session;

/// Configuration for the Relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Deadline for each chain call made by sessions.
    pub call_timeout: Duration,
    /// Sync configuration.
    pub sync: SyncConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            sync: SyncConfig::default(),
        }
    }
}

type SyncKey = (PublicKey, String);

/// The main Relay struct.
///
/// Provides a unified API for:
/// - Opening sessions on configured chains
/// - Building and submitting operations (through [`Session`])
/// - Syncing an account between chains
/// - Switching the active key
pub struct Relay<K: KeyringStore, C: ChainConnector> {
    registry: ChainRegistry,
    store: K,
    keyring: RwLock<Keyring>,
    connector: C,
    config: RelayConfig,
    synchronizer: Synchronizer,
    sync_locks: Mutex<HashMap<SyncKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K: KeyringStore, C: ChainConnector> Relay<K, C> {
    /// Create a relay, loading the keyring from `store`.
    pub fn new(
        registry: ChainRegistry,
        store: K,
        connector: C,
        config: RelayConfig,
    ) -> Result<Self> {
        let keyring = store.load()?;
        info!(
            chains = registry.len(),
            keys = keyring.len(),
            index = keyring.active_index(),
            "relay ready"
        );
        Ok(Self {
            registry,
            store,
            keyring: RwLock::new(keyring),
            connector,
            synchronizer: Synchronizer::new(config.sync.clone()),
            config,
            sync_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// Public key of the active key.
    pub fn public_key(&self) -> PublicKey {
        self.keyring.read().unwrap().public_key()
    }

    /// Index of the active key.
    pub fn active_index(&self) -> usize {
        self.keyring.read().unwrap().active_index()
    }

    /// A member entry for every configured chain.
    pub fn registry_members(&self) -> Vec<Member> {
        self.registry.iter().map(Member::from).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Make key `index` active.
    ///
    /// The new index is persisted first; if that fails the active key is
    /// unchanged. Sessions already open keep the key they were opened with.
    pub fn switch_key(&self, index: usize) -> Result<()> {
        let mut keyring = self.keyring.write().unwrap();
        let mut next = keyring.clone();
        next.switch_key(index)?;
        self.store.save(&next)?;
        *keyring = next;
        info!(index, account = %keyring.public_key(), "switched active key");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a session on the chain configured as `chain_name`.
    pub async fn session(&self, chain_name: &str) -> Result<Session> {
        let descriptor = self.registry.get(chain_name)?.clone();
        let key = self.keyring.read().unwrap().active().clone();
        let client = self.connect(&descriptor).await?;
        Ok(Session::new(descriptor, client, key, self.config.call_timeout))
    }

    async fn connect(&self, descriptor: &ChainDescriptor) -> Result<Arc<dyn ChainClient>> {
        self.connector.connect(descriptor).await.map_err(|e| {
            if e.is_transient() {
                RelayError::TransientNetworkFailure {
                    chain: descriptor.name.clone(),
                    nonce: None,
                    source: e,
                }
            } else {
                RelayError::Chain(e)
            }
        })
    }

    /// Resolve both names before connecting to either.
    async fn connect_pair(
        &self,
        a: &str,
        b: &str,
    ) -> Result<(Arc<dyn ChainClient>, Arc<dyn ChainClient>)> {
        let a = self.registry.get(a)?;
        let b = self.registry.get(b)?;
        Ok((self.connect(a).await?, self.connect(b).await?))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────

    /// Relay `account`'s missing transactions from `source` to `dest`.
    pub async fn sync(&self, source: &str, dest: &str, account: &PublicKey) -> Result<SyncReport> {
        self.sync_with_cancel(source, dest, account, &CancellationToken::new())
            .await
    }

    /// Like [`sync`](Self::sync), stopping at the next nonce boundary once
    /// `cancel` fires.
    ///
    /// Runs for the same account and destination wait for each other.
    pub async fn sync_with_cancel(
        &self,
        source: &str,
        dest: &str,
        account: &PublicKey,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let (source_client, dest_client) = self.connect_pair(source, dest).await?;

        let lease = self.sync_lock(account, dest);
        let _guard = lease.lock.lock().await;

        let report = self
            .synchronizer
            .sync_with_cancel(account, source_client.as_ref(), dest_client.as_ref(), cancel)
            .await?;
        Ok(report)
    }

    /// Compare `account`'s logs on two chains.
    pub async fn verify_convergence(
        &self,
        a: &str,
        b: &str,
        account: &PublicKey,
    ) -> Result<Convergence> {
        let (a, b) = self.connect_pair(a, b).await?;
        let result = omniverse_sync::verify_convergence(
            account,
            a.as_ref(),
            b.as_ref(),
            self.synchronizer.config(),
        )
        .await?;
        Ok(result)
    }

    fn sync_lock(&self, account: &PublicKey, dest: &str) -> SyncLease<'_> {
        let key = (*account, dest.to_string());
        let mut locks = self.sync_locks.lock().unwrap();
        let lock = Arc::clone(
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        );
        SyncLease {
            locks: &self.sync_locks,
            key,
            lock,
        }
    }
}

/// A handle on one pair's sync lock.
///
/// The map entry lives while any lease for it does; the last lease dropped
/// removes it, so the map holds only pairs with a run in flight or waiting.
struct SyncLease<'a> {
    locks: &'a Mutex<HashMap<SyncKey, Arc<tokio::sync::Mutex<()>>>>,
    key: SyncKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for SyncLease<'_> {
    fn drop(&mut self) {
        // Clones are only taken under the map lock, so the count is stable here.
        if let Ok(mut locks) = self.locks.lock() {
            if Arc::strong_count(&self.lock) == 2 {
                locks.remove(&self.key);
            }
        }
    }
}
