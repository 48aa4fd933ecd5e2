//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: deterministic keys, a network of
//! in-memory chains and a relay wired to it.

use std::sync::Arc;

use omniverse_chain::{
    AdminCall, ChainClient, ChainDescriptor, ChainRegistry, MemoryChain, MemoryNetwork, Member,
};
use omniverse_core::{Address, OmniverseTransaction, Operation, SecretKey, TransactionBuilder};
use omniverse_keyring::{Keyring, MemoryKeyringStore};
use omniverse_relay::{Relay, RelayConfig};
use tracing_subscriber::EnvFilter;

/// Base URI every fixture contract is initialized with.
pub const BASE_URI: &str = "ipfs://skywalker/";

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `count` deterministic keys; key `i` is the scalar `i + 1`.
pub fn test_keys(count: usize) -> Vec<SecretKey> {
    (1..=count as u64)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[24..].copy_from_slice(&i.to_be_bytes());
            SecretKey::from_bytes(&bytes).expect("small scalars are valid keys")
        })
        .collect()
}

/// A network of in-memory chains, all owned by the first key.
pub struct NetworkFixture {
    pub keys: Vec<SecretKey>,
    pub network: Arc<MemoryNetwork>,
    pub registry: ChainRegistry,
}

impl NetworkFixture {
    /// Two chains: `goerli` (id 1, applies immediately) and `bsc` (id 2,
    /// ten second cooldown). Three keys.
    pub fn new() -> Self {
        Self::with_chains(
            vec![
                ChainDescriptor::new("goerli", 1, "mem://goerli", Address::from_bytes([0x01; 20])),
                ChainDescriptor::new("bsc", 2, "mem://bsc", Address::from_bytes([0x02; 20]))
                    .with_cooldown(10),
            ],
            3,
        )
    }

    /// Deploy one chain per descriptor, owned by the first of `key_count` keys.
    pub fn with_chains(descriptors: Vec<ChainDescriptor>, key_count: usize) -> Self {
        let keys = test_keys(key_count.max(1));
        let network = MemoryNetwork::new();
        for descriptor in &descriptors {
            network.add_chain(descriptor.clone(), keys[0].public_key());
        }
        let registry =
            ChainRegistry::from_descriptors(descriptors).expect("fixture chain names are unique");
        Self {
            keys,
            network,
            registry,
        }
    }

    /// The contract owner on every chain.
    pub fn owner(&self) -> &SecretKey {
        &self.keys[0]
    }

    /// The deployed chain configured as `name`.
    pub fn chain(&self, name: &str) -> Arc<MemoryChain> {
        let descriptor = self.registry.get(name).expect("chain configured");
        self.network
            .chain(descriptor.chain_id)
            .expect("chain deployed")
    }

    /// The chain configured as `name`, as a client.
    pub fn client(&self, name: &str) -> Arc<dyn ChainClient> {
        self.chain(name)
    }

    /// A member entry for every configured chain.
    pub fn members(&self) -> Vec<Member> {
        self.registry.iter().map(Member::from).collect()
    }

    /// Set cooldown, base URI and members on every chain, as the owner.
    pub async fn initialize(&self) {
        let members = self.members();
        for descriptor in self.registry.iter() {
            let chain = self.chain(&descriptor.name);
            for call in [
                AdminCall::SetCoolingDownTime(descriptor.cooldown_seconds),
                AdminCall::SetBaseUri(BASE_URI.to_string()),
                AdminCall::SetMembers(members.clone()),
            ] {
                chain
                    .call_admin(self.owner(), &call)
                    .await
                    .expect("owner may configure the contract");
            }
        }
    }

    /// A relay over this network whose keyring holds every fixture key,
    /// with the first active.
    pub fn relay(&self) -> Relay<MemoryKeyringStore, Arc<MemoryNetwork>> {
        self.relay_with_config(RelayConfig::default())
    }

    pub fn relay_with_config(
        &self,
        config: RelayConfig,
    ) -> Relay<MemoryKeyringStore, Arc<MemoryNetwork>> {
        let keyring = Keyring::new(self.keys.clone(), 0).expect("fixture keyring is valid");
        Relay::new(
            self.registry.clone(),
            MemoryKeyringStore::with_keyring(keyring),
            Arc::clone(&self.network),
            config,
        )
        .expect("memory keyring loads")
    }

    /// Sign `operation` as `key` at `nonce` for the chain configured as `name`.
    pub fn sign(
        &self,
        name: &str,
        key: &SecretKey,
        nonce: u128,
        operation: Operation,
    ) -> OmniverseTransaction {
        let descriptor = self.registry.get(name).expect("chain configured");
        TransactionBuilder::new(descriptor.chain_id, descriptor.contract_address, key.public_key())
            .nonce(nonce)
            .operation(operation)
            .sign(key)
            .expect("operation fits the canonical layout")
    }

    /// Mint `tokens` to the owner on `name`, one transaction each, starting
    /// at the owner's current nonce.
    pub async fn mint_to_owner(&self, name: &str, tokens: impl IntoIterator<Item = u64>) {
        let client = self.client(name);
        let owner = self.owner();
        let mut nonce = client
            .get_nonce(&owner.public_key())
            .await
            .expect("memory chain answers");
        for token in tokens {
            let tx = self.sign(name, owner, nonce, Operation::mint(owner.address(), token));
            client.submit(&tx).await.expect("owner mint accepted");
            nonce += 1;
        }
    }
}

impl Default for NetworkFixture {
    fn default() -> Self {
        Self::new()
    }
}
