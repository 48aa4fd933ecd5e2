//! Chain configuration.
//!
//! Descriptors are keyed by chain name. TOML files list them under
//! `[chains.<name>]`:
//!
//! ```toml
//! [chains.goerli]
//! chain_id = 1
//! rpc_endpoint = "https://rpc.goerli.example"
//! contract_address = "0x6c9b6a2f2d6b62b79ba3a9b4c1c1d1a0b0e0f001"
//! cooldown_seconds = 10
//! network_id = 5
//! ```
//!
//! JSON files map names to descriptors at the top level and also accept the
//! key names used by older deployments (`omniverseChainId`, `nodeAddress`,
//! `skywalkerNonFungibleAddress`, `coolingDown`, `chainId`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use omniverse_core::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Static description of one participating chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Registry key. Filled from the table key when loading.
    #[serde(default)]
    pub name: String,

    /// Omniverse chain id, written into every envelope originating here.
    #[serde(alias = "omniverseChainId")]
    pub chain_id: u32,

    /// Node endpoint.
    #[serde(alias = "nodeAddress")]
    pub rpc_endpoint: String,

    /// Address of the deployed omniverse contract.
    #[serde(alias = "skywalkerNonFungibleAddress")]
    pub contract_address: Address,

    /// Cooling-down period applied to incoming transactions.
    #[serde(default, alias = "coolingDown")]
    pub cooldown_seconds: u64,

    /// The underlying network's own chain id, when it has one.
    #[serde(default, alias = "chainId", skip_serializing_if = "Option::is_none")]
    pub network_id: Option<u64>,
}

impl ChainDescriptor {
    pub fn new(
        name: impl Into<String>,
        chain_id: u32,
        rpc_endpoint: impl Into<String>,
        contract_address: Address,
    ) -> Self {
        Self {
            name: name.into(),
            chain_id,
            rpc_endpoint: rpc_endpoint.into(),
            contract_address,
            cooldown_seconds: 0,
            network_id: None,
        }
    }

    /// Set the cooling-down period.
    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }
}

#[derive(Deserialize)]
struct TomlFile {
    #[serde(default)]
    chains: BTreeMap<String, ChainDescriptor>,
}

/// Chain descriptors by name. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainDescriptor>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from descriptors, rejecting duplicate names.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ChainDescriptor>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }

    /// Add a descriptor.
    pub fn insert(&mut self, descriptor: ChainDescriptor) -> Result<(), ConfigError> {
        if self.chains.contains_key(&descriptor.name) {
            return Err(ConfigError::DuplicateChain(descriptor.name));
        }
        self.chains.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Parse the TOML form.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: TomlFile = toml::from_str(s)?;
        Ok(Self::from_named(file.chains))
    }

    /// Parse the JSON form.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let chains: BTreeMap<String, ChainDescriptor> = serde_json::from_str(s)?;
        Ok(Self::from_named(chains))
    }

    /// Load a file, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let registry = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&contents)?,
            Some("json") => Self::from_json_str(&contents)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        debug!(path = %path.display(), chains = registry.len(), "loaded chain config");
        Ok(registry)
    }

    /// Look up a chain by name.
    pub fn get(&self, name: &str) -> Result<&ChainDescriptor, ConfigError> {
        self.chains
            .get(name)
            .ok_or_else(|| ConfigError::ChainNotFound(name.to_string()))
    }

    /// Look up a chain by omniverse chain id.
    pub fn by_chain_id(&self, chain_id: u32) -> Option<&ChainDescriptor> {
        self.chains.values().find(|d| d.chain_id == chain_id)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    fn from_named(chains: BTreeMap<String, ChainDescriptor>) -> Self {
        let chains = chains
            .into_iter()
            .map(|(name, mut descriptor)| {
                descriptor.name = name.clone();
                (name, descriptor)
            })
            .collect();
        Self { chains }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
[chains.goerli]
chain_id = 1
rpc_endpoint = "https://rpc.goerli.example"
contract_address = "0x0101010101010101010101010101010101010101"
cooldown_seconds = 10
network_id = 5

[chains.bsc]
chain_id = 2
rpc_endpoint = "https://rpc.bsc.example"
contract_address = "0x0202020202020202020202020202020202020202"
"#;

    const LEGACY_JSON: &str = r#"{
    "GOERLI": {
        "nodeAddress": "https://rpc.goerli.example",
        "chainId": 5,
        "omniverseChainId": 1,
        "coolingDown": 10,
        "skywalkerNonFungibleAddress": "0x0101010101010101010101010101010101010101"
    }
}"#;

    #[test]
    fn test_from_toml() {
        let registry = ChainRegistry::from_toml_str(TOML).unwrap();
        assert_eq!(registry.len(), 2);

        let goerli = registry.get("goerli").unwrap();
        assert_eq!(goerli.name, "goerli");
        assert_eq!(goerli.chain_id, 1);
        assert_eq!(goerli.cooldown_seconds, 10);
        assert_eq!(goerli.network_id, Some(5));
        assert_eq!(goerli.contract_address, Address::from_bytes([1; 20]));

        let bsc = registry.get("bsc").unwrap();
        assert_eq!(bsc.cooldown_seconds, 0);
        assert_eq!(bsc.network_id, None);
    }

    #[test]
    fn test_legacy_json() {
        let registry = ChainRegistry::from_json_str(LEGACY_JSON).unwrap();
        let goerli = registry.get("GOERLI").unwrap();
        assert_eq!(goerli.chain_id, 1);
        assert_eq!(goerli.network_id, Some(5));
        assert_eq!(goerli.cooldown_seconds, 10);
        assert_eq!(goerli.rpc_endpoint, "https://rpc.goerli.example");
    }

    #[test]
    fn test_chain_not_found() {
        let registry = ChainRegistry::from_toml_str(TOML).unwrap();
        assert!(matches!(
            registry.get("polygon"),
            Err(ConfigError::ChainNotFound(name)) if name == "polygon"
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let d = ChainDescriptor::new("a", 1, "http://a", Address::ZERO);
        let result = ChainRegistry::from_descriptors([d.clone(), d]);
        assert!(matches!(result, Err(ConfigError::DuplicateChain(_))));
    }

    #[test]
    fn test_by_chain_id() {
        let registry = ChainRegistry::from_toml_str(TOML).unwrap();
        assert_eq!(registry.by_chain_id(2).unwrap().name, "bsc");
        assert!(registry.by_chain_id(9).is_none());
    }

    #[test]
    fn test_bad_address_rejected() {
        let toml = r#"
[chains.x]
chain_id = 1
rpc_endpoint = "http://x"
contract_address = "0x1234"
"#;
        assert!(matches!(
            ChainRegistry::from_toml_str(toml),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();

        let toml_path = dir.path().join("chains.toml");
        fs::write(&toml_path, TOML).unwrap();
        assert_eq!(ChainRegistry::load(&toml_path).unwrap().len(), 2);

        let json_path = dir.path().join("chains.json");
        fs::write(&json_path, LEGACY_JSON).unwrap();
        assert_eq!(ChainRegistry::load(&json_path).unwrap().len(), 1);

        let other = dir.path().join("chains.yaml");
        fs::write(&other, "").unwrap();
        assert!(matches!(
            ChainRegistry::load(&other),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
