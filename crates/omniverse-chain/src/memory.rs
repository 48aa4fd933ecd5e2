//! In-memory chains.
//!
//! [`MemoryChain`] models one deployment of the omniverse non-fungible
//! contract: per-account transaction logs, the omniverse ownership state that
//! updates as soon as a transaction is accepted, and the local ownership
//! state that only updates once the transaction's cooling-down period has
//! passed and it is executed.
//!
//! Submissions are checked in the order the contract checks them:
//! origin membership, nonce, signature, then the operation itself.
//!
//! Used by tests and by anything that needs a chain without a node.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use omniverse_core::{
    verify_transaction, Address, OmniverseTransaction, Operation, PublicKey, SecretKey, TokenId,
};
use tokio::time::Instant;
use tracing::debug;

use crate::config::ChainDescriptor;
use crate::error::{ChainError, Result};
use crate::traits::{
    AdminCall, AuxQuery, AuxValue, ChainClient, ChainConnector, DelayedTx, Member,
};

/// An injected submission failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The contract reverts with this reason.
    Revert(String),
    /// The node is unreachable.
    Transient(String),
}

/// One attempted submission, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub sender: PublicKey,
    pub nonce: u128,
    pub accepted: bool,
}

struct DelayedEntry {
    tx: OmniverseTransaction,
    queued_at: Instant,
}

#[derive(Default)]
struct ChainState {
    /// Accepted transactions per account, indexed by nonce.
    logs: HashMap<PublicKey, Vec<OmniverseTransaction>>,
    omniverse_owners: HashMap<TokenId, Address>,
    local_owners: HashMap<TokenId, Address>,
    delayed: VecDeque<DelayedEntry>,
    members: Vec<Member>,
    base_uri: String,
    cooling_down: u64,
    failures: HashMap<u128, Failure>,
    submissions: Vec<Submission>,
    latency: Option<Duration>,
}

/// One chain held in memory.
pub struct MemoryChain {
    descriptor: ChainDescriptor,
    owner: PublicKey,
    inner: RwLock<ChainState>,
}

impl MemoryChain {
    /// Create a chain whose contract is owned by `owner`.
    ///
    /// The cooling-down time starts at the descriptor's value.
    pub fn new(descriptor: ChainDescriptor, owner: PublicKey) -> Self {
        let state = ChainState {
            cooling_down: descriptor.cooldown_seconds,
            ..ChainState::default()
        };
        Self {
            descriptor,
            owner,
            inner: RwLock::new(state),
        }
    }

    /// Fail the next submission carrying `nonce`.
    pub fn fail_submission(&self, nonce: u128, failure: Failure) {
        self.inner.write().unwrap().failures.insert(nonce, failure);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.inner.write().unwrap().latency = latency;
    }

    /// Every submission attempted so far.
    pub fn submissions(&self) -> Vec<Submission> {
        self.inner.read().unwrap().submissions.clone()
    }

    /// Nonces of the accepted submissions, in order.
    pub fn accepted_nonces(&self) -> Vec<u128> {
        self.inner
            .read()
            .unwrap()
            .submissions
            .iter()
            .filter(|s| s.accepted)
            .map(|s| s.nonce)
            .collect()
    }

    pub fn clear_submissions(&self) {
        self.inner.write().unwrap().submissions.clear();
    }

    /// The full log of `account`.
    pub fn transactions(&self, account: &PublicKey) -> Vec<OmniverseTransaction> {
        self.inner
            .read()
            .unwrap()
            .logs
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    pub fn base_uri(&self) -> String {
        self.inner.read().unwrap().base_uri.clone()
    }

    async fn simulate_latency(&self) {
        let latency = self.inner.read().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn revert(&self, reason: impl Into<String>) -> ChainError {
        let reason = reason.into();
        debug!(chain = %self.descriptor.name, %reason, "revert");
        ChainError::Reverted {
            chain: self.descriptor.name.clone(),
            reason,
        }
    }

    fn is_local_origin(&self, tx: &OmniverseTransaction) -> bool {
        tx.chain_id() == self.descriptor.chain_id
            && *tx.initiating_contract() == self.descriptor.contract_address
    }

    /// Run every check and apply the transaction.
    fn accept(&self, state: &mut ChainState, tx: &OmniverseTransaction) -> Result<()> {
        if let Some(failure) = state.failures.remove(&tx.nonce()) {
            return Err(match failure {
                Failure::Revert(reason) => self.revert(reason),
                Failure::Transient(reason) => ChainError::Transient {
                    chain: self.descriptor.name.clone(),
                    reason,
                },
            });
        }

        if !self.is_local_origin(tx) {
            let origin = Member::new(tx.chain_id(), *tx.initiating_contract());
            if !state.members.contains(&origin) {
                return Err(self.revert("unknown member"));
            }
        }

        let expected = state.logs.get(tx.sender()).map_or(0, |log| log.len() as u128);
        if tx.nonce() != expected {
            return Err(self.revert("nonce mismatch"));
        }

        if verify_transaction(tx).is_err() {
            return Err(self.revert("signature error"));
        }

        self.apply_omniverse(state, tx)?;

        state.logs.entry(*tx.sender()).or_default().push(tx.clone());
        if state.cooling_down == 0 {
            apply_local(state, tx);
        } else {
            state.delayed.push_back(DelayedEntry {
                tx: tx.clone(),
                queued_at: Instant::now(),
            });
        }
        Ok(())
    }

    fn apply_omniverse(&self, state: &mut ChainState, tx: &OmniverseTransaction) -> Result<()> {
        let sender = tx.sender().fragment();
        let counterparty = counterparty_address(tx.operation())
            .ok_or_else(|| self.revert("invalid address"))?;
        let token_id = tx.operation().token_id();

        match tx.operation() {
            Operation::Mint { .. } => {
                if *tx.sender() != self.owner {
                    return Err(self.revert("only owner can mint"));
                }
                if state.omniverse_owners.contains_key(token_id) {
                    return Err(self.revert("token already exists"));
                }
                state.omniverse_owners.insert(token_id.clone(), counterparty);
            }
            Operation::Transfer { .. } => {
                match state.omniverse_owners.get(token_id) {
                    None => return Err(self.revert("token not exist")),
                    Some(owner) if *owner != sender => {
                        return Err(self.revert("not token owner"))
                    }
                    Some(_) => {}
                }
                state.omniverse_owners.insert(token_id.clone(), counterparty);
            }
            Operation::Burn { .. } => {
                match state.omniverse_owners.get(token_id) {
                    None => return Err(self.revert("token not exist")),
                    Some(owner) if *owner != sender || counterparty != sender => {
                        return Err(self.revert("not token owner"))
                    }
                    Some(_) => {}
                }
                state.omniverse_owners.remove(token_id);
            }
        }
        Ok(())
    }

    fn ready_entry(&self, state: &ChainState) -> Option<DelayedTx> {
        let entry = state.delayed.front()?;
        let cooling_down = Duration::from_secs(state.cooling_down);
        (entry.queued_at + cooling_down <= Instant::now()).then(|| DelayedTx {
            sender: *entry.tx.sender(),
            nonce: entry.tx.nonce(),
        })
    }
}

fn counterparty_address(operation: &Operation) -> Option<Address> {
    Address::try_from(operation.counterparty().as_ref()).ok()
}

fn apply_local(state: &mut ChainState, tx: &OmniverseTransaction) {
    let token_id = tx.operation().token_id().clone();
    match (tx.operation(), counterparty_address(tx.operation())) {
        (Operation::Mint { .. } | Operation::Transfer { .. }, Some(to)) => {
            state.local_owners.insert(token_id, to);
        }
        (Operation::Burn { .. }, _) => {
            state.local_owners.remove(&token_id);
        }
        _ => {}
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }

    async fn get_nonce(&self, account: &PublicKey) -> Result<u128> {
        self.simulate_latency().await;
        let inner = self.inner.read().unwrap();
        Ok(inner.logs.get(account).map_or(0, |log| log.len() as u128))
    }

    async fn get_transaction(
        &self,
        account: &PublicKey,
        nonce: u128,
    ) -> Result<OmniverseTransaction> {
        self.simulate_latency().await;
        let inner = self.inner.read().unwrap();
        usize::try_from(nonce)
            .ok()
            .and_then(|n| inner.logs.get(account)?.get(n))
            .cloned()
            .ok_or_else(|| ChainError::TransactionNotFound {
                chain: self.descriptor.name.clone(),
                nonce,
            })
    }

    async fn submit(&self, tx: &OmniverseTransaction) -> Result<()> {
        self.simulate_latency().await;
        let mut inner = self.inner.write().unwrap();
        let result = self.accept(&mut inner, tx);
        inner.submissions.push(Submission {
            sender: *tx.sender(),
            nonce: tx.nonce(),
            accepted: result.is_ok(),
        });
        if result.is_ok() {
            debug!(chain = %self.descriptor.name, nonce = tx.nonce(), "accepted");
        }
        result
    }

    async fn read_aux(&self, query: &AuxQuery) -> Result<AuxValue> {
        self.simulate_latency().await;
        let inner = self.inner.read().unwrap();
        let value = match query {
            AuxQuery::OmniverseBalanceOf(pk) => {
                let holder = pk.fragment();
                AuxValue::Uint(count_owned(&inner.omniverse_owners, &holder))
            }
            AuxQuery::BalanceOf(address) => {
                AuxValue::Uint(count_owned(&inner.local_owners, address))
            }
            AuxQuery::OwnerOf(token_id) => AuxValue::Address(
                inner
                    .local_owners
                    .get(token_id)
                    .copied()
                    .ok_or_else(|| self.revert("token not exist"))?,
            ),
            AuxQuery::OmniverseOwnerOf(token_id) => AuxValue::Address(
                inner
                    .omniverse_owners
                    .get(token_id)
                    .copied()
                    .ok_or_else(|| self.revert("token not exist"))?,
            ),
            AuxQuery::Members => AuxValue::Members(inner.members.clone()),
            AuxQuery::Owner => AuxValue::Address(self.owner.fragment()),
            AuxQuery::DelayedTxCount => AuxValue::Uint(inner.delayed.len() as u128),
            AuxQuery::ExecutableDelayedTx => AuxValue::DelayedTx(self.ready_entry(&inner)),
            AuxQuery::CoolingDownTime => AuxValue::Uint(u128::from(inner.cooling_down)),
        };
        Ok(value)
    }

    async fn call_admin(&self, signer: &SecretKey, call: &AdminCall) -> Result<()> {
        self.simulate_latency().await;
        if signer.public_key() != self.owner {
            return Err(self.revert("caller is not the owner"));
        }

        let mut inner = self.inner.write().unwrap();
        match call {
            AdminCall::SetCoolingDownTime(seconds) => inner.cooling_down = *seconds,
            AdminCall::SetBaseUri(uri) => inner.base_uri = uri.clone(),
            AdminCall::SetMembers(members) => inner.members = members.clone(),
            AdminCall::TriggerExecution => {
                if self.ready_entry(&inner).is_none() {
                    return Err(self.revert("no executable transaction"));
                }
                if let Some(entry) = inner.delayed.pop_front() {
                    apply_local(&mut inner, &entry.tx);
                }
            }
        }
        debug!(chain = %self.descriptor.name, method = call.method(), "admin call");
        Ok(())
    }
}

fn count_owned(owners: &HashMap<TokenId, Address>, holder: &Address) -> u128 {
    owners.values().filter(|owner| *owner == holder).count() as u128
}

// ─────────────────────────────────────────────────────────────────────────────
// Network
// ─────────────────────────────────────────────────────────────────────────────

/// A set of in-memory chains, reachable by omniverse chain id.
#[derive(Default)]
pub struct MemoryNetwork {
    chains: RwLock<HashMap<u32, Arc<MemoryChain>>>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deploy a chain for `descriptor`, replacing any chain with its id.
    pub fn add_chain(&self, descriptor: ChainDescriptor, owner: PublicKey) -> Arc<MemoryChain> {
        let chain = Arc::new(MemoryChain::new(descriptor, owner));
        self.chains
            .write()
            .unwrap()
            .insert(chain.descriptor.chain_id, Arc::clone(&chain));
        chain
    }

    pub fn chain(&self, chain_id: u32) -> Option<Arc<MemoryChain>> {
        self.chains.read().unwrap().get(&chain_id).cloned()
    }
}

#[async_trait]
impl ChainConnector for MemoryNetwork {
    async fn connect(&self, descriptor: &ChainDescriptor) -> Result<Arc<dyn ChainClient>> {
        match self.chain(descriptor.chain_id) {
            Some(chain) => Ok(chain),
            None => Err(ChainError::Transient {
                chain: descriptor.name.clone(),
                reason: format!("no chain reachable at {}", descriptor.rpc_endpoint),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniverse_core::TransactionBuilder;

    const CONTRACT: Address = Address::from_bytes([0xcc; 20]);

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_bytes(&[byte; 32]).unwrap()
    }

    fn chain(owner: &SecretKey, cooldown: u64) -> MemoryChain {
        let descriptor = ChainDescriptor::new("a", 1, "mem://a", CONTRACT).with_cooldown(cooldown);
        MemoryChain::new(descriptor, owner.public_key())
    }

    fn signed(key: &SecretKey, nonce: u128, operation: Operation) -> OmniverseTransaction {
        TransactionBuilder::new(1, CONTRACT, key.public_key())
            .nonce(nonce)
            .operation(operation)
            .sign(key)
            .unwrap()
    }

    fn reason(err: ChainError) -> String {
        match err {
            ChainError::Reverted { reason, .. } => reason,
            other => panic!("expected revert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mint_and_transfer() {
        let owner = key(1);
        let bob = key(2);
        let chain = chain(&owner, 0);

        chain
            .submit(&signed(&owner, 0, Operation::mint(owner.address(), 7u64)))
            .await
            .unwrap();
        chain
            .submit(&signed(&owner, 1, Operation::transfer(bob.address(), 7u64)))
            .await
            .unwrap();

        assert_eq!(chain.get_nonce(&owner.public_key()).await.unwrap(), 2);
        let owner_of = chain
            .read_aux(&AuxQuery::OmniverseOwnerOf(7u64.into()))
            .await
            .unwrap();
        assert_eq!(owner_of, AuxValue::Address(bob.address()));
        // Zero cooling-down: local state follows immediately.
        let local = chain.read_aux(&AuxQuery::OwnerOf(7u64.into())).await.unwrap();
        assert_eq!(local, AuxValue::Address(bob.address()));
        let balance = chain
            .read_aux(&AuxQuery::OmniverseBalanceOf(bob.public_key()))
            .await
            .unwrap();
        assert_eq!(balance, AuxValue::Uint(1));
    }

    #[tokio::test]
    async fn test_nonce_mismatch() {
        let owner = key(1);
        let chain = chain(&owner, 0);
        let err = chain
            .submit(&signed(&owner, 1, Operation::mint(owner.address(), 1u64)))
            .await
            .unwrap_err();
        assert_eq!(reason(err), "nonce mismatch");
        assert_eq!(chain.get_nonce(&owner.public_key()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_signature() {
        let owner = key(1);
        let chain = chain(&owner, 0);
        let tx = signed(&owner, 0, Operation::mint(owner.address(), 1u64));
        let forged_sig = key(9).sign_prehash(&tx.signing_hash().unwrap()).unwrap();
        let forged = OmniverseTransaction::from_parts(tx.body().clone(), forged_sig);
        assert_eq!(reason(chain.submit(&forged).await.unwrap_err()), "signature error");
    }

    #[tokio::test]
    async fn test_operation_rules() {
        let owner = key(1);
        let bob = key(2);
        let chain = chain(&owner, 0);

        let err = chain
            .submit(&signed(&bob, 0, Operation::mint(bob.address(), 1u64)))
            .await
            .unwrap_err();
        assert_eq!(reason(err), "only owner can mint");

        let err = chain
            .submit(&signed(&bob, 0, Operation::transfer(owner.address(), 1u64)))
            .await
            .unwrap_err();
        assert_eq!(reason(err), "token not exist");

        chain
            .submit(&signed(&owner, 0, Operation::mint(owner.address(), 1u64)))
            .await
            .unwrap();
        let err = chain
            .submit(&signed(&bob, 0, Operation::burn(bob.address(), 1u64)))
            .await
            .unwrap_err();
        assert_eq!(reason(err), "not token owner");

        chain
            .submit(&signed(&owner, 1, Operation::burn(owner.address(), 1u64)))
            .await
            .unwrap();
        assert!(chain
            .read_aux(&AuxQuery::OmniverseOwnerOf(1u64.into()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_foreign_origin_requires_membership() {
        let owner = key(1);
        let chain = chain(&owner, 0);
        let foreign = Address::from_bytes([0xdd; 20]);
        let tx = TransactionBuilder::new(2, foreign, owner.public_key())
            .operation(Operation::mint(owner.address(), 1u64))
            .sign(&owner)
            .unwrap();

        assert_eq!(reason(chain.submit(&tx).await.unwrap_err()), "unknown member");

        chain
            .call_admin(&owner, &AdminCall::SetMembers(vec![Member::new(2, foreign)]))
            .await
            .unwrap();
        chain.submit(&tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let owner = key(1);
        let chain = chain(&owner, 0);
        let tx = signed(&owner, 0, Operation::mint(owner.address(), 1u64));

        chain.fail_submission(0, Failure::Transient("down".into()));
        let err = chain.submit(&tx).await.unwrap_err();
        assert!(err.is_transient());

        chain.submit(&tx).await.unwrap();
        let accepted: Vec<bool> = chain.submissions().iter().map(|s| s.accepted).collect();
        assert_eq!(accepted, vec![false, true]);
        assert_eq!(chain.accepted_nonces(), vec![0]);
    }

    #[tokio::test]
    async fn test_get_transaction() {
        let owner = key(1);
        let chain = chain(&owner, 0);
        let tx = signed(&owner, 0, Operation::mint(owner.address(), 1u64));
        chain.submit(&tx).await.unwrap();

        assert_eq!(chain.get_transaction(&owner.public_key(), 0).await.unwrap(), tx);
        assert!(matches!(
            chain.get_transaction(&owner.public_key(), 1).await,
            Err(ChainError::TransactionNotFound { nonce: 1, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_execution() {
        let owner = key(1);
        let chain = chain(&owner, 10);
        chain
            .submit(&signed(&owner, 0, Operation::mint(owner.address(), 5u64)))
            .await
            .unwrap();

        assert_eq!(
            chain.read_aux(&AuxQuery::DelayedTxCount).await.unwrap(),
            AuxValue::Uint(1)
        );
        assert_eq!(
            chain.read_aux(&AuxQuery::ExecutableDelayedTx).await.unwrap(),
            AuxValue::DelayedTx(None)
        );
        assert!(chain.read_aux(&AuxQuery::OwnerOf(5u64.into())).await.is_err());
        let err = chain
            .call_admin(&owner, &AdminCall::TriggerExecution)
            .await
            .unwrap_err();
        assert_eq!(reason(err), "no executable transaction");

        tokio::time::advance(Duration::from_secs(10)).await;

        assert_eq!(
            chain.read_aux(&AuxQuery::ExecutableDelayedTx).await.unwrap(),
            AuxValue::DelayedTx(Some(DelayedTx {
                sender: owner.public_key(),
                nonce: 0
            }))
        );
        chain
            .call_admin(&owner, &AdminCall::TriggerExecution)
            .await
            .unwrap();
        assert_eq!(
            chain.read_aux(&AuxQuery::OwnerOf(5u64.into())).await.unwrap(),
            AuxValue::Address(owner.address())
        );
        assert_eq!(
            chain.read_aux(&AuxQuery::BalanceOf(owner.address())).await.unwrap(),
            AuxValue::Uint(1)
        );
        assert_eq!(
            chain.read_aux(&AuxQuery::DelayedTxCount).await.unwrap(),
            AuxValue::Uint(0)
        );
    }

    #[tokio::test]
    async fn test_admin_calls() {
        let owner = key(1);
        let chain = chain(&owner, 0);

        let err = chain
            .call_admin(&key(2), &AdminCall::SetBaseUri("x".into()))
            .await
            .unwrap_err();
        assert_eq!(reason(err), "caller is not the owner");

        chain
            .call_admin(&owner, &AdminCall::SetCoolingDownTime(30))
            .await
            .unwrap();
        chain
            .call_admin(&owner, &AdminCall::SetBaseUri("ipfs://base/".into()))
            .await
            .unwrap();
        assert_eq!(
            chain.read_aux(&AuxQuery::CoolingDownTime).await.unwrap(),
            AuxValue::Uint(30)
        );
        assert_eq!(chain.base_uri(), "ipfs://base/");
        assert_eq!(
            chain.read_aux(&AuxQuery::Owner).await.unwrap(),
            AuxValue::Address(owner.address())
        );
    }

    #[tokio::test]
    async fn test_network_connect() {
        let owner = key(1);
        let network = MemoryNetwork::new();
        let descriptor = ChainDescriptor::new("a", 1, "mem://a", CONTRACT);
        network.add_chain(descriptor.clone(), owner.public_key());

        let client = network.connect(&descriptor).await.unwrap();
        assert_eq!(client.name(), "a");

        let missing = ChainDescriptor::new("b", 2, "mem://b", CONTRACT);
        assert!(network.connect(&missing).await.err().unwrap().is_transient());
    }
}
