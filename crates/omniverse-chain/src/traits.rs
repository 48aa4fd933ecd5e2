//! The chain client interface.

use std::sync::Arc;

use async_trait::async_trait;
use omniverse_core::{Address, OmniverseTransaction, PublicKey, SecretKey, TokenId};
use serde::{Deserialize, Serialize};

use crate::config::ChainDescriptor;
use crate::error::Result;

/// A contract instance trusted as a transaction origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub chain_id: u32,
    pub contract: Address,
}

impl Member {
    pub fn new(chain_id: u32, contract: Address) -> Self {
        Self { chain_id, contract }
    }
}

impl From<&ChainDescriptor> for Member {
    fn from(descriptor: &ChainDescriptor) -> Self {
        Self::new(descriptor.chain_id, descriptor.contract_address)
    }
}

/// A delayed transaction identified by its sender and nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedTx {
    pub sender: PublicKey,
    pub nonce: u128,
}

/// Read-only contract queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxQuery {
    /// Tokens held in omniverse state by an account.
    OmniverseBalanceOf(PublicKey),
    /// Tokens held in local state by an address.
    BalanceOf(Address),
    /// Local owner of a token.
    OwnerOf(TokenId),
    /// Omniverse owner of a token.
    OmniverseOwnerOf(TokenId),
    /// Trusted origins.
    Members,
    /// Contract owner.
    Owner,
    /// Number of queued delayed transactions.
    DelayedTxCount,
    /// The oldest delayed transaction whose cooling-down time has elapsed.
    ExecutableDelayedTx,
    /// Cooling-down time in seconds.
    CoolingDownTime,
}

impl AuxQuery {
    /// Name of the contract method serving this query.
    pub fn method(&self) -> &'static str {
        match self {
            Self::OmniverseBalanceOf(_) => "omniverseBalanceOf",
            Self::BalanceOf(_) => "balanceOf",
            Self::OwnerOf(_) => "ownerOf",
            Self::OmniverseOwnerOf(_) => "omniverseOwnerOf",
            Self::Members => "getMembers",
            Self::Owner => "owner",
            Self::DelayedTxCount => "getDelayedTxCount",
            Self::ExecutableDelayedTx => "getExecutableDelayedTx",
            Self::CoolingDownTime => "cdTime",
        }
    }
}

/// Result of an [`AuxQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxValue {
    Uint(u128),
    Address(Address),
    Members(Vec<Member>),
    DelayedTx(Option<DelayedTx>),
}

impl AuxValue {
    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn into_members(self) -> Option<Vec<Member>> {
        match self {
            Self::Members(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_delayed_tx(self) -> Option<Option<DelayedTx>> {
        match self {
            Self::DelayedTx(d) => Some(d),
            _ => None,
        }
    }
}

/// Owner-only contract calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCall {
    SetCoolingDownTime(u64),
    SetBaseUri(String),
    SetMembers(Vec<Member>),
    /// Execute the oldest delayed transaction that is ready.
    TriggerExecution,
}

impl AdminCall {
    /// Name of the contract method.
    pub fn method(&self) -> &'static str {
        match self {
            Self::SetCoolingDownTime(_) => "setCoolingDownTime",
            Self::SetBaseUri(_) => "setBaseURI",
            Self::SetMembers(_) => "setMembers",
            Self::TriggerExecution => "triggerExecution",
        }
    }
}

/// Access to one chain's omniverse contract.
///
/// Implementations must be thread-safe (Send + Sync). Each call is one
/// round trip; callers never pipeline calls for the same account.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The chain this client talks to.
    fn descriptor(&self) -> &ChainDescriptor;

    /// Chain name, for errors and logs.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Number of transactions accepted from `account`; the next nonce it
    /// will accept.
    async fn get_nonce(&self, account: &PublicKey) -> Result<u128>;

    /// The transaction `account` has at `nonce`.
    async fn get_transaction(&self, account: &PublicKey, nonce: u128)
        -> Result<OmniverseTransaction>;

    /// Submit a signed transaction.
    ///
    /// `Ok` means the chain accepted it; a revert comes back as
    /// [`ChainError::Reverted`](crate::ChainError::Reverted).
    async fn submit(&self, tx: &OmniverseTransaction) -> Result<()>;

    /// Read auxiliary contract state.
    async fn read_aux(&self, query: &AuxQuery) -> Result<AuxValue>;

    /// Issue an admin call signed by `signer`.
    async fn call_admin(&self, signer: &SecretKey, call: &AdminCall) -> Result<()>;
}

/// Opens clients for configured chains.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(&self, descriptor: &ChainDescriptor) -> Result<Arc<dyn ChainClient>>;
}

#[async_trait]
impl<T: ChainConnector + ?Sized> ChainConnector for Arc<T> {
    async fn connect(&self, descriptor: &ChainDescriptor) -> Result<Arc<dyn ChainClient>> {
        (**self).connect(descriptor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        let pk = PublicKey::from_bytes([1; 64]);
        let cases = [
            (AuxQuery::OmniverseBalanceOf(pk), "omniverseBalanceOf"),
            (AuxQuery::BalanceOf(Address::ZERO), "balanceOf"),
            (AuxQuery::OwnerOf(1u64.into()), "ownerOf"),
            (AuxQuery::OmniverseOwnerOf(1u64.into()), "omniverseOwnerOf"),
            (AuxQuery::Members, "getMembers"),
            (AuxQuery::Owner, "owner"),
            (AuxQuery::DelayedTxCount, "getDelayedTxCount"),
            (AuxQuery::ExecutableDelayedTx, "getExecutableDelayedTx"),
            (AuxQuery::CoolingDownTime, "cdTime"),
        ];
        for (query, method) in cases {
            assert_eq!(query.method(), method);
        }

        assert_eq!(AdminCall::SetBaseUri(String::new()).method(), "setBaseURI");
        assert_eq!(AdminCall::SetMembers(vec![]).method(), "setMembers");
        assert_eq!(AdminCall::SetCoolingDownTime(1).method(), "setCoolingDownTime");
        assert_eq!(AdminCall::TriggerExecution.method(), "triggerExecution");
    }

    #[test]
    fn test_aux_value_accessors() {
        assert_eq!(AuxValue::Uint(3).as_uint(), Some(3));
        assert_eq!(AuxValue::Uint(3).as_address(), None);
        assert_eq!(
            AuxValue::Members(vec![Member::new(1, Address::ZERO)]).into_members(),
            Some(vec![Member::new(1, Address::ZERO)])
        );
        assert_eq!(AuxValue::DelayedTx(None).into_delayed_tx(), Some(None));
        assert_eq!(AuxValue::Uint(0).into_delayed_tx(), None);
    }
}
