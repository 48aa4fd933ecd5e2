//! Sessions: one origin chain, one client, one signing key.
//!
//! A session is the explicit context every operation runs in. It holds no
//! nonce; each operation reads the chain's nonce immediately before using
//! it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use omniverse_chain::{
    call_with_timeout, AdminCall, AuxQuery, AuxValue, ChainClient, ChainDescriptor, ChainError,
    DelayedTx, Member,
};
use omniverse_core::{
    Address, OmniverseTransaction, OpCode, Operation, PublicKey, SecretKey, TokenId,
    TransactionBuilder,
};
use tracing::{debug, info};

use crate::error::{RelayError, Result};

/// Summary of an account and the contract on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountOverview {
    pub nonce: u128,
    pub omniverse_balance: u128,
    pub local_balance: u128,
    pub members: Vec<Member>,
    pub contract_owner: Address,
    pub delayed_tx_count: u128,
    pub executable_delayed_tx: Option<DelayedTx>,
    pub cooling_down_time: u64,
}

/// A connected chain plus the key operations are signed with.
pub struct Session {
    descriptor: ChainDescriptor,
    client: Arc<dyn ChainClient>,
    key: SecretKey,
    call_timeout: Duration,
}

impl Session {
    pub(crate) fn new(
        descriptor: ChainDescriptor,
        client: Arc<dyn ChainClient>,
        key: SecretKey,
        call_timeout: Duration,
    ) -> Self {
        Self {
            descriptor,
            client,
            key,
            call_timeout,
        }
    }

    pub fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    /// The account operations are signed as.
    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Mint `token_id` to `to`.
    pub async fn mint(
        &self,
        to: impl Into<Bytes>,
        token_id: impl Into<TokenId>,
    ) -> Result<OmniverseTransaction> {
        self.submit_operation(Operation::mint(to, token_id)).await
    }

    /// Transfer `token_id` to `to`.
    pub async fn transfer(
        &self,
        to: impl Into<Bytes>,
        token_id: impl Into<TokenId>,
    ) -> Result<OmniverseTransaction> {
        self.submit_operation(Operation::transfer(to, token_id)).await
    }

    /// Burn `token_id`, held by `from`.
    pub async fn burn(
        &self,
        from: impl Into<Bytes>,
        token_id: impl Into<TokenId>,
    ) -> Result<OmniverseTransaction> {
        self.submit_operation(Operation::burn(from, token_id)).await
    }

    /// Build an envelope at the chain's current nonce and sign it.
    ///
    /// Nothing is submitted.
    pub async fn build(&self, operation: Operation) -> Result<OmniverseTransaction> {
        let sender = self.key.public_key();
        let nonce = self.call(None, self.client.get_nonce(&sender)).await?;

        let tx = TransactionBuilder::new(
            self.descriptor.chain_id,
            self.descriptor.contract_address,
            sender,
        )
        .nonce(nonce)
        .operation(operation)
        .sign(&self.key)?;

        debug!(chain = %self.descriptor.name, nonce, "built transaction");
        Ok(tx)
    }

    /// Build, sign and submit to this session's chain.
    ///
    /// A failed submission leaves no local state behind; the next call reads
    /// the nonce again.
    pub async fn submit_operation(&self, operation: Operation) -> Result<OmniverseTransaction> {
        let opcode = operation.opcode();
        let tx = self.build(operation).await?;
        let nonce = Some(tx.nonce());

        self.call_raw(self.client.submit(&tx))
            .await
            .map_err(|e| self.submission_error(e, opcode_name(opcode), nonce))?;

        info!(
            chain = %self.descriptor.name,
            nonce = tx.nonce(),
            operation = opcode_name(opcode),
            "submitted transaction"
        );
        Ok(tx)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Next nonce `account` will use on this chain.
    pub async fn nonce(&self, account: &PublicKey) -> Result<u128> {
        self.call(None, self.client.get_nonce(account)).await
    }

    /// A transaction from this chain's log.
    pub async fn transaction(
        &self,
        account: &PublicKey,
        nonce: u128,
    ) -> Result<OmniverseTransaction> {
        self.call(Some(nonce), self.client.get_transaction(account, nonce))
            .await
    }

    pub async fn omniverse_balance_of(&self, account: &PublicKey) -> Result<u128> {
        self.read_uint(AuxQuery::OmniverseBalanceOf(*account)).await
    }

    pub async fn balance_of(&self, address: &Address) -> Result<u128> {
        self.read_uint(AuxQuery::BalanceOf(*address)).await
    }

    pub async fn owner_of(&self, token_id: impl Into<TokenId>) -> Result<Address> {
        self.read_address(AuxQuery::OwnerOf(token_id.into())).await
    }

    pub async fn omniverse_owner_of(&self, token_id: impl Into<TokenId>) -> Result<Address> {
        self.read_address(AuxQuery::OmniverseOwnerOf(token_id.into()))
            .await
    }

    pub async fn members(&self) -> Result<Vec<Member>> {
        let query = AuxQuery::Members;
        let value = self.read(&query).await?;
        value
            .into_members()
            .ok_or_else(|| self.unexpected(&query))
    }

    pub async fn contract_owner(&self) -> Result<Address> {
        self.read_address(AuxQuery::Owner).await
    }

    pub async fn delayed_tx_count(&self) -> Result<u128> {
        self.read_uint(AuxQuery::DelayedTxCount).await
    }

    /// The delayed transaction `trigger_execution` would execute, if any.
    pub async fn executable_delayed_tx(&self) -> Result<Option<DelayedTx>> {
        let query = AuxQuery::ExecutableDelayedTx;
        let value = self.read(&query).await?;
        value
            .into_delayed_tx()
            .ok_or_else(|| self.unexpected(&query))
    }

    pub async fn cooling_down_time(&self) -> Result<u64> {
        let query = AuxQuery::CoolingDownTime;
        let value = self.read_uint(query.clone()).await?;
        u64::try_from(value).map_err(|_| self.unexpected(&query))
    }

    /// Everything an operator usually wants to see about `account`.
    pub async fn account_overview(&self, account: &PublicKey) -> Result<AccountOverview> {
        Ok(AccountOverview {
            nonce: self.nonce(account).await?,
            omniverse_balance: self.omniverse_balance_of(account).await?,
            local_balance: self.balance_of(&account.fragment()).await?,
            members: self.members().await?,
            contract_owner: self.contract_owner().await?,
            delayed_tx_count: self.delayed_tx_count().await?,
            executable_delayed_tx: self.executable_delayed_tx().await?,
            cooling_down_time: self.cooling_down_time().await?,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────

    /// Configure a freshly deployed contract.
    ///
    /// Sets the cooling-down time from the chain descriptor, then the base
    /// URI, then the trusted members.
    pub async fn initialize(&self, base_uri: impl Into<String>, members: Vec<Member>) -> Result<()> {
        self.admin(AdminCall::SetCoolingDownTime(self.descriptor.cooldown_seconds))
            .await?;
        self.admin(AdminCall::SetBaseUri(base_uri.into())).await?;
        self.admin(AdminCall::SetMembers(members)).await?;
        info!(chain = %self.descriptor.name, "contract initialized");
        Ok(())
    }

    /// Execute the oldest delayed transaction that is ready.
    pub async fn trigger_execution(&self) -> Result<()> {
        self.admin(AdminCall::TriggerExecution).await
    }

    async fn admin(&self, call: AdminCall) -> Result<()> {
        let method = call.method();
        self.call_raw(self.client.call_admin(&self.key, &call))
            .await
            .map_err(|e| self.submission_error(e, method, None))?;
        debug!(chain = %self.descriptor.name, method, "admin call");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plumbing
    // ─────────────────────────────────────────────────────────────────────────

    async fn read(&self, query: &AuxQuery) -> Result<AuxValue> {
        self.call(None, self.client.read_aux(query)).await
    }

    async fn read_uint(&self, query: AuxQuery) -> Result<u128> {
        let value = self.read(&query).await?;
        value.as_uint().ok_or_else(|| self.unexpected(&query))
    }

    async fn read_address(&self, query: AuxQuery) -> Result<Address> {
        let value = self.read(&query).await?;
        value.as_address().ok_or_else(|| self.unexpected(&query))
    }

    /// A read with the session's deadline. Transient failures keep their
    /// own variant; anything else is a plain chain error.
    async fn call<T>(
        &self,
        nonce: Option<u128>,
        call: impl Future<Output = omniverse_chain::Result<T>>,
    ) -> Result<T> {
        self.call_raw(call).await.map_err(|e| {
            if e.is_transient() {
                self.transient(e, nonce)
            } else {
                RelayError::Chain(e)
            }
        })
    }

    async fn call_raw<T>(
        &self,
        call: impl Future<Output = omniverse_chain::Result<T>>,
    ) -> omniverse_chain::Result<T> {
        call_with_timeout(&self.descriptor.name, self.call_timeout, call).await
    }

    fn submission_error(
        &self,
        err: ChainError,
        operation: &'static str,
        nonce: Option<u128>,
    ) -> RelayError {
        match err {
            ChainError::Reverted { chain, reason } => RelayError::SubmissionRejected {
                chain,
                account: self.key.public_key(),
                operation,
                nonce,
                reason,
            },
            e if e.is_transient() => self.transient(e, nonce),
            e => RelayError::Chain(e),
        }
    }

    fn transient(&self, source: ChainError, nonce: Option<u128>) -> RelayError {
        RelayError::TransientNetworkFailure {
            chain: self.descriptor.name.clone(),
            nonce,
            source,
        }
    }

    fn unexpected(&self, query: &AuxQuery) -> RelayError {
        RelayError::Chain(ChainError::UnexpectedResponse {
            chain: self.descriptor.name.clone(),
            method: query.method(),
        })
    }
}

fn opcode_name(opcode: OpCode) -> &'static str {
    match opcode {
        OpCode::Transfer => "transfer",
        OpCode::Mint => "mint",
        OpCode::Burn => "burn",
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("chain", &self.descriptor.name)
            .field("account", &self.key.public_key())
            .finish()
    }
}
