//! Proptest generators for property-based testing.

use proptest::prelude::*;

use omniverse_core::{
    Address, OmniverseTransaction, OpCode, Operation, SecretKey, TokenId, TransactionBuilder,
};

/// Generate a random valid secret key.
///
/// Zero and values at or above the curve order are rejected by the
/// constructor, so those seeds are filtered out.
pub fn secret_key() -> impl Strategy<Value = SecretKey> {
    any::<[u8; 32]>().prop_filter_map("not a valid scalar", |bytes| {
        SecretKey::from_bytes(&bytes).ok()
    })
}

/// Generate a random 20-byte address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a token id that fits the 32-byte slot.
pub fn token_id() -> impl Strategy<Value = TokenId> {
    prop::collection::vec(any::<u8>(), 0..=32).prop_map(|bytes| TokenId::from_be_bytes(&bytes))
}

/// Generate a token id too wide for the 32-byte slot.
pub fn oversized_token_id() -> impl Strategy<Value = TokenId> {
    (1u8..=u8::MAX, prop::collection::vec(any::<u8>(), 32..=40)).prop_map(|(lead, rest)| {
        let mut bytes = vec![lead];
        bytes.extend(rest);
        TokenId::from_be_bytes(&bytes)
    })
}

/// Generate an opcode.
pub fn opcode() -> impl Strategy<Value = OpCode> {
    prop_oneof![Just(OpCode::Transfer), Just(OpCode::Mint), Just(OpCode::Burn)]
}

/// Generate a well-formed operation.
pub fn operation() -> impl Strategy<Value = Operation> {
    (opcode(), address(), token_id())
        .prop_map(|(opcode, to, token)| Operation::from_parts(opcode, to.into(), token))
}

/// Generate a nonce.
pub fn nonce() -> impl Strategy<Value = u128> {
    prop_oneof![0u128..1_000, any::<u128>()]
}

/// Parameters for generating a transaction.
#[derive(Debug, Clone)]
pub struct TxParams {
    pub key: SecretKey,
    pub nonce: u128,
    pub chain_id: u32,
    pub contract: Address,
    pub operation: Operation,
}

impl Arbitrary for TxParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (secret_key(), nonce(), any::<u32>(), address(), operation())
            .prop_map(|(key, nonce, chain_id, contract, operation)| TxParams {
                key,
                nonce,
                chain_id,
                contract,
                operation,
            })
            .boxed()
    }
}

/// Build and sign a transaction from parameters.
pub fn transaction_from_params(params: &TxParams) -> OmniverseTransaction {
    TransactionBuilder::new(params.chain_id, params.contract, params.key.public_key())
        .nonce(params.nonce)
        .operation(params.operation.clone())
        .sign(&params.key)
        .expect("generated operations fit the canonical layout")
}
