//! Golden test vectors for the canonical encoding.
//!
//! Every vector is signed by private key 1, whose address is well known, so
//! the expected bytes can be written out field by field.

use serde::Serialize;

use omniverse_core::{
    Address, OmniverseTransaction, OpCode, Operation, SecretKey, TokenId, TransactionBuilder,
};

/// Address of private key 1.
pub const KEY_ONE_ADDRESS: [u8; 20] = [
    0x7e, 0x5f, 0x45, 0x52, 0x09, 0x1a, 0x69, 0x12, 0x5d, 0x5d, 0xfc, 0xb7, 0xb8, 0xc2, 0x65, 0x90,
    0x29, 0x39, 0x5b, 0xdf,
];

const KEY_ONE: [u8; 32] = {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;
    bytes
};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Signing key scalar.
    pub secret_key: [u8; 32],
    pub nonce: u128,
    pub chain_id: u32,
    /// Initiating contract.
    pub contract: [u8; 20],
    pub opcode: OpCode,
    pub counterparty: [u8; 20],
    /// Big-endian token id, any length up to 32 bytes.
    pub token_id: &'static [u8],
    /// Expected canonical bytes (hex).
    pub expected_encoding: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "mint token 1 to self",
            secret_key: KEY_ONE,
            nonce: 0,
            chain_id: 1,
            contract: [0x11; 20],
            opcode: OpCode::Mint,
            counterparty: KEY_ONE_ADDRESS,
            token_id: &[0x01],
            expected_encoding: concat!(
                "00000000000000000000000000000000",
                "00000001",
                "1111111111111111111111111111111111111111",
                "7e5f4552091a69125d5dfcb7b8c2659029395bdf",
                "01",
                "7e5f4552091a69125d5dfcb7b8c2659029395bdf",
                "0000000000000000000000000000000000000000000000000000000000000001",
            ),
        },
        GoldenVector {
            name: "transfer with a nonce past u64",
            secret_key: KEY_ONE,
            nonce: 1 << 64,
            chain_id: 97,
            contract: [0xab; 20],
            opcode: OpCode::Transfer,
            counterparty: [0x22; 20],
            token_id: &[0x01, 0x00],
            expected_encoding: concat!(
                "00000000000000010000000000000000",
                "00000061",
                "abababababababababababababababababababab",
                "7e5f4552091a69125d5dfcb7b8c2659029395bdf",
                "00",
                "2222222222222222222222222222222222222222",
                "0000000000000000000000000000000000000000000000000000000000000100",
            ),
        },
        GoldenVector {
            name: "burn with every width saturated",
            secret_key: KEY_ONE,
            nonce: u128::MAX,
            chain_id: u32::MAX,
            contract: [0x00; 20],
            opcode: OpCode::Burn,
            counterparty: KEY_ONE_ADDRESS,
            token_id: &[0xff; 32],
            expected_encoding: concat!(
                "ffffffffffffffffffffffffffffffff",
                "ffffffff",
                "0000000000000000000000000000000000000000",
                "7e5f4552091a69125d5dfcb7b8c2659029395bdf",
                "02",
                "7e5f4552091a69125d5dfcb7b8c2659029395bdf",
                "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
            ),
        },
        GoldenVector {
            name: "mint token zero",
            secret_key: KEY_ONE,
            nonce: 7,
            chain_id: 2,
            contract: [0x02; 20],
            opcode: OpCode::Mint,
            counterparty: [0x33; 20],
            token_id: &[],
            expected_encoding: concat!(
                "00000000000000000000000000000007",
                "00000002",
                "0202020202020202020202020202020202020202",
                "7e5f4552091a69125d5dfcb7b8c2659029395bdf",
                "01",
                "3333333333333333333333333333333333333333",
                "0000000000000000000000000000000000000000000000000000000000000000",
            ),
        },
    ]
}

/// Build and sign the transaction a vector describes.
pub fn generate_transaction_from_vector(vector: &GoldenVector) -> OmniverseTransaction {
    let key = SecretKey::from_bytes(&vector.secret_key).expect("vector key is a valid scalar");
    let operation = Operation::from_parts(
        vector.opcode,
        Address::from_bytes(vector.counterparty).into(),
        TokenId::from_be_bytes(vector.token_id),
    );

    TransactionBuilder::new(
        vector.chain_id,
        Address::from_bytes(vector.contract),
        key.public_key(),
    )
    .nonce(vector.nonce)
    .operation(operation)
    .sign(&key)
    .expect("vector fits the canonical layout")
}

/// Check every vector against its expected encoding.
///
/// Returns `(name, matches, actual hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let tx = generate_transaction_from_vector(v);
            let actual = tx
                .body()
                .canonical_bytes()
                .map(hex::encode)
                .unwrap_or_default();
            (v.name.to_string(), actual == v.expected_encoding, actual)
        })
        .collect()
}

#[derive(Serialize)]
struct VectorRecord {
    name: &'static str,
    secret_key: String,
    nonce: String,
    chain_id: u32,
    contract: String,
    opcode: u8,
    counterparty: String,
    token_id: String,
    encoding: &'static str,
    signing_hash: String,
    signature: String,
}

/// All vectors as JSON, with their signing hashes and signatures, for
/// checking verifiers written elsewhere.
///
/// Integers wider than 53 bits are written as decimal strings.
pub fn vectors_json() -> serde_json::Result<String> {
    let records: Vec<VectorRecord> = all_vectors()
        .into_iter()
        .map(|v| {
            let tx = generate_transaction_from_vector(&v);
            VectorRecord {
                name: v.name,
                secret_key: hex::encode(v.secret_key),
                nonce: v.nonce.to_string(),
                chain_id: v.chain_id,
                contract: hex::encode(v.contract),
                opcode: v.opcode.to_u8(),
                counterparty: hex::encode(v.counterparty),
                token_id: TokenId::from_be_bytes(v.token_id).to_dec_string(),
                encoding: v.expected_encoding,
                signing_hash: tx
                    .signing_hash()
                    .map(|h| h.to_hex())
                    .unwrap_or_default(),
                signature: tx.signature().to_hex(),
            }
        })
        .collect();
    serde_json::to_string_pretty(&records)
}
