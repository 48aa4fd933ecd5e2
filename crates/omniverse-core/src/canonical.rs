//! Canonical fixed-width encoding of omniverse transactions.
//!
//! Every chain's verifier rebuilds these bytes and checks the signature over
//! their Keccak-256 digest, so this layout is a wire format:
//!
//! ```text
//! offset  len  field
//!      0   16  nonce                  big-endian, zero-padded
//!     16    4  chain id               big-endian
//!     20   20  initiating contract
//!     40   20  sender fragment        last 20 bytes of keccak256(public key)
//!     60    1  opcode                 0 = transfer, 1 = mint, 2 = burn
//!     61   20  counterparty address
//!     81   32  token id               big-endian, zero-padded
//! ```
//!
//! There is no length prefix, padding or domain separator beyond this.

use bytes::Bytes;

use crate::crypto::Keccak256Hash;
use crate::error::CoreError;
use crate::operation::{OpCode, Operation};
use crate::transaction::UnsignedTransaction;
use crate::types::{Address, TokenId, ADDRESS_LEN};

/// Field widths of the canonical layout.
pub mod layout {
    pub const NONCE_LEN: usize = 16;
    pub const CHAIN_ID_LEN: usize = 4;
    pub const ADDRESS_LEN: usize = 20;
    pub const OPCODE_LEN: usize = 1;
    pub const UINT_LEN: usize = 32;

    /// Length of the encoded operation payload.
    pub const PAYLOAD_LEN: usize = OPCODE_LEN + ADDRESS_LEN + UINT_LEN;

    /// Length of a whole encoded transaction.
    pub const ENCODED_LEN: usize = NONCE_LEN + CHAIN_ID_LEN + 2 * ADDRESS_LEN + PAYLOAD_LEN;
}

/// The fields recoverable from canonical bytes.
///
/// The sender comes back as its 20-byte fragment; the full public key is not
/// part of the encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub nonce: u128,
    pub chain_id: u32,
    pub initiating_contract: Address,
    pub sender: Address,
    pub operation: Operation,
}

/// Encode a transaction to its canonical bytes.
pub fn canonical_bytes(tx: &UnsignedTransaction) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::with_capacity(layout::ENCODED_LEN);
    buf.extend_from_slice(&tx.nonce.to_be_bytes());
    buf.extend_from_slice(&tx.chain_id.to_be_bytes());
    buf.extend_from_slice(tx.initiating_contract.as_bytes());
    buf.extend_from_slice(tx.sender.fragment().as_bytes());
    encode_operation(&mut buf, &tx.operation)?;
    Ok(buf)
}

/// Encode just the operation payload (opcode || address || token id).
pub fn encode_operation(buf: &mut Vec<u8>, operation: &Operation) -> Result<(), CoreError> {
    buf.push(operation.opcode().to_u8());
    put_address(buf, "operation.address", operation.counterparty())?;
    put_uint(buf, "operation.token_id", operation.token_id(), layout::UINT_LEN)?;
    Ok(())
}

/// Keccak-256 of the canonical bytes: the digest that gets signed.
pub fn signing_hash(tx: &UnsignedTransaction) -> Result<Keccak256Hash, CoreError> {
    Ok(Keccak256Hash::hash(&canonical_bytes(tx)?))
}

/// Decode canonical bytes back into their fields.
pub fn decode_canonical(bytes: &[u8]) -> Result<DecodedTransaction, CoreError> {
    if bytes.len() != layout::ENCODED_LEN {
        return Err(CoreError::DecodingError(format!(
            "expected {} bytes, got {}",
            layout::ENCODED_LEN,
            bytes.len()
        )));
    }

    let mut reader = Reader { bytes, pos: 0 };

    let nonce = u128::from_be_bytes(reader.array::<{ layout::NONCE_LEN }>());
    let chain_id = u32::from_be_bytes(reader.array::<{ layout::CHAIN_ID_LEN }>());
    let initiating_contract = Address(reader.array::<{ layout::ADDRESS_LEN }>());
    let sender = Address(reader.array::<{ layout::ADDRESS_LEN }>());

    let opcode = OpCode::from_u8(reader.array::<{ layout::OPCODE_LEN }>()[0])?;
    let counterparty = Bytes::copy_from_slice(&reader.array::<{ layout::ADDRESS_LEN }>());
    let token_id = TokenId::from_be_bytes(&reader.array::<{ layout::UINT_LEN }>());

    Ok(DecodedTransaction {
        nonce,
        chain_id,
        initiating_contract,
        sender,
        operation: Operation::from_parts(opcode, counterparty, token_id),
    })
}

/// Write an address field; it must be exactly [`ADDRESS_LEN`] bytes.
fn put_address(buf: &mut Vec<u8>, field: &'static str, bytes: &[u8]) -> Result<(), CoreError> {
    if bytes.len() != ADDRESS_LEN {
        return Err(CoreError::EncodingOverflow {
            field,
            width: ADDRESS_LEN,
            actual: bytes.len(),
        });
    }
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Write an unsigned integer left-padded with zeros to `width` bytes.
fn put_uint(
    buf: &mut Vec<u8>,
    field: &'static str,
    value: &TokenId,
    width: usize,
) -> Result<(), CoreError> {
    let be = value.to_be_bytes();
    if be.len() > width {
        return Err(CoreError::EncodingOverflow {
            field,
            width,
            actual: be.len(),
        });
    }
    buf.resize(buf.len() + width - be.len(), 0);
    buf.extend_from_slice(&be);
    Ok(())
}

/// Cursor over an input whose total length has already been checked.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut arr = [0u8; N];
        arr.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        arr
    }
}
