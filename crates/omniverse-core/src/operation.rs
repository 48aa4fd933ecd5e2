//! Operations carried by omniverse transactions.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::TokenId;

/// Numeric opcode of an operation, as written into the canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    Transfer = 0,
    Mint = 1,
    Burn = 2,
}

impl OpCode {
    /// Convert to u8 for serialization.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Result<Self, CoreError> {
        match value {
            0 => Ok(Self::Transfer),
            1 => Ok(Self::Mint),
            2 => Ok(Self::Burn),
            other => Err(CoreError::UnknownOpCode(other)),
        }
    }
}

/// A token operation.
///
/// The address field holds raw bytes so that a wrongly sized address is
/// caught by the encoder as an overflow instead of being silently truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Move `token_id` to `to`.
    Transfer { to: Bytes, token_id: TokenId },
    /// Create `token_id`, owned by `to`.
    Mint { to: Bytes, token_id: TokenId },
    /// Destroy `token_id`, currently owned by `from`.
    Burn { from: Bytes, token_id: TokenId },
}

impl Operation {
    pub fn transfer(to: impl Into<Bytes>, token_id: impl Into<TokenId>) -> Self {
        Self::Transfer {
            to: to.into(),
            token_id: token_id.into(),
        }
    }

    pub fn mint(to: impl Into<Bytes>, token_id: impl Into<TokenId>) -> Self {
        Self::Mint {
            to: to.into(),
            token_id: token_id.into(),
        }
    }

    pub fn burn(from: impl Into<Bytes>, token_id: impl Into<TokenId>) -> Self {
        Self::Burn {
            from: from.into(),
            token_id: token_id.into(),
        }
    }

    /// Rebuild an operation from its encoded parts.
    pub fn from_parts(opcode: OpCode, counterparty: Bytes, token_id: TokenId) -> Self {
        match opcode {
            OpCode::Transfer => Self::Transfer {
                to: counterparty,
                token_id,
            },
            OpCode::Mint => Self::Mint {
                to: counterparty,
                token_id,
            },
            OpCode::Burn => Self::Burn {
                from: counterparty,
                token_id,
            },
        }
    }

    pub fn opcode(&self) -> OpCode {
        match self {
            Self::Transfer { .. } => OpCode::Transfer,
            Self::Mint { .. } => OpCode::Mint,
            Self::Burn { .. } => OpCode::Burn,
        }
    }

    /// The address field: recipient for transfer and mint, holder for burn.
    pub fn counterparty(&self) -> &Bytes {
        match self {
            Self::Transfer { to, .. } | Self::Mint { to, .. } => to,
            Self::Burn { from, .. } => from,
        }
    }

    pub fn token_id(&self) -> &TokenId {
        match self {
            Self::Transfer { token_id, .. }
            | Self::Mint { token_id, .. }
            | Self::Burn { token_id, .. } => token_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    #[test]
    fn test_opcode_values() {
        assert_eq!(OpCode::Transfer.to_u8(), 0);
        assert_eq!(OpCode::Mint.to_u8(), 1);
        assert_eq!(OpCode::Burn.to_u8(), 2);
        assert!(matches!(OpCode::from_u8(3), Err(CoreError::UnknownOpCode(3))));
    }

    #[test]
    fn test_from_parts_matches_constructor() {
        let to = Address::from_bytes([7; 20]);
        for op in [
            Operation::transfer(to, 1u64),
            Operation::mint(to, 2u64),
            Operation::burn(to, 3u64),
        ] {
            let rebuilt =
                Operation::from_parts(op.opcode(), op.counterparty().clone(), op.token_id().clone());
            assert_eq!(rebuilt, op);
        }
    }
}
