//! Transaction validation: signature recovery and structural checks.

use crate::canonical::canonical_bytes;
use crate::crypto::recover_public_key;
use crate::error::ValidationError;
use crate::transaction::OmniverseTransaction;

/// Validate a signed transaction.
///
/// This performs:
/// - Structural check (the envelope encodes)
/// - Signature recovery over the canonical digest
/// - Recovered key must equal the declared sender
pub fn verify_transaction(tx: &OmniverseTransaction) -> Result<(), ValidationError> {
    let hash = tx.signing_hash()?;
    let recovered = recover_public_key(&hash, tx.signature())?;
    if &recovered != tx.sender() {
        return Err(ValidationError::SignatureMismatch {
            expected: *tx.sender(),
            recovered,
        });
    }
    Ok(())
}

/// Validate structure without signature recovery.
pub fn validate_transaction_structure(tx: &OmniverseTransaction) -> Result<(), ValidationError> {
    canonical_bytes(tx.body())?;
    Ok(())
}
