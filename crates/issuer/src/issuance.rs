//! Ledger issuance inputs.

use sha2::{Digest, Sha256};
use simplicityhl::elements::hashes::{Hash, sha256};
use simplicityhl::elements::{AssetId, BlockHash, Script};

use crate::asset::{AssetAmount, AssetPolicy};
use crate::error::IssuerError;

/// Largest amount the ledger's signed native amount type can carry.
#[allow(clippy::cast_sign_loss)]
pub const MAX_ISSUANCE_AMOUNT: u64 = i64::MAX as u64;

/// Input that creates `amount` new units of an asset.
///
/// Ledger validation only accepts it between `not_before_ms` and `not_after_ms`,
/// which bounds how long the issuance can be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceInput {
    pub asset_id: AssetId,
    pub not_before_ms: u64,
    pub not_after_ms: u64,
    pub genesis_hash: BlockHash,
    pub amount: u64,
    pub issuance_program: Script,
    /// Empty keeps the asset's current definition.
    pub asset_definition: Vec<u8>,
    pub reference_data: Vec<u8>,
    /// Distinguishes issuances that share the same window.
    pub nonce: Vec<u8>,
}

impl IssuanceInput {
    #[must_use]
    pub const fn asset_amount(&self) -> AssetAmount {
        AssetAmount::new(self.asset_id, self.amount)
    }
}

/// Asset id committed to by a chain and the issuance program that controls it.
#[must_use]
pub fn derive_asset_id(genesis_hash: &BlockHash, issuance_program: &Script) -> AssetId {
    let entropy: [u8; 32] = Sha256::new()
        .chain_update(genesis_hash.as_byte_array())
        .chain_update(issuance_program.as_bytes())
        .finalize()
        .into();

    AssetId::from_entropy(sha256::Midstate::from_byte_array(entropy))
}

/// Build the issuance input for `policy`.
///
/// Whether issuance is currently permitted is decided by ledger validation; only
/// the window ordering and the amount range are checked here.
pub fn build_issuance_input(
    policy: &AssetPolicy,
    amount: u64,
    not_before_ms: u64,
    not_after_ms: u64,
    asset_definition: &[u8],
    reference_data: &[u8],
    nonce: &[u8],
) -> Result<IssuanceInput, IssuerError> {
    if not_before_ms > not_after_ms {
        return Err(IssuerError::InvalidTimeWindow {
            not_before_ms,
            not_after_ms,
        });
    }
    if amount > MAX_ISSUANCE_AMOUNT {
        return Err(IssuerError::AmountOutOfRange {
            amount,
            max: MAX_ISSUANCE_AMOUNT,
        });
    }

    Ok(IssuanceInput {
        asset_id: policy.asset_id,
        not_before_ms,
        not_after_ms,
        genesis_hash: policy.genesis_hash,
        amount,
        issuance_program: policy.issuance_program.clone(),
        asset_definition: asset_definition.to_vec(),
        reference_data: reference_data.to_vec(),
        nonce: nonce.to_vec(),
    })
}
