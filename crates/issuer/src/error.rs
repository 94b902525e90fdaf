use std::time::Duration;

use simplicityhl::elements::AssetId;
use simplicityhl::elements::bitcoin::bip32;

use crate::asset::KeySpace;

/// Errors returned by an asset registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("asset {0} is not registered")]
    NotFound(AssetId),

    #[error("asset registry unavailable: {0}")]
    Unavailable(String),

    #[error("asset lookup exceeded the request deadline")]
    DeadlineExceeded,

    #[error("asset lookup was cancelled")]
    Cancelled,
}

/// Errors from parsing a multisig redeem program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedeemProgramError {
    #[error("redeem program is not a valid script: {0}")]
    Malformed(String),

    #[error("redeem program is not a multisig program")]
    NotMultisig,

    #[error("redeem program key {index} is not a valid public key")]
    InvalidPublicKey { index: usize },

    #[error("redeem program requires {required} of {total} signatures")]
    ThresholdOutOfRange { required: usize, total: usize },
}

/// Errors from reserving an issuance and building its input and witness template.
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("find asset with ID {asset_id}: {source}")]
    AssetNotFound {
        asset_id: AssetId,
        #[source]
        source: RegistryError,
    },

    #[error("invalid redeem program: {0}")]
    InvalidRedeemProgram(#[from] RedeemProgramError),

    #[error("invalid time window: not_before {not_before_ms} is after not_after {not_after_ms}")]
    InvalidTimeWindow {
        not_before_ms: u64,
        not_after_ms: u64,
    },

    #[error("reservation ttl must be at least 1ms and stay within the ledger time range, got {0:?}")]
    InvalidTtl(Duration),

    #[error("issuance amount {amount} exceeds the ledger maximum {max}")]
    AmountOutOfRange { amount: u64, max: u64 },

    #[error("reserver for asset {expected} cannot reserve asset {actual}")]
    AssetMismatch { expected: AssetId, actual: AssetId },

    #[error(
        "asset {asset_id} key index {asset_key_index} does not match signer {signer_id} key index {signer_key_index}"
    )]
    KeyIndexMismatch {
        asset_id: AssetId,
        asset_key_index: u64,
        signer_id: String,
        signer_key_index: u64,
    },

    #[error("signer {signer_id} derives {actual} keys, issuance requires asset keys")]
    WrongKeySpace { signer_id: String, actual: KeySpace },

    #[error("key index {0} is outside the unhardened derivation range")]
    KeyIndexOutOfRange(u64),

    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] bip32::Error),

    #[error("signer has {signer_keys} keys but redeem program lists {redeem_keys}")]
    RedeemKeyCountMismatch {
        signer_keys: usize,
        redeem_keys: usize,
    },

    #[error("derived key at position {position} does not match the redeem program key")]
    RedeemKeysMismatch { position: usize },

    #[error("redeem program requires {redeem} signatures but signer quorum is {signer}")]
    QuorumMismatch { redeem: usize, signer: usize },

    #[error("system clock reads before the Unix epoch")]
    ClockBeforeEpoch,
}

/// Errors from assembling a transaction template.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("reserve {asset_id}: {source}")]
    Reserve {
        asset_id: AssetId,
        #[source]
        source: IssuerError,
    },

    #[error("transaction has no destinations")]
    NoDestinations,

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("asset {asset_id} is unbalanced: inputs {inputs}, outputs {outputs}")]
    Unbalanced {
        asset_id: AssetId,
        inputs: u64,
        outputs: u64,
    },

    #[error("input windows do not overlap: not_before {not_before_ms}, not_after {not_after_ms}")]
    EmptyTimeWindow {
        not_before_ms: u64,
        not_after_ms: u64,
    },

    #[error("asset amount overflow while summing {asset_id}")]
    AmountOverflow { asset_id: AssetId },
}
