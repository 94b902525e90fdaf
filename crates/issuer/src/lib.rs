#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! Issuance of registered assets.
//!
//! An issuance is funded by an [`IssuanceReserver`]: it looks up the asset's policy,
//! builds a time-bounded [`IssuanceInput`] and the multisig [`TemplateInput`] that
//! signers have to complete. [`txbuilder::build`] merges reservations and destinations
//! into a balanced [`Template`].

pub mod asset;
pub mod context;
pub mod error;
pub mod issuance;
pub mod issuer;
pub mod metrics;
pub mod signers;
pub mod txbuilder;
pub mod txscript;

#[cfg(test)]
pub(crate) mod test_support;

pub use asset::{AssetAmount, AssetPolicy, AssetRegistry, KeySpace, MemoryRegistry, Signer};
pub use context::{CancelHandle, Clock, FixedClock, RequestContext, SystemClock};
pub use error::{BuildError, IssuerError, RedeemProgramError, RegistryError};
pub use issuance::{IssuanceInput, MAX_ISSUANCE_AMOUNT, build_issuance_input, derive_asset_id};
pub use issuer::{IssuanceReserver, Issuer, LEGACY_ISSUE_TTL, build_witness_template};
pub use metrics::{ElapsedRecorder, Stopwatch, TracingRecorder};
pub use txbuilder::{
    Destination, KeyPath, ReserveResult, ReserveResultItem, Reserver, SignatureRequirement,
    SignatureIndexError, Source, Template, TemplateInput, TxData, TxInput, TxOutput,
    WitnessComponent,
};

pub use simplicityhl::elements::bitcoin::bip32::{DerivationPath, Xpub};
pub use simplicityhl::elements::{AssetId, BlockHash, Script};
