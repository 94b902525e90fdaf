//! Fixtures shared by unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use simplicityhl::elements::bitcoin::Network;
use simplicityhl::elements::bitcoin::bip32::Xpub;
use simplicityhl::elements::bitcoin::secp256k1::PublicKey;
use simplicityhl::elements::hashes::Hash;
use simplicityhl::elements::{AssetId, BlockHash, Script};

use crate::asset::{AssetPolicy, AssetRegistry, KeySpace, MemoryRegistry, Signer};
use crate::context::{Clock, FixedClock};
use crate::error::RegistryError;
use crate::metrics::ElapsedRecorder;
use crate::{signers, txscript};

/// 2023-11-14T22:13:20Z
pub const NOW_MS: u64 = 1_700_000_000_000;

pub fn asset_id(byte: u8) -> AssetId {
    AssetId::from_slice(&[byte; 32]).expect("32 bytes")
}

pub fn xpub(seed: u8) -> Xpub {
    signers::master_xpub(Network::Regtest, &[seed; 32]).expect("valid seed")
}

pub fn pubkey(seed: u8) -> PublicKey {
    xpub(seed).public_key
}

/// `quorum`-of-`keys` policy whose signer xpubs come from seeds `1..=keys`.
pub fn policy(asset: u8, quorum: usize, keys: u8, key_index: u64) -> AssetPolicy {
    let xpubs: Vec<Xpub> = (1..=keys).map(xpub).collect();
    let path = signers::path(KeySpace::Asset, key_index).expect("valid index");
    let derived = signers::derive_keys(&xpubs, &path).expect("derives");
    let redeem_program = txscript::multisig_program(quorum, &derived).expect("valid threshold");

    AssetPolicy {
        asset_id: asset_id(asset),
        genesis_hash: BlockHash::from_byte_array([7; 32]),
        issuance_program: txscript::issuance_program(&redeem_program),
        redeem_program,
        signer: Signer {
            id: format!("signer-{asset:02x}"),
            xpubs,
            key_space: KeySpace::Asset,
            key_index,
            quorum,
        },
        key_index,
    }
}

pub fn registry(policies: impl IntoIterator<Item = AssetPolicy>) -> MemoryRegistry {
    policies.into_iter().collect()
}

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::from_unix_millis(NOW_MS))
}

/// Pay-to-witness-key-hash style program used as a destination.
pub fn wallet_program() -> Script {
    simplicityhl::elements::script::Builder::new()
        .push_int(0)
        .push_slice(&[0x11; 20])
        .into_script()
}

/// Registry whose lookups never complete.
pub struct PendingRegistry;

impl AssetRegistry for PendingRegistry {
    async fn find(&self, _asset_id: AssetId) -> Result<AssetPolicy, RegistryError> {
        std::future::pending().await
    }
}

#[derive(Default)]
pub struct RecordingRecorder {
    records: Mutex<Vec<(&'static str, Duration)>>,
}

impl RecordingRecorder {
    pub fn records(&self) -> Vec<(&'static str, Duration)> {
        self.records.lock().expect("not poisoned").clone()
    }
}

impl ElapsedRecorder for RecordingRecorder {
    fn record_elapsed(&self, operation: &'static str, elapsed: Duration) {
        self.records
            .lock()
            .expect("not poisoned")
            .push((operation, elapsed));
    }
}
