//! Asset policies and the registry that resolves them.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use simplicityhl::elements::bitcoin::bip32::Xpub;
use simplicityhl::elements::{AssetId, BlockHash, Script};

use crate::error::RegistryError;

/// An amount of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetAmount {
    pub asset_id: AssetId,
    pub amount: u64,
}

impl AssetAmount {
    #[must_use]
    pub const fn new(asset_id: AssetId, amount: u64) -> Self {
        Self { asset_id, amount }
    }
}

/// Key space a signer derives its keys under. The discriminant is the first
/// derivation path component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeySpace {
    Asset = 0,
    Account = 1,
}

impl KeySpace {
    #[must_use]
    pub const fn index(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for KeySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset => f.write_str("asset"),
            Self::Account => f.write_str("account"),
        }
    }
}

/// The set of extended keys allowed to authorize issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    pub id: String,
    pub xpubs: Vec<Xpub>,
    pub key_space: KeySpace,
    /// Index the signer's issuance keys were generated under.
    pub key_index: u64,
    pub quorum: usize,
}

/// Issuance policy of a registered asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPolicy {
    pub asset_id: AssetId,
    pub genesis_hash: BlockHash,
    pub issuance_program: Script,
    pub redeem_program: Script,
    pub signer: Signer,
    pub key_index: u64,
}

/// Read-only source of asset policies.
pub trait AssetRegistry: Send + Sync {
    fn find(
        &self,
        asset_id: AssetId,
    ) -> impl Future<Output = Result<AssetPolicy, RegistryError>> + Send;
}

/// Registry backed by a map, loaded once by the caller.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    assets: HashMap<AssetId, AssetPolicy>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy, returning the one it replaces.
    pub fn insert(&mut self, policy: AssetPolicy) -> Option<AssetPolicy> {
        self.assets.insert(policy.asset_id, policy)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn policies(&self) -> impl Iterator<Item = &AssetPolicy> {
        self.assets.values()
    }
}

impl FromIterator<AssetPolicy> for MemoryRegistry {
    fn from_iter<I: IntoIterator<Item = AssetPolicy>>(iter: I) -> Self {
        let mut registry = Self::new();
        for policy in iter {
            registry.insert(policy);
        }
        registry
    }
}

impl AssetRegistry for MemoryRegistry {
    async fn find(&self, asset_id: AssetId) -> Result<AssetPolicy, RegistryError> {
        self.assets
            .get(&asset_id)
            .cloned()
            .ok_or(RegistryError::NotFound(asset_id))
    }
}
