//! JSON file holding the registered asset policies.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use issuer::{AssetId, AssetPolicy, BlockHash, KeySpace, MemoryRegistry, Script, Signer, Xpub};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub asset_id: String,
    pub genesis_hash: String,
    /// Hex
    pub issuance_program: String,
    /// Hex
    pub redeem_program: String,
    pub key_index: u64,
    pub signer: SignerEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerEntry {
    pub id: String,
    pub xpubs: Vec<String>,
    pub key_space: KeySpaceEntry,
    pub key_index: u64,
    pub quorum: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySpaceEntry {
    Asset,
    Account,
}

impl From<KeySpace> for KeySpaceEntry {
    fn from(key_space: KeySpace) -> Self {
        match key_space {
            KeySpace::Asset => Self::Asset,
            KeySpace::Account => Self::Account,
        }
    }
}

impl From<KeySpaceEntry> for KeySpace {
    fn from(entry: KeySpaceEntry) -> Self {
        match entry {
            KeySpaceEntry::Asset => Self::Asset,
            KeySpaceEntry::Account => Self::Account,
        }
    }
}

impl RegistryFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read registry {}", path.display()))?;

        serde_json::from_str(&raw).with_context(|| format!("parse registry {}", path.display()))
    }

    /// Like [`RegistryFile::load`], but a missing file is an empty registry.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;

        fs::write(path, raw).with_context(|| format!("write registry {}", path.display()))
    }

    /// Add `policy`, replacing any entry with the same asset id.
    pub fn upsert(&mut self, policy: &AssetPolicy) {
        let entry = AssetEntry::from_policy(policy);

        match self
            .assets
            .iter_mut()
            .find(|existing| existing.asset_id == entry.asset_id)
        {
            Some(existing) => *existing = entry,
            None => self.assets.push(entry),
        }
    }

    pub fn to_registry(&self) -> Result<MemoryRegistry> {
        self.assets.iter().map(AssetEntry::to_policy).collect()
    }
}

impl AssetEntry {
    #[must_use]
    pub fn from_policy(policy: &AssetPolicy) -> Self {
        Self {
            asset_id: policy.asset_id.to_string(),
            genesis_hash: policy.genesis_hash.to_string(),
            issuance_program: hex::encode(policy.issuance_program.as_bytes()),
            redeem_program: hex::encode(policy.redeem_program.as_bytes()),
            key_index: policy.key_index,
            signer: SignerEntry {
                id: policy.signer.id.clone(),
                xpubs: policy.signer.xpubs.iter().map(ToString::to_string).collect(),
                key_space: policy.signer.key_space.into(),
                key_index: policy.signer.key_index,
                quorum: policy.signer.quorum,
            },
        }
    }

    pub fn to_policy(&self) -> Result<AssetPolicy> {
        let asset_id = AssetId::from_str(&self.asset_id)
            .with_context(|| format!("invalid asset id {}", self.asset_id))?;

        let xpubs = self
            .signer
            .xpubs
            .iter()
            .map(|xpub| Xpub::from_str(xpub).with_context(|| format!("invalid xpub {xpub}")))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("asset {asset_id}"))?;

        Ok(AssetPolicy {
            asset_id,
            genesis_hash: BlockHash::from_str(&self.genesis_hash)
                .with_context(|| format!("asset {asset_id}: invalid genesis hash"))?,
            issuance_program: parse_script(&self.issuance_program)
                .with_context(|| format!("asset {asset_id}: invalid issuance program"))?,
            redeem_program: parse_script(&self.redeem_program)
                .with_context(|| format!("asset {asset_id}: invalid redeem program"))?,
            signer: Signer {
                id: self.signer.id.clone(),
                xpubs,
                key_space: self.signer.key_space.into(),
                key_index: self.signer.key_index,
                quorum: self.signer.quorum,
            },
            key_index: self.key_index,
        })
    }
}

/// Script from its hex encoding.
pub fn parse_script(program_hex: &str) -> Result<Script> {
    Ok(Script::from(hex::decode(program_hex)?))
}
