use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use issuer::{
    AssetAmount, AssetId, AssetPolicy, BlockHash, KeySpace, Signer, build_witness_template,
    derive_asset_id, signers, txscript,
};

use crate::commands::XPUB_NETWORK;
use crate::modules::registry_file::{RegistryFile, parse_script};

#[derive(Args, Debug)]
pub struct NewAsset {
    /// Hex seed of one signer master key; repeat in redeem key order
    #[arg(long = "seed", required = true)]
    seeds: Vec<String>,
    /// Signatures required to issue
    #[arg(long, default_value_t = 1)]
    quorum: usize,
    /// Index the issuance keys are derived at
    #[arg(long = "key-index", default_value_t = 0)]
    key_index: u64,
    /// Genesis block hash of the target chain
    #[arg(long = "genesis-hash")]
    genesis_hash: BlockHash,
    #[arg(long = "signer-id", default_value = "issuer")]
    signer_id: String,
    /// Use this asset id instead of deriving it from the chain and issuance program
    #[arg(long = "asset-id")]
    asset_id: Option<AssetId>,
}

impl NewAsset {
    pub fn handle(self, registry_path: &Path) -> Result<()> {
        let xpubs = self
            .seeds
            .iter()
            .enumerate()
            .map(|(index, seed_hex)| {
                let seed = hex::decode(seed_hex)
                    .with_context(|| format!("seed {index} is not valid hex"))?;
                signers::master_xpub(XPUB_NETWORK, &seed)
                    .with_context(|| format!("seed {index} cannot derive a master key"))
            })
            .collect::<Result<Vec<_>>>()?;

        let path = signers::path(KeySpace::Asset, self.key_index)?;
        let keys = signers::derive_keys(&xpubs, &path)?;
        let redeem_program = txscript::multisig_program(self.quorum, &keys)?;
        let issuance_program = txscript::issuance_program(&redeem_program);
        let asset_id = self
            .asset_id
            .unwrap_or_else(|| derive_asset_id(&self.genesis_hash, &issuance_program));

        let policy = AssetPolicy {
            asset_id,
            genesis_hash: self.genesis_hash,
            issuance_program,
            redeem_program,
            signer: Signer {
                id: self.signer_id,
                xpubs,
                key_space: KeySpace::Asset,
                key_index: self.key_index,
                quorum: self.quorum,
            },
            key_index: self.key_index,
        };

        // Refuse to register a policy that could never be signed.
        build_witness_template(&policy, AssetAmount::new(asset_id, 0))
            .context("policy does not produce a signable witness")?;

        let mut file = RegistryFile::load_or_default(registry_path)?;
        file.upsert(&policy);
        file.save(registry_path)?;

        tracing::info!(%asset_id, registry = %registry_path.display(), "registered asset");

        let output = json!({
            "asset_id": asset_id.to_string(),
            "quorum": policy.signer.quorum,
            "keys": policy.signer.xpubs.len(),
            "key_path": signers::path_string(&path),
            "redeem_program": hex::encode(policy.redeem_program.as_bytes()),
            "issuance_program": hex::encode(policy.issuance_program.as_bytes()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);

        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct SigsRequired {
    /// Redeem program as hex
    program: String,
}

impl SigsRequired {
    pub fn handle(&self) -> Result<()> {
        let program = parse_script(&self.program).context("redeem program is not valid hex")?;
        let required = txscript::sigs_required(&program)?;

        println!("{required}");

        Ok(())
    }
}
