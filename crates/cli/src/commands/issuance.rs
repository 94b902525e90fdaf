use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Args;

use issuer::{
    AssetAmount, AssetId, Destination, Issuer, MemoryRegistry, RequestContext, Script,
    TracingRecorder,
};

use crate::modules::registry_file::{RegistryFile, parse_script};
use crate::modules::render;
use crate::modules::settings::Settings;

#[derive(Args, Debug)]
pub struct Reserve {
    #[arg(long = "asset-id")]
    asset_id: AssetId,
    #[arg(long)]
    amount: u64,
    /// Validity window in seconds [default: ISSUER_RESERVE_TTL_SECS]
    #[arg(long = "ttl-secs")]
    ttl_secs: Option<u64>,
    /// Replacement asset definition as hex; empty keeps the current one
    #[arg(long = "definition", default_value = "")]
    asset_definition: String,
    #[arg(long = "reference-data", default_value = "")]
    reference_data: String,
    #[arg(long, default_value = "")]
    nonce: String,
}

impl Reserve {
    pub async fn handle(self, settings: &Settings) -> Result<()> {
        let issuer = Issuer::new(load_registry(settings)?);
        let ttl = self
            .ttl_secs
            .map_or_else(|| settings.reserve_ttl(), Duration::from_secs);

        let reserver = issuer
            .reserver(self.asset_id)
            .asset_definition(decode_hex("definition", &self.asset_definition)?)
            .reference_data(decode_hex("reference data", &self.reference_data)?)
            .nonce(decode_hex("nonce", &self.nonce)?);

        let ctx = RequestContext::with_timeout(settings.lookup_timeout());
        let result = reserver
            .reserve_issuance(&ctx, &AssetAmount::new(self.asset_id, self.amount), ttl)
            .await
            .with_context(|| format!("reserve {} of asset {}", self.amount, self.asset_id))?;

        println!(
            "{}",
            serde_json::to_string_pretty(&render::reserve_result(&result))?
        );

        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct Issue {
    #[arg(long = "asset-id")]
    asset_id: AssetId,
    /// Amount to issue [default: sum of destinations]
    #[arg(long)]
    amount: Option<u64>,
    /// Destination as `<control-program-hex>:<amount>`; repeatable
    #[arg(long = "dest", required = true)]
    destinations: Vec<DestinationArg>,
}

impl Issue {
    pub async fn handle(self, settings: &Settings) -> Result<()> {
        let issuer = Issuer::new(load_registry(settings)?);

        let total = self
            .destinations
            .iter()
            .try_fold(0_u64, |total, dest| total.checked_add(dest.amount))
            .ok_or_else(|| anyhow!("destination amounts overflow"))?;
        let amount = AssetAmount::new(self.asset_id, self.amount.unwrap_or(total));

        let destinations = self
            .destinations
            .into_iter()
            .map(|dest| {
                Destination::new(
                    AssetAmount::new(self.asset_id, dest.amount),
                    dest.control_program,
                )
            })
            .collect();

        let ctx = RequestContext::with_timeout(settings.lookup_timeout());
        #[allow(deprecated)]
        let template = issuer
            .issue(&ctx, &TracingRecorder, amount, destinations)
            .await
            .with_context(|| format!("issue {} of asset {}", amount.amount, self.asset_id))?;

        println!(
            "{}",
            serde_json::to_string_pretty(&render::template(&template))?
        );

        Ok(())
    }
}

/// `<control-program-hex>:<amount>`
#[derive(Debug, Clone)]
pub struct DestinationArg {
    control_program: Script,
    amount: u64,
}

impl FromStr for DestinationArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (program_hex, amount) = s
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("expected <control-program-hex>:<amount>, got {s}"))?;

        Ok(Self {
            control_program: parse_script(program_hex)
                .with_context(|| format!("invalid control program {program_hex}"))?,
            amount: amount
                .parse()
                .with_context(|| format!("invalid amount {amount}"))?,
        })
    }
}

fn load_registry(settings: &Settings) -> Result<Arc<MemoryRegistry>> {
    let registry = RegistryFile::load(&settings.registry_path)?.to_registry()?;
    tracing::debug!(assets = registry.len(), "loaded registry");

    Ok(Arc::new(registry))
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).with_context(|| format!("{field} is not valid hex"))
}
