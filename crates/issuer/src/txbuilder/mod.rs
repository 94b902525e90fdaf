//! Transaction templates assembled from funding sources and destinations.
//!
//! [`build`] works in three steps:
//! 1. Reserve every source in order, fee source first, then append already reserved inputs.
//! 2. Check that, per asset, the non-fee inputs equal the destination outputs.
//! 3. Narrow the transaction window to the intersection of the input windows.
//!
//! Nothing is signed here: each input carries a [`TemplateInput`] describing the
//! signatures it needs.

mod template;

pub use template::*;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;
use simplicityhl::elements::{AssetId, Script};

use crate::asset::AssetAmount;
use crate::context::RequestContext;
use crate::error::{BuildError, IssuerError};

/// Something that can supply transaction inputs for a requested amount.
pub trait Reserver: Send + Sync {
    fn reserve<'a>(
        &'a self,
        ctx: &'a RequestContext,
        asset_amount: &'a AssetAmount,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<ReserveResult, IssuerError>>;
}

/// Requested amount together with the reserver that funds it.
pub struct Source {
    pub asset_amount: AssetAmount,
    reserver: Box<dyn Reserver>,
}

impl Source {
    pub fn new(asset_amount: AssetAmount, reserver: impl Reserver + 'static) -> Self {
        Self {
            asset_amount,
            reserver: Box::new(reserver),
        }
    }

    pub async fn reserve(
        &self,
        ctx: &RequestContext,
        ttl: Duration,
    ) -> Result<ReserveResult, IssuerError> {
        self.reserver.reserve(ctx, &self.asset_amount, ttl).await
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("asset_amount", &self.asset_amount)
            .finish_non_exhaustive()
    }
}

/// Where an amount of an asset is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub asset_amount: AssetAmount,
    pub control_program: Script,
    pub reference_data: Vec<u8>,
}

impl Destination {
    #[must_use]
    pub const fn new(asset_amount: AssetAmount, control_program: Script) -> Self {
        Self {
            asset_amount,
            control_program,
            reference_data: Vec::new(),
        }
    }

    #[must_use]
    pub fn reference_data(mut self, reference_data: Vec<u8>) -> Self {
        self.reference_data = reference_data;
        self
    }

    fn into_output(self) -> TxOutput {
        TxOutput {
            asset_amount: self.asset_amount,
            control_program: self.control_program,
            reference_data: self.reference_data,
        }
    }
}

/// Reserve `sources`, merge them with `extra_inputs` and pay `destinations`.
///
/// The fee source, if any, is reserved first and left out of the balance check.
#[tracing::instrument(
    level = "debug",
    skip_all,
    err,
    fields(sources = sources.len(), destinations = destinations.len())
)]
pub async fn build(
    ctx: &RequestContext,
    fee_source: Option<Source>,
    sources: Vec<Source>,
    destinations: Vec<Destination>,
    extra_inputs: Vec<ReserveResultItem>,
    ttl: Duration,
) -> Result<Template, BuildError> {
    if destinations.is_empty() {
        return Err(BuildError::NoDestinations);
    }

    let mut items = Vec::new();

    let fee_items = match &fee_source {
        Some(fee_source) => {
            let reserved = reserve_source(ctx, fee_source, ttl).await?;
            let count = reserved.items.len();
            items.extend(reserved.items);
            count
        }
        None => 0,
    };

    for source in &sources {
        items.extend(reserve_source(ctx, source, ttl).await?.items);
    }
    items.extend(extra_inputs);

    if items.is_empty() {
        return Err(BuildError::NoInputs);
    }

    let outputs: Vec<TxOutput> = destinations
        .into_iter()
        .map(Destination::into_output)
        .collect();

    let mut supply = BTreeMap::new();
    for item in &items[fee_items..] {
        add_balance(&mut supply, item.tx_input.asset_amount())?;
    }
    let mut demand = BTreeMap::new();
    for output in &outputs {
        add_balance(&mut demand, output.asset_amount)?;
    }
    check_balance(&supply, &demand)?;

    let (not_before_ms, not_after_ms) = intersect_windows(&items)?;

    let (inputs, signing_instructions) = items
        .into_iter()
        .map(|item| (item.tx_input, item.template_input))
        .unzip();

    tracing::debug!(not_before_ms, not_after_ms, "assembled transaction template");

    Ok(Template {
        transaction: TxData {
            inputs,
            outputs,
            not_before_ms,
            not_after_ms,
        },
        signing_instructions,
    })
}

async fn reserve_source(
    ctx: &RequestContext,
    source: &Source,
    ttl: Duration,
) -> Result<ReserveResult, BuildError> {
    source
        .reserve(ctx, ttl)
        .await
        .map_err(|source_error| BuildError::Reserve {
            asset_id: source.asset_amount.asset_id,
            source: source_error,
        })
}

fn add_balance(
    balances: &mut BTreeMap<AssetId, u64>,
    asset_amount: AssetAmount,
) -> Result<(), BuildError> {
    let entry = balances.entry(asset_amount.asset_id).or_insert(0);
    *entry = entry
        .checked_add(asset_amount.amount)
        .ok_or(BuildError::AmountOverflow {
            asset_id: asset_amount.asset_id,
        })?;
    Ok(())
}

fn check_balance(
    supply: &BTreeMap<AssetId, u64>,
    demand: &BTreeMap<AssetId, u64>,
) -> Result<(), BuildError> {
    for asset_id in supply.keys().chain(demand.keys()) {
        let inputs = supply.get(asset_id).copied().unwrap_or(0);
        let outputs = demand.get(asset_id).copied().unwrap_or(0);
        if inputs != outputs {
            return Err(BuildError::Unbalanced {
                asset_id: *asset_id,
                inputs,
                outputs,
            });
        }
    }
    Ok(())
}

fn intersect_windows(items: &[ReserveResultItem]) -> Result<(u64, u64), BuildError> {
    let (not_before_ms, not_after_ms) = items
        .iter()
        .map(|item| item.tx_input.window())
        .fold((u64::MIN, u64::MAX), |(before, after), (item_before, item_after)| {
            (before.max(item_before), after.min(item_after))
        });

    if not_before_ms > not_after_ms {
        return Err(BuildError::EmptyTimeWindow {
            not_before_ms,
            not_after_ms,
        });
    }
    Ok((not_before_ms, not_after_ms))
}
