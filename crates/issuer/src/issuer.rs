//! Issuance reservations: the funding source that mints new units of an asset.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use simplicityhl::elements::AssetId;

use crate::asset::{AssetAmount, AssetPolicy, AssetRegistry, KeySpace};
use crate::context::{Clock, RequestContext, SystemClock, ttl_millis, unix_millis};
use crate::error::{BuildError, IssuerError};
use crate::issuance::{MAX_ISSUANCE_AMOUNT, build_issuance_input};
use crate::metrics::{ElapsedRecorder, Stopwatch};
use crate::signers;
use crate::txbuilder::{
    self, Destination, ReserveResult, Reserver, SignatureRequirement, Source, Template,
    TemplateInput, TxInput,
};
use crate::txscript;

/// Validity window of transactions built by [`Issuer::issue`].
pub const LEGACY_ISSUE_TTL: Duration = Duration::from_secs(60);

/// Reserver that issues new units of one asset.
///
/// Issuance does not consume a finite pool, so reservations need no locking and
/// can run concurrently for the same asset.
pub struct IssuanceReserver<R> {
    asset_id: AssetId,
    asset_definition: Vec<u8>,
    reference_data: Vec<u8>,
    nonce: Vec<u8>,
    registry: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> fmt::Debug for IssuanceReserver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuanceReserver")
            .field("asset_id", &self.asset_id)
            .field("asset_definition", &hex::encode(&self.asset_definition))
            .field("reference_data", &hex::encode(&self.reference_data))
            .field("nonce", &hex::encode(&self.nonce))
            .finish_non_exhaustive()
    }
}

impl<R: AssetRegistry> IssuanceReserver<R> {
    pub fn new(asset_id: AssetId, registry: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            asset_id,
            asset_definition: Vec::new(),
            reference_data: Vec::new(),
            nonce: Vec::new(),
            registry,
            clock,
        }
    }

    /// Replace the asset definition; empty keeps the recorded one.
    #[must_use]
    pub fn asset_definition(mut self, asset_definition: Vec<u8>) -> Self {
        self.asset_definition = asset_definition;
        self
    }

    #[must_use]
    pub fn reference_data(mut self, reference_data: Vec<u8>) -> Self {
        self.reference_data = reference_data;
        self
    }

    #[must_use]
    pub fn nonce(mut self, nonce: Vec<u8>) -> Self {
        self.nonce = nonce;
        self
    }

    #[must_use]
    pub const fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// Reserve `asset_amount` for `ttl` starting now.
    #[tracing::instrument(
        name = "issuance.reserve",
        level = "debug",
        skip_all,
        err,
        fields(asset_id = %asset_amount.asset_id, amount = asset_amount.amount)
    )]
    pub async fn reserve_issuance(
        &self,
        ctx: &RequestContext,
        asset_amount: &AssetAmount,
        ttl: Duration,
    ) -> Result<ReserveResult, IssuerError> {
        if asset_amount.asset_id != self.asset_id {
            return Err(IssuerError::AssetMismatch {
                expected: self.asset_id,
                actual: asset_amount.asset_id,
            });
        }
        if asset_amount.amount > MAX_ISSUANCE_AMOUNT {
            return Err(IssuerError::AmountOutOfRange {
                amount: asset_amount.amount,
                max: MAX_ISSUANCE_AMOUNT,
            });
        }
        let ttl_ms = ttl_millis(ttl)?;

        let policy = ctx
            .run(self.registry.find(self.asset_id))
            .await
            .map_err(|source| IssuerError::AssetNotFound {
                asset_id: self.asset_id,
                source,
            })?;
        if policy.asset_id != self.asset_id {
            return Err(IssuerError::AssetMismatch {
                expected: self.asset_id,
                actual: policy.asset_id,
            });
        }

        let not_before_ms = unix_millis(self.clock.now())?;
        let not_after_ms = not_before_ms
            .checked_add(ttl_ms)
            .ok_or(IssuerError::InvalidTtl(ttl))?;

        let tx_input = build_issuance_input(
            &policy,
            asset_amount.amount,
            not_before_ms,
            not_after_ms,
            &self.asset_definition,
            &self.reference_data,
            &self.nonce,
        )?;
        let template_input = build_witness_template(&policy, *asset_amount)?;

        tracing::debug!(
            not_before_ms,
            not_after_ms,
            quorum = template_input
                .signature_requirement()
                .map_or(0, SignatureRequirement::quorum),
            "reserved issuance"
        );

        Ok(ReserveResult::single(
            TxInput::Issuance(tx_input),
            template_input,
        ))
    }
}

impl<R: AssetRegistry + 'static> Reserver for IssuanceReserver<R> {
    fn reserve<'a>(
        &'a self,
        ctx: &'a RequestContext,
        asset_amount: &'a AssetAmount,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<ReserveResult, IssuerError>> {
        Box::pin(self.reserve_issuance(ctx, asset_amount, ttl))
    }
}

/// Signing instructions for issuing `asset_amount` under `policy`.
///
/// The signature threshold and key order come from the redeem program, and every
/// redeem key must be the signer key derived at the asset's path. A policy whose
/// key index disagrees with its signer is rejected instead of producing a
/// template nobody can sign.
pub fn build_witness_template(
    policy: &AssetPolicy,
    asset_amount: AssetAmount,
) -> Result<TemplateInput, IssuerError> {
    let signer = &policy.signer;

    if signer.key_space != KeySpace::Asset {
        return Err(IssuerError::WrongKeySpace {
            signer_id: signer.id.clone(),
            actual: signer.key_space,
        });
    }
    if signer.key_index != policy.key_index {
        return Err(IssuerError::KeyIndexMismatch {
            asset_id: policy.asset_id,
            asset_key_index: policy.key_index,
            signer_id: signer.id.clone(),
            signer_key_index: signer.key_index,
        });
    }

    let path = signers::path(KeySpace::Asset, policy.key_index)?;

    let redeem = txscript::parse_multisig(&policy.redeem_program)?;
    if redeem.quorum != signer.quorum {
        return Err(IssuerError::QuorumMismatch {
            redeem: redeem.quorum,
            signer: signer.quorum,
        });
    }

    let derived = signers::derive_keys(&signer.xpubs, &path)?;
    if derived.len() != redeem.keys.len() {
        return Err(IssuerError::RedeemKeyCountMismatch {
            signer_keys: derived.len(),
            redeem_keys: redeem.keys.len(),
        });
    }
    if let Some(position) = derived
        .iter()
        .zip(&redeem.keys)
        .position(|(derived_key, redeem_key)| derived_key != redeem_key)
    {
        return Err(IssuerError::RedeemKeysMismatch { position });
    }

    let mut template_input = TemplateInput::new(asset_amount);
    template_input.add_witness_signatures(SignatureRequirement::new(
        redeem.quorum,
        signers::key_paths(&signer.xpubs, &path),
    ));
    template_input.add_witness_data(policy.redeem_program.to_bytes());

    Ok(template_input)
}

/// Issuance entry points sharing one registry and clock.
pub struct Issuer<R> {
    registry: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> Clone for Issuer<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R: AssetRegistry + 'static> Issuer<R> {
    pub fn new(registry: Arc<R>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    #[must_use]
    pub fn reserver(&self, asset_id: AssetId) -> IssuanceReserver<R> {
        IssuanceReserver::new(asset_id, Arc::clone(&self.registry), Arc::clone(&self.clock))
    }

    /// Funding source that issues `asset_amount`.
    #[must_use]
    pub fn new_issue_source(
        &self,
        asset_amount: AssetAmount,
        asset_definition: Vec<u8>,
        reference_data: Vec<u8>,
    ) -> Source {
        let reserver = self
            .reserver(asset_amount.asset_id)
            .asset_definition(asset_definition)
            .reference_data(reference_data);

        Source::new(asset_amount, reserver)
    }

    /// Build a transaction issuing `asset_amount` to `destinations`.
    ///
    /// Uses a single issuance source without definition or reference data, no fee
    /// source and a [`LEGACY_ISSUE_TTL`] window. The elapsed time is reported to
    /// `recorder` whether or not the build succeeds.
    #[deprecated(note = "use `Issuer::new_issue_source` with `txbuilder::build`")]
    pub async fn issue(
        &self,
        ctx: &RequestContext,
        recorder: &dyn ElapsedRecorder,
        asset_amount: AssetAmount,
        destinations: Vec<Destination>,
    ) -> Result<Template, BuildError> {
        let _stopwatch = Stopwatch::start(recorder, "issuer.issue");

        let sources = vec![self.new_issue_source(asset_amount, Vec::new(), Vec::new())];

        txbuilder::build(ctx, None, sources, destinations, Vec::new(), LEGACY_ISSUE_TTL).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::issuance::IssuanceInput;
    use crate::test_support::{
        NOW_MS, PendingRegistry, RecordingRecorder, asset_id, fixed_clock, policy, registry,
        wallet_program, xpub,
    };
    use crate::txbuilder::WitnessComponent;

    fn issuer() -> Issuer<crate::asset::MemoryRegistry> {
        Issuer::with_clock(Arc::new(registry([policy(0xa1, 2, 3, 5)])), fixed_clock())
    }

    fn a1(amount: u64) -> AssetAmount {
        AssetAmount::new(asset_id(0xa1), amount)
    }

    fn only_issuance(result: &ReserveResult) -> (&IssuanceInput, &TemplateInput) {
        assert_eq!(result.items.len(), 1);
        let item = &result.items[0];
        let TxInput::Issuance(input) = &item.tx_input;
        (input, &item.template_input)
    }

    #[tokio::test]
    async fn two_of_three_asset_reserves_one_minute_window() {
        let reserver = issuer().reserver(asset_id(0xa1));

        let result = reserver
            .reserve_issuance(&RequestContext::background(), &a1(1_000), Duration::from_secs(60))
            .await
            .expect("reserved");

        let (input, template) = only_issuance(&result);
        assert_eq!(input.amount, 1_000);
        assert_eq!(input.not_before_ms, NOW_MS);
        assert_eq!(input.not_after_ms - input.not_before_ms, 60_000);

        let requirement = template.signature_requirement().expect("signatures");
        assert_eq!(requirement.quorum(), 2);
        assert_eq!(requirement.keys().len(), 3);
        assert_eq!(template.asset_amount(), a1(1_000));
    }

    #[test]
    fn every_key_uses_the_asset_key_path() {
        let policy = policy(0xa1, 2, 3, 5);

        let template = build_witness_template(&policy, a1(1)).expect("template");

        let requirement = template.signature_requirement().expect("signatures");
        let expected_path = signers::path(KeySpace::Asset, 5).expect("path");
        assert!(
            requirement
                .keys()
                .iter()
                .all(|key| key.derivation_path == expected_path)
        );
        let xpubs: Vec<_> = requirement.keys().iter().map(|key| key.xpub).collect();
        assert_eq!(xpubs, policy.signer.xpubs);
    }

    #[test]
    fn redeem_program_is_the_trailing_witness_element() {
        let policy = policy(0xa1, 2, 3, 5);

        let template = build_witness_template(&policy, a1(1)).expect("template");

        assert!(matches!(
            template.witness_components(),
            [WitnessComponent::Signatures(_), WitnessComponent::Data(_)]
        ));
        assert_eq!(
            template.trailing_witness_data(),
            Some(policy.redeem_program.as_bytes())
        );
    }

    #[test]
    fn threshold_follows_the_redeem_program() {
        for (quorum, keys) in [(1, 1), (1, 3), (3, 3), (4, 7)] {
            let template =
                build_witness_template(&policy(0xa1, quorum, keys, 2), a1(1)).expect("template");

            let requirement = template.signature_requirement().expect("signatures");
            assert_eq!(requirement.quorum(), quorum);
            assert_eq!(requirement.keys().len(), usize::from(keys));
        }
    }

    #[tokio::test]
    async fn unknown_asset_fails_without_result() {
        let reserver = issuer().reserver(asset_id(0xb2));

        let err = reserver
            .reserve_issuance(
                &RequestContext::background(),
                &AssetAmount::new(asset_id(0xb2), 1),
                Duration::from_secs(60),
            )
            .await
            .expect_err("unknown asset");

        let IssuerError::AssetNotFound { asset_id: missing, source } = &err else {
            panic!("expected AssetNotFound, got {err:?}");
        };
        assert_eq!(*missing, asset_id(0xb2));
        assert_eq!(*source, RegistryError::NotFound(asset_id(0xb2)));
        assert!(err.to_string().contains(&asset_id(0xb2).to_string()));
    }

    #[tokio::test]
    async fn empty_definition_override_is_kept_empty() {
        let issuer = issuer();
        let ctx = RequestContext::background();

        let plain = issuer.new_issue_source(a1(5), Vec::new(), Vec::new());
        let plain = plain.reserve(&ctx, Duration::from_secs(60)).await.expect("reserved");
        assert!(only_issuance(&plain).0.asset_definition.is_empty());

        let overridden =
            issuer.new_issue_source(a1(5), br#"{"name":"A1"}"#.to_vec(), b"ref".to_vec());
        let overridden = overridden
            .reserve(&ctx, Duration::from_secs(60))
            .await
            .expect("reserved");
        let (input, _) = only_issuance(&overridden);
        assert_eq!(input.asset_definition, br#"{"name":"A1"}"#);
        assert_eq!(input.reference_data, b"ref");
    }

    #[tokio::test]
    async fn identical_requests_produce_identical_reservations() {
        let reserver = issuer().reserver(asset_id(0xa1)).nonce(vec![9; 8]);
        let ctx = RequestContext::background();

        let first = reserver
            .reserve_issuance(&ctx, &a1(42), Duration::from_secs(30))
            .await
            .expect("reserved");
        let second = reserver
            .reserve_issuance(&ctx, &a1(42), Duration::from_secs(30))
            .await
            .expect("reserved");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn concurrent_reservations_of_one_asset_are_independent() {
        let issuer = issuer();
        let ctx = RequestContext::background();
        let first = issuer.reserver(asset_id(0xa1));
        let second = issuer.reserver(asset_id(0xa1));
        let (one, two) = (a1(1), a1(2));

        let (a, b) = tokio::join!(
            first.reserve_issuance(&ctx, &one, Duration::from_secs(60)),
            second.reserve_issuance(&ctx, &two, Duration::from_secs(60)),
        );

        assert_eq!(only_issuance(&a.expect("first")).0.amount, 1);
        assert_eq!(only_issuance(&b.expect("second")).0.amount, 2);
    }

    #[tokio::test]
    async fn reserved_asset_must_match_reserver() {
        let reserver = issuer().reserver(asset_id(0xa1));

        let err = reserver
            .reserve_issuance(
                &RequestContext::background(),
                &AssetAmount::new(asset_id(0xb2), 1),
                Duration::from_secs(60),
            )
            .await
            .expect_err("different asset");

        assert!(matches!(err, IssuerError::AssetMismatch { .. }));
    }

    #[tokio::test]
    async fn amount_and_ttl_are_validated_before_lookup() {
        let reserver = Issuer::with_clock(Arc::new(PendingRegistry), fixed_clock())
            .reserver(asset_id(0xa1));
        let ctx = RequestContext::background();

        let err = reserver
            .reserve_issuance(&ctx, &a1(MAX_ISSUANCE_AMOUNT + 1), Duration::from_secs(60))
            .await
            .expect_err("amount too large");
        assert!(matches!(err, IssuerError::AmountOutOfRange { .. }));

        let err = reserver
            .reserve_issuance(&ctx, &a1(1), Duration::ZERO)
            .await
            .expect_err("zero ttl");
        assert!(matches!(err, IssuerError::InvalidTtl(_)));
    }

    #[tokio::test]
    async fn lookup_honours_the_request_deadline() {
        let reserver = Issuer::with_clock(Arc::new(PendingRegistry), fixed_clock())
            .reserver(asset_id(0xa1));
        let ctx = RequestContext::with_timeout(Duration::from_millis(20));

        let err = reserver
            .reserve_issuance(&ctx, &a1(1), Duration::from_secs(60))
            .await
            .expect_err("registry never answers");

        assert!(matches!(
            err,
            IssuerError::AssetNotFound {
                source: RegistryError::DeadlineExceeded,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn lookup_stops_when_request_is_cancelled() {
        let reserver = Issuer::with_clock(Arc::new(PendingRegistry), fixed_clock())
            .reserver(asset_id(0xa1));
        let (ctx, handle) = RequestContext::background().cancellable();

        let lookup = tokio::spawn(async move {
            reserver
                .reserve_issuance(&ctx, &a1(1), Duration::from_secs(60))
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let err = lookup.await.expect("task joins").expect_err("cancelled");
        assert!(matches!(
            err,
            IssuerError::AssetNotFound {
                source: RegistryError::Cancelled,
                ..
            }
        ));
    }

    #[test]
    fn key_index_must_match_signer_metadata() {
        let mut policy = policy(0xa1, 2, 3, 5);
        policy.key_index = 6;

        let err = build_witness_template(&policy, a1(1)).expect_err("mismatched key index");

        assert!(matches!(
            err,
            IssuerError::KeyIndexMismatch {
                asset_key_index: 6,
                signer_key_index: 5,
                ..
            }
        ));
    }

    #[test]
    fn redeem_keys_must_be_derived_at_the_asset_path() {
        let mut policy = policy(0xa1, 2, 3, 5);
        // Redeem program of the same signer derived at another index.
        policy.redeem_program = crate::test_support::policy(0xa1, 2, 3, 6).redeem_program;

        let err = build_witness_template(&policy, a1(1)).expect_err("keys differ");

        assert!(matches!(err, IssuerError::RedeemKeysMismatch { position: 0 }));
    }

    #[test]
    fn signer_key_count_must_match_redeem_program() {
        let mut policy = policy(0xa1, 2, 3, 5);
        policy.signer.xpubs.push(xpub(9));

        let err = build_witness_template(&policy, a1(1)).expect_err("extra signer key");

        assert!(matches!(
            err,
            IssuerError::RedeemKeyCountMismatch {
                signer_keys: 4,
                redeem_keys: 3
            }
        ));
    }

    #[test]
    fn signer_quorum_must_match_redeem_threshold() {
        let mut policy = policy(0xa1, 2, 3, 5);
        policy.signer.quorum = 3;

        let err = build_witness_template(&policy, a1(1)).expect_err("quorum differs");

        assert!(matches!(
            err,
            IssuerError::QuorumMismatch {
                redeem: 2,
                signer: 3
            }
        ));
    }

    #[test]
    fn account_signers_cannot_issue() {
        let mut policy = policy(0xa1, 2, 3, 5);
        policy.signer.key_space = KeySpace::Account;

        let err = build_witness_template(&policy, a1(1)).expect_err("account key space");

        assert!(matches!(
            err,
            IssuerError::WrongKeySpace {
                actual: KeySpace::Account,
                ..
            }
        ));
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn legacy_issue_balances_single_destination() {
        let recorder = RecordingRecorder::default();
        let destinations = vec![Destination::new(a1(1_000), wallet_program())];

        let template = issuer()
            .issue(&RequestContext::background(), &recorder, a1(1_000), destinations)
            .await
            .expect("balanced issuance");

        let transaction = &template.transaction;
        assert_eq!(transaction.inputs.len(), 1);
        assert_eq!(transaction.inputs[0].asset_amount().amount, 1_000);
        assert_eq!(transaction.output_total(asset_id(0xa1)), 1_000);
        assert_eq!(transaction.not_after_ms - transaction.not_before_ms, 60_000);
        let TxInput::Issuance(input) = &transaction.inputs[0];
        assert!(input.asset_definition.is_empty());
        assert!(input.reference_data.is_empty());

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "issuer.issue");
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn legacy_issue_records_elapsed_time_on_failure() {
        let recorder = RecordingRecorder::default();
        let destinations = vec![Destination::new(a1(999), wallet_program())];

        let err = issuer()
            .issue(&RequestContext::background(), &recorder, a1(1_000), destinations)
            .await
            .expect_err("unbalanced");

        assert!(matches!(err, BuildError::Unbalanced { .. }));
        assert_eq!(recorder.records().len(), 1);
    }
}
