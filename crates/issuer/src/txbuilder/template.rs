use simplicityhl::elements::bitcoin::bip32::{DerivationPath, Xpub};
use simplicityhl::elements::{AssetId, Script};

use crate::asset::AssetAmount;
use crate::issuance::IssuanceInput;

/// Extended public key and the path its signing key is derived under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    pub xpub: Xpub,
    pub derivation_path: DerivationPath,
}

/// Signatures an input needs: `quorum` of the listed keys, in ledger key order.
///
/// Every key has one signature slot, empty until a signer fills it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRequirement {
    quorum: usize,
    keys: Vec<KeyPath>,
    signatures: Vec<Option<Vec<u8>>>,
}

impl SignatureRequirement {
    pub(crate) fn new(quorum: usize, keys: Vec<KeyPath>) -> Self {
        debug_assert!(quorum <= keys.len());
        Self {
            quorum,
            signatures: vec![None; keys.len()],
            keys,
        }
    }

    #[must_use]
    pub const fn quorum(&self) -> usize {
        self.quorum
    }

    #[must_use]
    pub fn keys(&self) -> &[KeyPath] {
        &self.keys
    }

    /// Slot per key, in key order.
    #[must_use]
    pub fn signatures(&self) -> &[Option<Vec<u8>>] {
        &self.signatures
    }

    /// Store the signature made by the key at `index`, returning the one it replaces.
    pub fn add_signature(
        &mut self,
        index: usize,
        signature: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, SignatureIndexError> {
        let len = self.signatures.len();
        let slot = self
            .signatures
            .get_mut(index)
            .ok_or(SignatureIndexError { index, len })?;

        Ok(slot.replace(signature))
    }

    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.signatures.iter().flatten().count()
    }

    /// Whether at least `quorum` slots are filled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.signature_count() >= self.quorum
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("signature index {index} is out of range for {len} keys")]
pub struct SignatureIndexError {
    pub index: usize,
    pub len: usize,
}

/// One element of an input's witness, in witness order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessComponent {
    Signatures(SignatureRequirement),
    Data(Vec<u8>),
}

/// Signing instructions for one transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInput {
    asset_amount: AssetAmount,
    witness_components: Vec<WitnessComponent>,
}

impl TemplateInput {
    #[must_use]
    pub const fn new(asset_amount: AssetAmount) -> Self {
        Self {
            asset_amount,
            witness_components: Vec::new(),
        }
    }

    pub fn add_witness_signatures(&mut self, requirement: SignatureRequirement) {
        self.witness_components
            .push(WitnessComponent::Signatures(requirement));
    }

    pub fn add_witness_data(&mut self, data: Vec<u8>) {
        self.witness_components.push(WitnessComponent::Data(data));
    }

    #[must_use]
    pub const fn asset_amount(&self) -> AssetAmount {
        self.asset_amount
    }

    #[must_use]
    pub fn witness_components(&self) -> &[WitnessComponent] {
        &self.witness_components
    }

    /// First signature component of the witness.
    #[must_use]
    pub fn signature_requirement(&self) -> Option<&SignatureRequirement> {
        self.witness_components
            .iter()
            .find_map(|component| match component {
                WitnessComponent::Signatures(requirement) => Some(requirement),
                WitnessComponent::Data(_) => None,
            })
    }

    pub fn signature_requirement_mut(&mut self) -> Option<&mut SignatureRequirement> {
        self.witness_components
            .iter_mut()
            .find_map(|component| match component {
                WitnessComponent::Signatures(requirement) => Some(requirement),
                WitnessComponent::Data(_) => None,
            })
    }

    /// Final witness element when it is raw data.
    #[must_use]
    pub fn trailing_witness_data(&self) -> Option<&[u8]> {
        match self.witness_components.last() {
            Some(WitnessComponent::Data(data)) => Some(data.as_slice()),
            _ => None,
        }
    }
}

/// Transaction input produced by a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TxInput {
    Issuance(IssuanceInput),
}

impl TxInput {
    #[must_use]
    pub const fn asset_amount(&self) -> AssetAmount {
        match self {
            Self::Issuance(input) => input.asset_amount(),
        }
    }

    /// Validity window in Unix milliseconds.
    #[must_use]
    pub const fn window(&self) -> (u64, u64) {
        match self {
            Self::Issuance(input) => (input.not_before_ms, input.not_after_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub asset_amount: AssetAmount,
    pub control_program: Script,
    pub reference_data: Vec<u8>,
}

/// Unsigned transaction body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxData {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub not_before_ms: u64,
    pub not_after_ms: u64,
}

impl TxData {
    /// Total amount of `asset_id` across all inputs.
    #[must_use]
    pub fn input_total(&self, asset_id: AssetId) -> u128 {
        self.inputs
            .iter()
            .map(TxInput::asset_amount)
            .filter(|amount| amount.asset_id == asset_id)
            .map(|amount| u128::from(amount.amount))
            .sum()
    }

    /// Total amount of `asset_id` across all outputs.
    #[must_use]
    pub fn output_total(&self, asset_id: AssetId) -> u128 {
        self.outputs
            .iter()
            .filter(|output| output.asset_amount.asset_id == asset_id)
            .map(|output| u128::from(output.asset_amount.amount))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveResultItem {
    pub tx_input: TxInput,
    pub template_input: TemplateInput,
}

/// Inputs obtained from one reservation, each with its signing instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveResult {
    pub items: Vec<ReserveResultItem>,
}

impl ReserveResult {
    #[must_use]
    pub fn single(tx_input: TxInput, template_input: TemplateInput) -> Self {
        Self {
            items: vec![ReserveResultItem {
                tx_input,
                template_input,
            }],
        }
    }
}

/// Unsigned transaction plus the signing instructions for each of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub transaction: TxData,
    /// Parallel to `transaction.inputs`.
    pub signing_instructions: Vec<TemplateInput>,
}
