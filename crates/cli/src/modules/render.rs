//! JSON views of reservations and templates for stdout.

use serde_json::{Value, json};

use issuer::{
    AssetAmount, ReserveResult, ReserveResultItem, Template, TemplateInput, TxInput, TxOutput,
    WitnessComponent, signers,
};

#[must_use]
pub fn reserve_result(result: &ReserveResult) -> Value {
    json!({
        "items": result.items.iter().map(reserve_item).collect::<Vec<_>>(),
    })
}

#[must_use]
pub fn template(template: &Template) -> Value {
    let transaction = &template.transaction;

    json!({
        "transaction": {
            "inputs": transaction.inputs.iter().map(tx_input).collect::<Vec<_>>(),
            "outputs": transaction.outputs.iter().map(tx_output).collect::<Vec<_>>(),
            "not_before_ms": transaction.not_before_ms,
            "not_after_ms": transaction.not_after_ms,
        },
        "signing_instructions": template
            .signing_instructions
            .iter()
            .map(template_input)
            .collect::<Vec<_>>(),
    })
}

fn reserve_item(item: &ReserveResultItem) -> Value {
    json!({
        "tx_input": tx_input(&item.tx_input),
        "template_input": template_input(&item.template_input),
    })
}

fn tx_input(input: &TxInput) -> Value {
    match input {
        TxInput::Issuance(issuance) => json!({
            "type": "issuance",
            "asset_id": issuance.asset_id.to_string(),
            "amount": issuance.amount,
            "not_before_ms": issuance.not_before_ms,
            "not_after_ms": issuance.not_after_ms,
            "genesis_hash": issuance.genesis_hash.to_string(),
            "issuance_program": hex::encode(issuance.issuance_program.as_bytes()),
            "asset_definition": hex::encode(&issuance.asset_definition),
            "reference_data": hex::encode(&issuance.reference_data),
            "nonce": hex::encode(&issuance.nonce),
        }),
        other => json!({
            "type": "unknown",
            "asset_id": other.asset_amount().asset_id.to_string(),
            "amount": other.asset_amount().amount,
        }),
    }
}

fn tx_output(output: &TxOutput) -> Value {
    json!({
        "asset_id": output.asset_amount.asset_id.to_string(),
        "amount": output.asset_amount.amount,
        "control_program": hex::encode(output.control_program.as_bytes()),
        "reference_data": hex::encode(&output.reference_data),
    })
}

fn template_input(input: &TemplateInput) -> Value {
    let AssetAmount { asset_id, amount } = input.asset_amount();

    json!({
        "asset_id": asset_id.to_string(),
        "amount": amount,
        "witness": input
            .witness_components()
            .iter()
            .map(witness_component)
            .collect::<Vec<_>>(),
    })
}

fn witness_component(component: &WitnessComponent) -> Value {
    match component {
        WitnessComponent::Signatures(requirement) => json!({
            "signatures": {
                "quorum": requirement.quorum(),
                "signed": requirement.signature_count(),
                "keys": requirement
                    .keys()
                    .iter()
                    .map(|key| json!({
                        "xpub": key.xpub.to_string(),
                        "path": signers::path_string(&key.derivation_path),
                    }))
                    .collect::<Vec<_>>(),
            }
        }),
        WitnessComponent::Data(data) => json!({ "data": hex::encode(data) }),
    }
}
