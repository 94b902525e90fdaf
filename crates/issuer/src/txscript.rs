//! Multisig redeem programs and the issuance programs that commit to them.

use sha2::{Digest, Sha256};
use simplicityhl::elements::Script;
use simplicityhl::elements::bitcoin::secp256k1::PublicKey;
use simplicityhl::elements::opcodes::{self, all};
use simplicityhl::elements::script::{Builder, Instruction};

use crate::error::RedeemProgramError;

/// Largest key count expressible with a small-integer opcode.
pub const MAX_MULTISIG_KEYS: usize = 16;

/// Threshold and ordered keys of a redeem program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigProgram {
    pub quorum: usize,
    pub keys: Vec<PublicKey>,
}

/// Number of signatures the redeem program requires.
pub fn sigs_required(program: &Script) -> Result<usize, RedeemProgramError> {
    parse_multisig(program).map(|multisig| multisig.quorum)
}

/// Parse `OP_m <key>... OP_n OP_CHECKMULTISIG` or `<key> OP_CHECKSIG`.
pub fn parse_multisig(program: &Script) -> Result<MultisigProgram, RedeemProgramError> {
    let instructions = program
        .instructions()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RedeemProgramError::Malformed(e.to_string()))?;

    match instructions.as_slice() {
        [Instruction::PushBytes(key), Instruction::Op(op)] if *op == all::OP_CHECKSIG => {
            Ok(MultisigProgram {
                quorum: 1,
                keys: vec![parse_key(key, 0)?],
            })
        }
        [
            Instruction::Op(required),
            keys @ ..,
            Instruction::Op(total),
            Instruction::Op(op),
        ] if *op == all::OP_CHECKMULTISIG => {
            let (Some(quorum), Some(total)) = (small_int(*required), small_int(*total)) else {
                return Err(RedeemProgramError::NotMultisig);
            };

            let keys = keys
                .iter()
                .enumerate()
                .map(|(index, instruction)| match instruction {
                    Instruction::PushBytes(key) => parse_key(key, index),
                    Instruction::Op(_) => Err(RedeemProgramError::NotMultisig),
                })
                .collect::<Result<Vec<_>, _>>()?;

            if keys.len() != total {
                return Err(RedeemProgramError::NotMultisig);
            }
            if quorum == 0 || quorum > total {
                return Err(RedeemProgramError::ThresholdOutOfRange {
                    required: quorum,
                    total,
                });
            }

            Ok(MultisigProgram { quorum, keys })
        }
        _ => Err(RedeemProgramError::NotMultisig),
    }
}

/// Build the canonical `quorum`-of-`keys.len()` redeem program.
pub fn multisig_program(quorum: usize, keys: &[PublicKey]) -> Result<Script, RedeemProgramError> {
    if keys.is_empty() || keys.len() > MAX_MULTISIG_KEYS || quorum == 0 || quorum > keys.len() {
        return Err(RedeemProgramError::ThresholdOutOfRange {
            required: quorum,
            total: keys.len(),
        });
    }

    let builder = keys
        .iter()
        .fold(Builder::new().push_int(small_int_value(quorum)), |builder, key| {
            builder.push_slice(&key.serialize())
        });

    Ok(builder
        .push_int(small_int_value(keys.len()))
        .push_opcode(all::OP_CHECKMULTISIG)
        .into_script())
}

/// Version 0 witness program committing to the SHA256 of `redeem_program`.
///
/// The redeem program is the last witness element of an issuance, so the issuance
/// program only needs its hash.
#[must_use]
pub fn issuance_program(redeem_program: &Script) -> Script {
    let hash: [u8; 32] = Sha256::digest(redeem_program.as_bytes()).into();

    Builder::new().push_int(0).push_slice(&hash).into_script()
}

fn parse_key(bytes: &[u8], index: usize) -> Result<PublicKey, RedeemProgramError> {
    PublicKey::from_slice(bytes).map_err(|_| RedeemProgramError::InvalidPublicKey { index })
}

fn small_int(op: opcodes::All) -> Option<usize> {
    let code = op.into_u8();
    let first = all::OP_PUSHNUM_1.into_u8();
    let last = all::OP_PUSHNUM_16.into_u8();

    (first..=last)
        .contains(&code)
        .then(|| usize::from(code - first + 1))
}

#[allow(clippy::cast_possible_wrap)]
const fn small_int_value(value: usize) -> i64 {
    value as i64
}
