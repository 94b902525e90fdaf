//! Derivation paths for signer keys.

use simplicityhl::elements::bitcoin::Network;
use simplicityhl::elements::bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv, Xpub};
use simplicityhl::elements::bitcoin::secp256k1::{PublicKey, Secp256k1};

use crate::asset::KeySpace;
use crate::error::IssuerError;
use crate::txbuilder::KeyPath;

/// Path `[key_space, key_index]` of unhardened children.
///
/// Signers and verifiers recompute the same keys from the extended public keys,
/// so every component has to stay below the hardened range.
pub fn path(key_space: KeySpace, key_index: u64) -> Result<DerivationPath, IssuerError> {
    let item = u32::try_from(key_index)
        .ok()
        .and_then(|index| ChildNumber::from_normal_idx(index).ok())
        .ok_or(IssuerError::KeyIndexOutOfRange(key_index))?;

    Ok(DerivationPath::from(vec![
        ChildNumber::from_normal_idx(key_space.index())?,
        item,
    ]))
}

/// Child public key of every xpub at `path`, in xpub order.
pub fn derive_keys(xpubs: &[Xpub], path: &DerivationPath) -> Result<Vec<PublicKey>, IssuerError> {
    let secp = Secp256k1::verification_only();

    xpubs
        .iter()
        .map(|xpub| Ok(xpub.derive_pub(&secp, path)?.public_key))
        .collect()
}

/// Pair each xpub with `path`, keeping xpub order.
#[must_use]
pub fn key_paths(xpubs: &[Xpub], path: &DerivationPath) -> Vec<KeyPath> {
    xpubs
        .iter()
        .map(|xpub| KeyPath {
            xpub: *xpub,
            derivation_path: path.clone(),
        })
        .collect()
}

/// `m/`-prefixed rendering of `path`, e.g. `m/0/5`.
#[must_use]
pub fn path_string(path: &DerivationPath) -> String {
    let children: &[ChildNumber] = path.as_ref();

    children
        .iter()
        .fold(String::from("m"), |rendered, child| format!("{rendered}/{child}"))
}

/// Master extended public key for `seed`.
pub fn master_xpub(network: Network, seed: &[u8]) -> Result<Xpub, IssuerError> {
    let master = Xpriv::new_master(network, seed)?;
    Ok(Xpub::from_priv(&Secp256k1::signing_only(), &master))
}
