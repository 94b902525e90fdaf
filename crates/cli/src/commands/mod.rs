use simplicityhl::elements::bitcoin::Network;

pub mod asset;
pub mod issuance;

/// Network the signer master keys are encoded for.
const XPUB_NETWORK: Network = Network::Testnet;
