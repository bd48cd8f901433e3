//! Utility functions for ledger identifiers and record digests

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique transaction id then encode using bech32
pub fn new_tx_id() -> anyhow::Result<String> {
    new_uuid_to_bech32("tx_")
}

pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Hex sha256 of an encoded record. Identical record states give identical digests.
pub fn digest(bytes: &[u8]) -> String {
    sha256::digest(bytes)
}
