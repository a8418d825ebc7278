//! Keccak-256 hashing

use rivet_primitives::H256;
use sha3::{Digest, Keccak256};

use crate::CryptoError;

/// Compute Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    H256::from_bytes(result.into())
}

/// Compute Keccak-256 over the concatenation of `parts` without copying them
pub fn keccak256_concat<'a, I>(parts: I) -> H256
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    H256::from_bytes(hasher.finalize().into())
}

/// Hash `0x`-prefixed hex data (the prefix is optional)
pub fn keccak256_hex(data: &str) -> Result<H256, CryptoError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(digits).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    Ok(keccak256(&bytes))
}
