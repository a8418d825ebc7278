//! Cryptographic errors

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Input was not valid hex data
    #[error("invalid hex input: {0}")]
    InvalidHex(String),
}
