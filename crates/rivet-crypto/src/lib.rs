//! # rivet-crypto
//!
//! Hashing primitives for rivet.
//!
//! - Keccak-256 over raw bytes, hex-encoded data and concatenated parts

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;

pub use error::CryptoError;
pub use hash::{keccak256, keccak256_concat, keccak256_hex};
