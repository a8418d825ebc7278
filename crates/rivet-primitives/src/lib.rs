//! # rivet-primitives
//!
//! Primitive types shared by the rivet crates: 20-byte addresses,
//! 32-byte hashes and the 256-bit unsigned integer.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use hash::{H256, HashError};

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Block number type
pub type BlockNumber = u64;

/// Gas type
pub type Gas = u64;

/// Format a quantity as a minimal `0x`-prefixed hex string (`0x0` for zero)
pub fn to_quantity(value: &U256) -> String {
    format!("0x{:x}", value)
}

/// Parse a `0x`-prefixed hex quantity into a U256
pub fn parse_quantity(s: &str) -> Result<U256, PrimitiveError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Err(PrimitiveError::InvalidQuantity(s.to_string()));
    }
    U256::from_str_radix(digits, 16).map_err(|_| PrimitiveError::InvalidQuantity(s.to_string()))
}
