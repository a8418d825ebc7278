//! Tightly packed (non-standard) encoding, as Solidity's `abi.encodePacked`
//!
//! Values are concatenated at their declared byte width with no offsets or
//! length prefixes. Array elements are the exception: each one is padded to
//! a full 32-byte word. The result is only meant for hashing.

use rivet_primitives::{H256, U256};

use super::encode::u256_to_bytes;
use super::types::{ParamType, Token};
use crate::SdkError;

/// Tightly pack `tokens` according to `types`
pub fn encode_packed(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    if types.len() != tokens.len() {
        return Err(SdkError::TypeMismatch(format!(
            "expected {} values, got {}",
            types.len(),
            tokens.len()
        )));
    }
    let mut out = Vec::new();
    for (param_type, token) in types.iter().zip(tokens) {
        param_type.check(token)?;
        pack_token(param_type, token, false, &mut out)?;
    }
    Ok(out)
}

/// keccak256 of the tightly packed encoding (Solidity `keccak256(abi.encodePacked(...))`)
pub fn tightly_packed_keccak256(types: &[ParamType], tokens: &[Token]) -> Result<H256, SdkError> {
    Ok(rivet_crypto::keccak256(&encode_packed(types, tokens)?))
}

fn pack_token(
    param_type: &ParamType,
    token: &Token,
    in_array: bool,
    out: &mut Vec<u8>,
) -> Result<(), SdkError> {
    match (param_type, token) {
        (ParamType::Address, Token::Address(addr)) => {
            if in_array {
                out.extend_from_slice(&[0u8; 12]);
            }
            out.extend_from_slice(addr.as_bytes());
        }
        (ParamType::Uint(bits), Token::Uint(value)) => pack_word(value, *bits, in_array, out),
        (ParamType::Int(bits), Token::Int(value)) => {
            pack_word(&value.to_word(), *bits, in_array, out)
        }
        (ParamType::Int(bits), Token::Uint(value)) => pack_word(value, *bits, in_array, out),
        (ParamType::Bool, Token::Bool(b)) => {
            if in_array {
                out.extend_from_slice(&[0u8; 31]);
            }
            out.push(u8::from(*b));
        }
        (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
            out.extend_from_slice(data);
            if in_array {
                out.extend(std::iter::repeat(0u8).take(32 - size));
            }
        }
        (ParamType::Bytes, Token::Bytes(data)) if !in_array => out.extend_from_slice(data),
        (ParamType::String, Token::String(s)) if !in_array => out.extend_from_slice(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(items))
        | (ParamType::FixedArray(inner, _), Token::FixedArray(items)) => {
            if inner.is_dynamic() || matches!(**inner, ParamType::FixedArray(..)) {
                return Err(SdkError::TypeMismatch(format!(
                    "{} cannot be tightly packed",
                    param_type
                )));
            }
            for item in items {
                pack_token(inner, item, true, out)?;
            }
        }
        _ => {
            return Err(SdkError::TypeMismatch(format!(
                "{} cannot be tightly packed",
                param_type
            )))
        }
    }
    Ok(())
}

/// Big-endian value truncated to `bits`, or a full word inside arrays
fn pack_word(value: &U256, bits: usize, in_array: bool, out: &mut Vec<u8>) {
    let word = u256_to_bytes(value);
    let width = if in_array { 32 } else { bits / 8 };
    out.extend_from_slice(&word[32 - width..]);
}
