//! ABI decoding

use rivet_primitives::{Address, U256};

use super::types::{I256, ParamType, Token};
use crate::SdkError;

/// Decode tokens from ABI-encoded data
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    decode_params(types, data, 0)
}

/// Decode function return data
pub fn decode_output(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    decode(types, data)
}

/// Decode one head/tail block starting at `base`
fn decode_params(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, SdkError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut head = base;

    for param_type in types {
        if param_type.is_dynamic() {
            let offset = read_usize(data, head)?;
            let start = base
                .checked_add(offset)
                .ok_or_else(|| malformed(format!("offset {} overflows", offset)))?;
            if start >= data.len() {
                return Err(malformed(format!(
                    "offset {} points outside {} bytes of data",
                    start,
                    data.len()
                )));
            }
            tokens.push(decode_at(param_type, data, start)?);
            head += 32;
        } else {
            tokens.push(decode_at(param_type, data, head)?);
            head = head.saturating_add(param_type.head_length());
        }
    }

    Ok(tokens)
}

/// Decode the value of `param_type` whose encoding begins at `pos`
fn decode_at(param_type: &ParamType, data: &[u8], pos: usize) -> Result<Token, SdkError> {
    match param_type {
        ParamType::Address => {
            let word = read_word(data, pos)?;
            if word[..12].iter().any(|b| *b != 0) {
                return Err(malformed("address word has non-zero padding"));
            }
            let mut addr_bytes = [0u8; 20];
            addr_bytes.copy_from_slice(&word[12..32]);
            Ok(Token::Address(Address::from_bytes(addr_bytes)))
        }
        ParamType::Uint(bits) => {
            let value = U256::from_big_endian(read_word(data, pos)?);
            if value.bits() > *bits {
                return Err(malformed(format!("value overflows uint{}", bits)));
            }
            Ok(Token::Uint(value))
        }
        ParamType::Int(bits) => {
            let value = I256::from_word(U256::from_big_endian(read_word(data, pos)?));
            if !value.fits(*bits) {
                return Err(malformed(format!("value overflows int{}", bits)));
            }
            Ok(Token::Int(value))
        }
        ParamType::Bool => {
            let word = read_word(data, pos)?;
            if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                return Err(malformed("bool word is neither 0 nor 1"));
            }
            Ok(Token::Bool(word[31] == 1))
        }
        ParamType::FixedBytes(size) => {
            let word = read_word(data, pos)?;
            if word[*size..].iter().any(|b| *b != 0) {
                return Err(malformed(format!("bytes{} has non-zero padding", size)));
            }
            Ok(Token::FixedBytes(word[..*size].to_vec()))
        }
        ParamType::Bytes => Ok(Token::Bytes(decode_bytes(data, pos)?)),
        ParamType::String => {
            let bytes = decode_bytes(data, pos)?;
            let s = String::from_utf8(bytes)
                .map_err(|e| malformed(format!("invalid UTF-8: {}", e)))?;
            Ok(Token::String(s))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, pos)?;
            let body = pos + 32;
            // Every element takes at least one word in the head
            if len > data.len().saturating_sub(body) / 32 {
                return Err(malformed(format!("array length {} exceeds data", len)));
            }
            let inner_types = vec![(**inner).clone(); len];
            Ok(Token::Array(decode_params(&inner_types, data, body)?))
        }
        ParamType::FixedArray(inner, size) => {
            // Bound the element count by the data before allocating
            let width = if inner.is_dynamic() { 32 } else { inner.head_length() };
            let available = data.len().saturating_sub(pos);
            if size
                .checked_mul(width.max(32))
                .map_or(true, |needed| needed > available)
            {
                return Err(malformed(format!(
                    "fixed array of {} elements exceeds data",
                    size
                )));
            }
            let inner_types = vec![(**inner).clone(); *size];
            Ok(Token::FixedArray(decode_params(&inner_types, data, pos)?))
        }
        ParamType::Tuple(types) => Ok(Token::Tuple(decode_params(types, data, pos)?)),
    }
}

/// Decode dynamic bytes whose length word is at `pos`
fn decode_bytes(data: &[u8], pos: usize) -> Result<Vec<u8>, SdkError> {
    let len = read_usize(data, pos)?;
    let start = pos + 32;
    let end = start
        .checked_add(len)
        .ok_or_else(|| malformed(format!("length {} overflows", len)))?;
    // Content is right-padded to a word boundary
    let padded = end
        .checked_add((32 - len % 32) % 32)
        .ok_or_else(|| malformed(format!("length {} overflows", len)))?;
    check_length(data, padded)?;
    Ok(data[start..end].to_vec())
}

/// Borrow the 32-byte word at `pos`
fn read_word(data: &[u8], pos: usize) -> Result<&[u8], SdkError> {
    let end = pos
        .checked_add(32)
        .ok_or_else(|| malformed(format!("position {} overflows", pos)))?;
    check_length(data, end)?;
    Ok(&data[pos..end])
}

/// Read a word holding an offset or length
fn read_usize(data: &[u8], pos: usize) -> Result<usize, SdkError> {
    let value = U256::from_big_endian(read_word(data, pos)?);
    if value > U256::from(usize::MAX) {
        return Err(malformed(format!("offset or length {} too large", value)));
    }
    Ok(value.as_usize())
}

/// Check that data has at least `required` bytes
fn check_length(data: &[u8], required: usize) -> Result<(), SdkError> {
    if data.len() < required {
        return Err(malformed(format!(
            "Insufficient data: need {} bytes, have {}",
            required,
            data.len()
        )));
    }
    Ok(())
}

fn malformed(message: impl Into<String>) -> SdkError {
    SdkError::MalformedData(message.into())
}
