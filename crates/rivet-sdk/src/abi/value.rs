//! Conversion between ABI tokens and loosely typed JSON arguments
//!
//! Integers are accepted as JSON numbers, decimal strings or `0x` hex
//! strings. Bytes and addresses are `0x` hex strings. Arrays and tuples are
//! JSON arrays.

use rivet_primitives::{parse_quantity, Address, U256};
use serde_json::Value;

use super::types::{I256, ParamType, Token};
use crate::SdkError;

impl Token {
    /// Coerce a JSON value into a token of `param_type`
    pub fn from_json(param_type: &ParamType, value: &Value) -> Result<Token, SdkError> {
        let mismatch = || SdkError::TypeMismatch(format!("{} is not a valid {}", value, param_type));

        let token = match param_type {
            ParamType::Address => {
                let s = value.as_str().ok_or_else(mismatch)?;
                Token::Address(Address::from_hex(s).map_err(|_| mismatch())?)
            }
            ParamType::Uint(_) => Token::Uint(json_to_u256(value).ok_or_else(mismatch)?),
            ParamType::Int(_) => Token::Int(json_to_i256(value).ok_or_else(mismatch)?),
            ParamType::Bool => match value {
                Value::Bool(b) => Token::Bool(*b),
                Value::String(s) if s == "true" => Token::Bool(true),
                Value::String(s) if s == "false" => Token::Bool(false),
                _ => return Err(mismatch()),
            },
            ParamType::Bytes => Token::Bytes(json_to_bytes(value).ok_or_else(mismatch)?),
            ParamType::FixedBytes(_) => {
                Token::FixedBytes(json_to_bytes(value).ok_or_else(mismatch)?)
            }
            ParamType::String => Token::String(value.as_str().ok_or_else(mismatch)?.to_string()),
            ParamType::Array(inner) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                Token::Array(
                    items
                        .iter()
                        .map(|item| Token::from_json(inner, item))
                        .collect::<Result<_, _>>()?,
                )
            }
            ParamType::FixedArray(inner, _) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                Token::FixedArray(
                    items
                        .iter()
                        .map(|item| Token::from_json(inner, item))
                        .collect::<Result<_, _>>()?,
                )
            }
            ParamType::Tuple(types) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                if items.len() != types.len() {
                    return Err(mismatch());
                }
                Token::Tuple(
                    types
                        .iter()
                        .zip(items)
                        .map(|(t, item)| Token::from_json(t, item))
                        .collect::<Result<_, _>>()?,
                )
            }
        };

        // Range, length and arity checks
        param_type.check(&token)?;
        Ok(token)
    }

    /// Render as JSON (integers as decimal strings, bytes as `0x` hex)
    pub fn to_json(&self) -> Value {
        match self {
            Token::Address(addr) => Value::String(addr.to_hex()),
            Token::Uint(value) => Value::String(value.to_string()),
            Token::Int(value) => Value::String(value.to_string()),
            Token::Bool(b) => Value::Bool(*b),
            Token::Bytes(data) | Token::FixedBytes(data) => {
                Value::String(format!("0x{}", hex::encode(data)))
            }
            Token::String(s) => Value::String(s.clone()),
            Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => {
                Value::Array(items.iter().map(Token::to_json).collect())
            }
        }
    }
}

fn json_to_u256(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) if s.starts_with("0x") => parse_quantity(s).ok(),
        Value::String(s) => U256::from_dec_str(s).ok(),
        _ => None,
    }
}

fn json_to_i256(value: &Value) -> Option<I256> {
    match value {
        Value::Number(n) => n.as_i64().map(|v| I256::from_i128(v as i128)),
        Value::String(s) if s.starts_with("0x") => parse_quantity(s).ok().map(|v| I256::new(v, false)),
        Value::String(s) => I256::from_dec_str(s).ok(),
        _ => None,
    }
}

fn json_to_bytes(value: &Value) -> Option<Vec<u8>> {
    let s = value.as_str()?;
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()
}
