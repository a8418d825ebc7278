//! ABI encoding and decoding for Solidity contracts
//!
//! This module provides functionality for:
//! - Encoding function arguments and decoding return values
//! - Computing function selectors and event topics
//! - Tightly packed hashing for off-chain commitments
//! - Parsing the JSON ABI schema and the type grammar
//!
//! # Example
//!
//! ```rust
//! use rivet_sdk::abi::{encode, decode, function_selector, Token, ParamType};
//! use rivet_primitives::{Address, U256};
//!
//! let types = [ParamType::Address, ParamType::Uint(256)];
//! let tokens = [Token::Address(Address::ZERO), Token::Uint(U256::from(1000))];
//! let selector = function_selector("transfer(address,uint256)");
//! let data = encode(&types, &tokens).unwrap();
//!
//! assert_eq!(selector, [0xa9, 0x05, 0x9c, 0xbb]);
//! assert_eq!(decode(&types, &data).unwrap(), tokens);
//! ```

mod decode;
mod encode;
mod json;
mod packed;
mod parse;
mod types;
mod value;

pub use decode::{decode, decode_output};
pub use encode::{encode, encode_function_call, function_selector, signature};
pub use json::{Abi, AbiConstructor, AbiEvent, AbiFunction, Param, StateMutability};
pub use packed::{encode_packed, tightly_packed_keccak256};
pub use parse::parse_type;
pub use rivet_crypto::keccak256;
pub use types::{I256, ParamType, Token};
