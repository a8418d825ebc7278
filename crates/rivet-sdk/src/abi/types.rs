//! ABI type definitions

use std::fmt;

use rivet_primitives::{Address, H256, U256};

use crate::SdkError;

/// Solidity ABI token types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Address (20 bytes)
    Address(Address),
    /// Unsigned integer (8-256 bits)
    Uint(U256),
    /// Signed integer (8-256 bits)
    Int(I256),
    /// Boolean
    Bool(bool),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// Fixed-size bytes (1-32)
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Dynamic array
    Array(Vec<Token>),
    /// Fixed-size array
    FixedArray(Vec<Token>),
    /// Tuple (struct)
    Tuple(Vec<Token>),
}

/// Signed 256-bit integer in sign-magnitude form
///
/// Zero is always non-negative, so equal values compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I256 {
    /// Absolute value
    pub abs: U256,
    /// Sign (true if negative)
    pub negative: bool,
}

impl I256 {
    /// Create a new I256
    pub fn new(abs: U256, negative: bool) -> Self {
        Self {
            abs,
            negative: negative && !abs.is_zero(),
        }
    }

    /// Create from i128
    pub fn from_i128(value: i128) -> Self {
        Self::new(U256::from(value.unsigned_abs()), value < 0)
    }

    /// Parse a decimal string with optional leading `-`
    pub fn from_dec_str(s: &str) -> Result<Self, SdkError> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let abs = U256::from_dec_str(digits)
            .map_err(|_| SdkError::TypeMismatch(format!("not a decimal integer: {}", s)))?;
        Ok(Self::new(abs, negative))
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.abs.is_zero()
    }

    /// Whether the value fits into a signed integer of `bits` width
    pub fn fits(&self, bits: usize) -> bool {
        if bits == 0 || bits > 256 {
            return false;
        }
        let limit = U256::one() << (bits - 1);
        if self.negative {
            self.abs <= limit
        } else {
            self.abs < limit
        }
    }

    /// Two's complement 256-bit word
    pub fn to_word(&self) -> U256 {
        if self.negative {
            (!self.abs).overflowing_add(U256::one()).0
        } else {
            self.abs
        }
    }

    /// Interpret a 256-bit word as two's complement
    pub fn from_word(word: U256) -> Self {
        if word.bit(255) {
            Self::new((!word).overflowing_add(U256::one()).0, true)
        } else {
            Self::new(word, false)
        }
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.abs)
        } else {
            write!(f, "{}", self.abs)
        }
    }
}

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Address
    Address,
    /// Unsigned integer with bit size (8, 16, ..., 256)
    Uint(usize),
    /// Signed integer with bit size
    Int(usize),
    /// Boolean
    Bool,
    /// Dynamic bytes
    Bytes,
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// UTF-8 string
    String,
    /// Dynamic array
    Array(Box<ParamType>),
    /// Fixed-size array
    FixedArray(Box<ParamType>, usize),
    /// Tuple
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Check if this type is dynamic (variable length)
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(types) => types.iter().any(|t| t.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of an enclosing block
    ///
    /// Saturates at `usize::MAX` for fixed arrays too large to address.
    pub fn head_length(&self) -> usize {
        self.checked_head_length().unwrap_or(usize::MAX)
    }

    /// Head width, or `None` if it overflows `usize`
    pub fn checked_head_length(&self) -> Option<usize> {
        match self {
            ParamType::FixedArray(inner, size) if !self.is_dynamic() => {
                inner.checked_head_length()?.checked_mul(*size)
            }
            ParamType::Tuple(types) if !self.is_dynamic() => types
                .iter()
                .try_fold(0usize, |total, t| total.checked_add(t.checked_head_length()?)),
            _ => Some(32),
        }
    }

    /// Whether `token` can be encoded as this type
    pub fn accepts(&self, token: &Token) -> bool {
        self.check(token).is_ok()
    }

    /// Validate that `token` is representable as this type
    pub fn check(&self, token: &Token) -> Result<(), SdkError> {
        let mismatch = || SdkError::TypeMismatch(format!("{:?} is not a valid {}", token, self));
        match (self, token) {
            (ParamType::Address, Token::Address(_)) => Ok(()),
            (ParamType::Bool, Token::Bool(_)) => Ok(()),
            (ParamType::Bytes, Token::Bytes(_)) => Ok(()),
            (ParamType::String, Token::String(_)) => Ok(()),
            (ParamType::Uint(bits), Token::Uint(value)) => {
                if value.bits() <= *bits {
                    Ok(())
                } else {
                    Err(SdkError::TypeMismatch(format!("{} overflows uint{}", value, bits)))
                }
            }
            (ParamType::Int(bits), Token::Int(value)) => {
                if value.fits(*bits) {
                    Ok(())
                } else {
                    Err(SdkError::TypeMismatch(format!("{} overflows int{}", value, bits)))
                }
            }
            // Non-negative unsigned values are accepted for signed slots
            (ParamType::Int(bits), Token::Uint(value)) => {
                if I256::new(*value, false).fits(*bits) {
                    Ok(())
                } else {
                    Err(SdkError::TypeMismatch(format!("{} overflows int{}", value, bits)))
                }
            }
            (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
                if data.len() == *size {
                    Ok(())
                } else {
                    Err(SdkError::TypeMismatch(format!(
                        "bytes{} given {} bytes",
                        size,
                        data.len()
                    )))
                }
            }
            (ParamType::Array(inner), Token::Array(items)) => {
                items.iter().try_for_each(|item| inner.check(item))
            }
            (ParamType::FixedArray(inner, size), Token::FixedArray(items)) => {
                if items.len() != *size {
                    return Err(SdkError::TypeMismatch(format!(
                        "{} expects {} elements, got {}",
                        self,
                        size,
                        items.len()
                    )));
                }
                items.iter().try_for_each(|item| inner.check(item))
            }
            (ParamType::Tuple(types), Token::Tuple(items)) => {
                if items.len() != types.len() {
                    return Err(SdkError::TypeMismatch(format!(
                        "{} expects {} fields, got {}",
                        self,
                        types.len(),
                        items.len()
                    )));
                }
                types.iter().zip(items).try_for_each(|(t, item)| t.check(item))
            }
            _ => Err(mismatch()),
        }
    }
}

/// Canonical form used in signatures (`uint256`, `(address,bytes)[2]`)
impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Int(bits) => write!(f, "int{}", bits),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::FixedBytes(size) => write!(f, "bytes{}", size),
            ParamType::String => write!(f, "string"),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
            ParamType::FixedArray(inner, size) => write!(f, "{}[{}]", inner, size),
            ParamType::Tuple(types) => {
                write!(f, "(")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Token {
    /// Create an address token
    pub fn address(addr: Address) -> Self {
        Token::Address(addr)
    }

    /// Create a uint256 token
    pub fn uint256(value: U256) -> Self {
        Token::Uint(value)
    }

    /// Create a uint256 from u128
    pub fn uint256_from_u128(value: u128) -> Self {
        Token::Uint(U256::from(value))
    }

    /// Create an int token from i128
    pub fn int_from_i128(value: i128) -> Self {
        Token::Int(I256::from_i128(value))
    }

    /// Create a bool token
    pub fn bool(value: bool) -> Self {
        Token::Bool(value)
    }

    /// Create a bytes token
    pub fn bytes(data: Vec<u8>) -> Self {
        Token::Bytes(data)
    }

    /// Create a string token
    pub fn string(s: impl Into<String>) -> Self {
        Token::String(s.into())
    }

    /// Create a bytes32 token
    pub fn bytes32(data: H256) -> Self {
        Token::FixedBytes(data.as_bytes().to_vec())
    }

    /// Unsigned value, if this is a `Uint`
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Token::Uint(value) => Some(*value),
            _ => None,
        }
    }

    /// Address value, if this is an `Address`
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Boolean value, if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String value, if this is a `String`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }
}
