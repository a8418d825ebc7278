//! Parser for the Solidity type grammar

use super::types::ParamType;
use crate::SdkError;

/// Parse a type string (`uint256`, `bytes32[]`, `(address,uint8)[2]`, ...)
pub fn parse_type(s: &str) -> Result<ParamType, SdkError> {
    let s = s.trim();

    if let Some(body) = s.strip_suffix(']') {
        let open = body
            .rfind('[')
            .ok_or_else(|| invalid(s, "unbalanced brackets"))?;
        let inner = parse_type(&body[..open])?;
        let size = &body[open + 1..];
        if size.is_empty() {
            return Ok(ParamType::Array(Box::new(inner)));
        }
        let size: usize = size
            .parse()
            .map_err(|_| invalid(s, "invalid array size"))?;
        if size == 0 {
            return Err(invalid(s, "fixed array size must be positive"));
        }
        return addressable(s, ParamType::FixedArray(Box::new(inner), size));
    }

    if let Some(body) = s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        let components = split_components(body)?
            .into_iter()
            .map(parse_type)
            .collect::<Result<Vec<_>, _>>()?;
        return addressable(s, ParamType::Tuple(components));
    }

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        _ => {}
    }

    // uint<N> / int<N>, bare forms alias the 256-bit width
    if let Some(rest) = s.strip_prefix("uint") {
        return Ok(ParamType::Uint(parse_int_width(s, rest)?));
    }
    if let Some(rest) = s.strip_prefix("int") {
        return Ok(ParamType::Int(parse_int_width(s, rest)?));
    }

    // bytes<N>
    if let Some(rest) = s.strip_prefix("bytes") {
        let size: usize = rest
            .parse()
            .map_err(|_| invalid(s, "invalid bytes size"))?;
        if !(1..=32).contains(&size) {
            return Err(invalid(s, "bytes size must be within 1..=32"));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(invalid(s, "unknown type"))
}

/// Reject static types whose head width overflows `usize`
fn addressable(s: &str, ty: ParamType) -> Result<ParamType, SdkError> {
    match ty.checked_head_length() {
        Some(_) => Ok(ty),
        None => Err(invalid(s, "fixed array too large")),
    }
}

fn parse_int_width(full: &str, rest: &str) -> Result<usize, SdkError> {
    if rest.is_empty() {
        return Ok(256);
    }
    let bits: usize = rest
        .parse()
        .map_err(|_| invalid(full, "invalid integer width"))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(invalid(full, "integer width must be a multiple of 8 up to 256"));
    }
    Ok(bits)
}

/// Split a tuple body on top-level commas
fn split_components(body: &str) -> Result<Vec<&str>, SdkError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        if depth < 0 {
            return Err(invalid(body, "unbalanced parentheses"));
        }
    }
    if depth != 0 {
        return Err(invalid(body, "unbalanced parentheses"));
    }
    parts.push(&body[start..]);
    Ok(parts)
}

fn invalid(s: &str, reason: &str) -> SdkError {
    SdkError::InvalidAbi(format!("{}: {}", reason, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_type("address").unwrap(), ParamType::Address);
        assert_eq!(parse_type("uint256").unwrap(), ParamType::Uint(256));
        assert_eq!(parse_type("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(parse_type("int").unwrap(), ParamType::Int(256));
        assert_eq!(parse_type("uint8").unwrap(), ParamType::Uint(8));
        assert_eq!(parse_type("int24").unwrap(), ParamType::Int(24));
        assert_eq!(parse_type("bool").unwrap(), ParamType::Bool);
        assert_eq!(parse_type("bytes").unwrap(), ParamType::Bytes);
        assert_eq!(parse_type("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert_eq!(parse_type("string").unwrap(), ParamType::String);
    }

    #[test]
    fn test_parse_arrays() {
        assert_eq!(
            parse_type("bytes32[]").unwrap(),
            ParamType::Array(Box::new(ParamType::FixedBytes(32)))
        );
        assert_eq!(
            parse_type("uint256[2][]").unwrap(),
            ParamType::Array(Box::new(ParamType::FixedArray(
                Box::new(ParamType::Uint(256)),
                2
            )))
        );
    }

    #[test]
    fn test_parse_tuples() {
        let ty = parse_type("(uint256,(address,bytes)[],bool)").unwrap();
        assert_eq!(
            ty,
            ParamType::Tuple(vec![
                ParamType::Uint(256),
                ParamType::Array(Box::new(ParamType::Tuple(vec![
                    ParamType::Address,
                    ParamType::Bytes
                ]))),
                ParamType::Bool,
            ])
        );
        assert_eq!(parse_type("()").unwrap(), ParamType::Tuple(vec![]));
    }

    #[test]
    fn test_canonical_round_trip() {
        for s in ["uint8[3]", "(int256,string)[]", "bytes4", "address[][2]"] {
            assert_eq!(parse_type(s).unwrap().to_string(), s);
        }
        assert_eq!(parse_type("uint[]").unwrap().to_string(), "uint256[]");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_type("uint7").is_err());
        assert!(parse_type("uint512").is_err());
        assert!(parse_type("bytes0").is_err());
        assert!(parse_type("bytes33").is_err());
        assert!(parse_type("uint256[0]").is_err());
        assert!(parse_type("uint256]").is_err());
        assert!(parse_type("(uint256").is_err());
        assert!(parse_type("float").is_err());
    }

    #[test]
    fn test_parse_oversize_fixed_array() {
        assert!(matches!(
            parse_type("uint8[4611686018427387904]"),
            Err(SdkError::InvalidAbi(_))
        ));
        assert!(parse_type("uint256[99999999999999999999999]").is_err());
        // Each dimension fits, the product does not
        assert!(matches!(
            parse_type("uint8[4294967296][4294967296]"),
            Err(SdkError::InvalidAbi(_))
        ));
        assert!(matches!(
            parse_type("(uint8[288230376151711744],uint8[288230376151711744])"),
            Err(SdkError::InvalidAbi(_))
        ));
        // Dynamic elements occupy one head word regardless of count
        assert_eq!(
            parse_type("string[4611686018427387904]").unwrap().head_length(),
            32
        );
    }
}
