//! Contract ABI definitions parsed from the standard JSON schema

use rivet_primitives::H256;
use serde::Deserialize;

use super::encode::{function_selector, signature};
use super::parse::parse_type;
use super::types::ParamType;
use crate::SdkError;

/// Function state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    /// Reads neither state nor environment
    Pure,
    /// Reads but never writes state
    View,
    /// Writes state, rejects value
    NonPayable,
    /// Writes state, accepts value
    Payable,
}

impl StateMutability {
    /// Whether calls never change state
    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

/// Named parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name (may be empty)
    pub name: String,
    /// Parameter type
    pub kind: ParamType,
    /// Indexed flag (events only)
    pub indexed: bool,
}

/// Contract function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiFunction {
    /// Function name
    pub name: String,
    /// Inputs
    pub inputs: Vec<Param>,
    /// Outputs
    pub outputs: Vec<Param>,
    /// Declared mutability
    pub state_mutability: StateMutability,
}

impl AbiFunction {
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        signature(&self.name, &self.input_types())
    }

    /// 4-byte selector
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// Input types in order
    pub fn input_types(&self) -> Vec<ParamType> {
        self.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Output types in order
    pub fn output_types(&self) -> Vec<ParamType> {
        self.outputs.iter().map(|p| p.kind.clone()).collect()
    }
}

/// Contract event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiEvent {
    /// Event name
    pub name: String,
    /// Inputs with indexed flags
    pub inputs: Vec<Param>,
    /// Anonymous events carry no topic0
    pub anonymous: bool,
}

impl AbiEvent {
    /// Canonical signature
    pub fn signature(&self) -> String {
        let types: Vec<ParamType> = self.inputs.iter().map(|p| p.kind.clone()).collect();
        signature(&self.name, &types)
    }

    /// keccak256 of the signature, used as the first log topic
    pub fn topic0(&self) -> H256 {
        rivet_crypto::keccak256(self.signature().as_bytes())
    }
}

/// Constructor entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiConstructor {
    /// Inputs
    pub inputs: Vec<Param>,
    /// Declared mutability
    pub state_mutability: StateMutability,
}

/// Parsed contract ABI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
    /// Functions in declaration order
    pub functions: Vec<AbiFunction>,
    /// Events in declaration order
    pub events: Vec<AbiEvent>,
    /// Constructor, if declared
    pub constructor: Option<AbiConstructor>,
    /// Whether a fallback function is declared
    pub fallback: bool,
    /// Whether a receive function is declared
    pub receive: bool,
}

impl Abi {
    /// Parse an ABI JSON array
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let entries: Vec<RawEntry> =
            serde_json::from_str(json).map_err(|e| SdkError::InvalidAbi(e.to_string()))?;
        let mut abi = Abi::default();

        for entry in entries {
            let state_mutability = entry.mutability();
            match entry.kind.as_str() {
                "function" => {
                    let name = entry
                        .name
                        .ok_or_else(|| SdkError::InvalidAbi("function without name".into()))?;
                    abi.functions.push(AbiFunction {
                        name,
                        inputs: resolve_params(&entry.inputs)?,
                        outputs: resolve_params(&entry.outputs)?,
                        state_mutability,
                    });
                }
                "event" => {
                    let name = entry
                        .name
                        .ok_or_else(|| SdkError::InvalidAbi("event without name".into()))?;
                    abi.events.push(AbiEvent {
                        name,
                        inputs: resolve_params(&entry.inputs)?,
                        anonymous: entry.anonymous,
                    });
                }
                "constructor" => {
                    abi.constructor = Some(AbiConstructor {
                        inputs: resolve_params(&entry.inputs)?,
                        state_mutability,
                    });
                }
                "fallback" => abi.fallback = true,
                "receive" => abi.receive = true,
                // Custom errors are not dispatched through the binding
                "error" => {}
                other => {
                    return Err(SdkError::InvalidAbi(format!("unknown entry type: {}", other)))
                }
            }
        }

        Ok(abi)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(default)]
    state_mutability: Option<StateMutability>,
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    payable: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

impl RawEntry {
    /// `stateMutability`, falling back to the legacy `constant`/`payable` flags
    fn mutability(&self) -> StateMutability {
        if let Some(m) = self.state_mutability {
            return m;
        }
        if self.payable == Some(true) {
            StateMutability::Payable
        } else if self.constant == Some(true) {
            StateMutability::View
        } else {
            StateMutability::NonPayable
        }
    }
}

fn default_entry_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    components: Option<Vec<RawParam>>,
    #[serde(default)]
    indexed: bool,
}

fn resolve_params(raw: &[RawParam]) -> Result<Vec<Param>, SdkError> {
    raw.iter()
        .map(|p| {
            Ok(Param {
                name: p.name.clone(),
                kind: resolve_type(p)?,
                indexed: p.indexed,
            })
        })
        .collect()
}

/// `tuple`, `tuple[]`, `tuple[2][]` take their shape from `components`
fn resolve_type(raw: &RawParam) -> Result<ParamType, SdkError> {
    let Some(suffix) = raw.kind.strip_prefix("tuple") else {
        return parse_type(&raw.kind);
    };
    let components = raw
        .components
        .as_deref()
        .ok_or_else(|| SdkError::InvalidAbi(format!("{} without components", raw.kind)))?;
    let fields = components
        .iter()
        .map(resolve_type)
        .collect::<Result<Vec<_>, _>>()?;
    let tuple = ParamType::Tuple(fields).to_string();
    parse_type(&format!("{}{}", tuple, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"constant":true,"inputs":[{"name":"_hash","type":"bytes32"}],"name":"state","outputs":[{"name":"","type":"uint8"}],"payable":false,"stateMutability":"view","type":"function"},
        {"constant":false,"inputs":[{"name":"sealedBid","type":"bytes32"}],"name":"newBid","outputs":[],"payable":true,"type":"function"},
        {"inputs":[{"name":"_ens","type":"address"}],"payable":false,"stateMutability":"nonpayable","type":"constructor"},
        {"anonymous":false,"inputs":[{"indexed":true,"name":"hash","type":"bytes32"},{"indexed":false,"name":"registrationDate","type":"uint256"}],"name":"AuctionStarted","type":"event"},
        {"inputs":[{"name":"orders","type":"tuple[]","components":[{"name":"maker","type":"address"},{"name":"amounts","type":"uint256[2]"}]}],"name":"fill","outputs":[],"stateMutability":"nonpayable","type":"function"},
        {"type":"fallback"}
    ]"#;

    #[test]
    fn test_parse_sample_abi() {
        let abi = Abi::from_json(SAMPLE).unwrap();
        assert_eq!(abi.functions.len(), 3);
        assert_eq!(abi.events.len(), 1);
        assert!(abi.constructor.is_some());
        assert!(abi.fallback);
        assert!(!abi.receive);

        let state = &abi.functions[0];
        assert_eq!(state.signature(), "state(bytes32)");
        assert_eq!(state.state_mutability, StateMutability::View);
        assert_eq!(state.output_types(), vec![ParamType::Uint(8)]);
    }

    #[test]
    fn test_legacy_payable_flag() {
        let abi = Abi::from_json(SAMPLE).unwrap();
        assert_eq!(abi.functions[1].state_mutability, StateMutability::Payable);
    }

    #[test]
    fn test_tuple_components() {
        let abi = Abi::from_json(SAMPLE).unwrap();
        assert_eq!(abi.functions[2].signature(), "fill((address,uint256[2])[])");
    }

    #[test]
    fn test_event_topic0() {
        let abi = Abi::from_json(
            r#"[{"type":"event","name":"Transfer","anonymous":false,"inputs":[
                {"name":"from","type":"address","indexed":true},
                {"name":"to","type":"address","indexed":true},
                {"name":"value","type":"uint256","indexed":false}]}]"#,
        )
        .unwrap();
        assert_eq!(
            abi.events[0].topic0().to_hex(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert!(abi.events[0].inputs[0].indexed);
    }

    #[test]
    fn test_default_entry_type_is_function() {
        let abi = Abi::from_json(r#"[{"name":"ping","inputs":[],"outputs":[]}]"#).unwrap();
        assert_eq!(abi.functions[0].state_mutability, StateMutability::NonPayable);
    }

    #[test]
    fn test_invalid_abi() {
        assert!(matches!(Abi::from_json("{}"), Err(SdkError::InvalidAbi(_))));
        assert!(Abi::from_json(r#"[{"type":"function","inputs":[]}]"#).is_err());
        assert!(Abi::from_json(r#"[{"type":"function","name":"f","inputs":[{"type":"tuple"}]}]"#)
            .is_err());
        assert!(Abi::from_json(r#"[{"type":"function","name":"f","inputs":[{"type":"uint7"}]}]"#)
            .is_err());
    }
}
