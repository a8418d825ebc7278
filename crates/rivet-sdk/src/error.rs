//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Debug, Error)]
pub enum SdkError {
    /// Transport/network error
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC error from node
    #[error("RPC error: {code} - {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// A value is not representable in its declared ABI type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// ABI-encoded data is truncated or structurally invalid
    #[error("Malformed ABI data: {0}")]
    MalformedData(String),

    /// Several overloads accept the supplied arguments
    #[error("Ambiguous overload for `{name}`: candidates {candidates:?}")]
    AmbiguousOverload {
        /// Function name
        name: String,
        /// Matching canonical signatures
        candidates: Vec<String>,
    },

    /// A view/pure function was invoked through the write path
    #[error("Function `{0}` is view/pure and cannot be sent as a transaction")]
    InvalidMutabilityForSend(String),

    /// A state-changing function was called read-only without opting in
    #[error("Function `{0}` changes state; enable simulation to call it read-only")]
    SimulationNotAllowed(String),

    /// Value attached to a call of a non-payable function
    #[error("Function `{0}` is not payable")]
    NonPayableValue(String),

    /// No function with this name or signature
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// No event with this name or signature
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// ABI JSON could not be interpreted
    #[error("Invalid ABI: {0}")]
    InvalidAbi(String),

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Signer backend failure
    #[error("Signer error: {0}")]
    Signer(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),
}

impl SdkError {
    /// Node-reported error meaning the transaction is not (yet) known
    pub fn is_unknown_transaction(&self) -> bool {
        match self {
            SdkError::Rpc { message, .. } => {
                let message = message.to_ascii_lowercase();
                message.contains("unknown transaction")
                    || (message.contains("transaction") && message.contains("not found"))
            }
            _ => false,
        }
    }

    /// Network or node failures that may clear up on a later request
    ///
    /// Malformed replies are not transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, SdkError::Transport(_) | SdkError::Rpc { .. })
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Serialization(e.to_string())
    }
}

impl From<rivet_primitives::PrimitiveError> for SdkError {
    fn from(e: rivet_primitives::PrimitiveError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<rivet_primitives::AddressError> for SdkError {
    fn from(e: rivet_primitives::AddressError) -> Self {
        SdkError::InvalidAddress(e.to_string())
    }
}

impl From<rivet_primitives::HashError> for SdkError {
    fn from(e: rivet_primitives::HashError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<rivet_crypto::CryptoError> for SdkError {
    fn from(e: rivet_crypto::CryptoError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}
