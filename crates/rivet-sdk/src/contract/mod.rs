//! Contract binding
//!
//! A [`ContractInstance`] pairs a parsed [`Abi`] with an address and an
//! [`RpcClient`]. Functions are looked up by name or by full signature;
//! overloads are resolved against the supplied arguments and never guessed.
//!
//! ```rust,no_run
//! use rivet_sdk::contract::{erc20, CallOptions};
//! use rivet_sdk::abi::Token;
//! use rivet_sdk::RpcClient;
//! use rivet_primitives::Address;
//!
//! # async fn run() -> Result<(), rivet_sdk::SdkError> {
//! let client = RpcClient::new_mock();
//! let token = erc20(Address::from_hex("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")?, client)?;
//! let owner = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d")?;
//! let balance = token
//!     .function("balanceOf")?
//!     .call(&[Token::Address(owner)], CallOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod erc20;
mod event;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use rivet_primitives::{Address, U256};
use serde_json::Value;
use tracing::debug;

use crate::abi::{decode_output, encode_function_call, parse_type, Abi, AbiEvent, AbiFunction, ParamType, Token};
use crate::client::RpcClient;
use crate::signer::Signer;
use crate::types::{BlockId, CallRequest, PendingTransaction, TransactionRequest};
use crate::SdkError;

pub use erc20::{erc20, ERC20_ABI};
pub use event::{DecodedLog, EventRef};

/// Options for read-only calls
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Block to execute against
    pub block: BlockId,
    /// Caller address
    pub from: Option<Address>,
    /// Allow read-only execution of state-changing functions
    pub simulate: bool,
    /// Value attached to a simulated call
    pub value: Option<U256>,
}

impl CallOptions {
    /// Execute against a specific block
    pub fn at_block(mut self, block: BlockId) -> Self {
        self.block = block;
        self
    }

    /// Set the caller
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Opt in to calling a non-view function without submitting it
    pub fn simulate(mut self) -> Self {
        self.simulate = true;
        self
    }

    /// Attach value
    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }
}

/// Options for state-changing transactions
///
/// Unset fields are filled from the node before signing.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Sender; defaults to the signer's address
    pub from: Option<Address>,
    /// Value to transfer
    pub value: Option<U256>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price
    pub gas_price: Option<u128>,
    /// Nonce
    pub nonce: Option<u64>,
    /// Chain ID
    pub chain_id: Option<u64>,
}

impl SendOptions {
    /// Set the sender
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Attach value
    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the gas limit
    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    /// Set the gas price
    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// Contract bound to an address and a client
#[derive(Clone)]
pub struct ContractInstance {
    address: Address,
    abi: Abi,
    client: RpcClient,
    signer: Option<Arc<dyn Signer>>,
    functions_by_name: HashMap<String, Vec<usize>>,
    functions_by_signature: HashMap<String, usize>,
    events_by_name: HashMap<String, Vec<usize>>,
    events_by_signature: HashMap<String, usize>,
}

impl ContractInstance {
    /// Parse an ABI JSON array and bind it to `address`
    pub fn bind(abi_json: &str, address: Address, client: RpcClient) -> Result<Self, SdkError> {
        Ok(Self::from_abi(Abi::from_json(abi_json)?, address, client))
    }

    /// Bind an already parsed ABI
    pub fn from_abi(abi: Abi, address: Address, client: RpcClient) -> Self {
        let mut functions_by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut functions_by_signature = HashMap::new();
        for (index, function) in abi.functions.iter().enumerate() {
            functions_by_name
                .entry(function.name.clone())
                .or_default()
                .push(index);
            functions_by_signature.insert(function.signature(), index);
        }

        let mut events_by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut events_by_signature = HashMap::new();
        for (index, event) in abi.events.iter().enumerate() {
            events_by_name.entry(event.name.clone()).or_default().push(index);
            events_by_signature.insert(event.signature(), index);
        }

        debug!(
            %address,
            functions = abi.functions.len(),
            events = abi.events.len(),
            "contract bound"
        );

        Self {
            address,
            abi,
            client,
            signer: None,
            functions_by_name,
            functions_by_signature,
            events_by_name,
            events_by_signature,
        }
    }

    /// Sign write-path transactions locally and submit them raw
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Contract address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Parsed ABI
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Client used for calls and submissions
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// All functions in declaration order
    pub fn functions(&self) -> &[AbiFunction] {
        &self.abi.functions
    }

    /// All events in declaration order
    pub fn events(&self) -> &[AbiEvent] {
        &self.abi.events
    }

    /// Look up a function by name (all overloads) or full signature
    pub fn function(&self, name: &str) -> Result<FunctionRef<'_>, SdkError> {
        let candidates: Vec<&AbiFunction> = if name.contains('(') {
            let signature = canonical_signature(name)?;
            self.functions_by_signature
                .get(&signature)
                .map(|index| vec![&self.abi.functions[*index]])
                .unwrap_or_default()
        } else {
            self.functions_by_name
                .get(name)
                .map(|indices| indices.iter().map(|i| &self.abi.functions[*i]).collect())
                .unwrap_or_default()
        };

        if candidates.is_empty() {
            return Err(SdkError::UnknownFunction(name.to_string()));
        }
        Ok(FunctionRef {
            contract: self,
            name: name.to_string(),
            candidates,
        })
    }

    /// Look up an event by name or full signature
    pub fn event(&self, name: &str) -> Result<EventRef<'_>, SdkError> {
        let index = if name.contains('(') {
            let signature = canonical_signature(name)?;
            self.events_by_signature.get(&signature).copied()
        } else {
            match self.events_by_name.get(name).map(Vec::as_slice) {
                Some([index]) => Some(*index),
                Some(indices) if indices.len() > 1 => {
                    return Err(SdkError::AmbiguousOverload {
                        name: name.to_string(),
                        candidates: indices
                            .iter()
                            .map(|i| self.abi.events[*i].signature())
                            .collect(),
                    })
                }
                _ => None,
            }
        };

        let index = index.ok_or_else(|| SdkError::UnknownEvent(name.to_string()))?;
        Ok(EventRef::new(self, &self.abi.events[index]))
    }

    /// Encode call data for `name` with `args`
    pub fn encode_call(&self, name: &str, args: &[Token]) -> Result<Bytes, SdkError> {
        self.function(name)?.encode(args)
    }

    /// Decode return data of a non-overloaded function
    pub fn decode_output(&self, name: &str, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        let function = self.function(name)?.unique()?;
        decode_output(&function.output_types(), data)
    }

    /// Selector of a non-overloaded function
    pub fn selector_of(&self, name: &str) -> Result<[u8; 4], SdkError> {
        Ok(self.function(name)?.unique()?.selector())
    }

    async fn call_resolved(
        &self,
        function: &AbiFunction,
        tokens: &[Token],
        opts: &CallOptions,
    ) -> Result<Vec<Token>, SdkError> {
        if !function.state_mutability.is_read_only() && !opts.simulate {
            return Err(SdkError::SimulationNotAllowed(function.signature()));
        }
        check_value(function, opts.value)?;

        let data = encode_function_call(function.selector(), &function.input_types(), tokens)?;
        let request = CallRequest {
            from: opts.from,
            to: Some(self.address),
            value: opts.value,
            data: Some(Bytes::from(data)),
            ..Default::default()
        };

        debug!(contract = %self.address, function = %function.signature(), block = ?opts.block, "eth_call");
        let output = self.client.call(&request, opts.block).await?;
        decode_output(&function.output_types(), &output)
    }

    /// Validate the write path and encode the transaction skeleton
    fn prepare_send(
        &self,
        function: &AbiFunction,
        tokens: &[Token],
        opts: &SendOptions,
    ) -> Result<TransactionRequest, SdkError> {
        if function.state_mutability.is_read_only() {
            return Err(SdkError::InvalidMutabilityForSend(function.signature()));
        }
        check_value(function, opts.value)?;

        let data = encode_function_call(function.selector(), &function.input_types(), tokens)?;
        let from = match (&self.signer, opts.from) {
            (Some(signer), Some(from)) if from != signer.address() => {
                return Err(SdkError::Signer(format!(
                    "sender {} does not match signer {}",
                    from,
                    signer.address()
                )))
            }
            (Some(signer), _) => Some(signer.address()),
            (None, from) => from,
        };

        Ok(TransactionRequest {
            chain_id: opts.chain_id,
            from,
            to: Some(self.address),
            nonce: opts.nonce,
            gas: opts.gas,
            gas_price: opts.gas_price,
            value: opts.value.unwrap_or_default(),
            data: Bytes::from(data),
        })
    }

    async fn send_resolved(
        &self,
        function: &AbiFunction,
        tokens: &[Token],
        opts: &SendOptions,
    ) -> Result<PendingTransaction, SdkError> {
        let mut tx = self.prepare_send(function, tokens, opts)?;

        let pending = match &self.signer {
            Some(signer) => {
                self.fill_transaction(&mut tx).await?;
                let raw = signer.sign_transaction(&tx).await?;
                self.client.send_raw_transaction(&raw).await?
            }
            None => {
                if tx.from.is_none() {
                    return Err(SdkError::MissingField("from".into()));
                }
                self.client.send_transaction(&tx).await?
            }
        };

        tracing::info!(
            contract = %self.address,
            function = %function.signature(),
            hash = %pending.hash,
            "transaction submitted"
        );
        Ok(pending)
    }

    /// Fill nonce, gas price, gas and chain ID from the node
    async fn fill_transaction(&self, tx: &mut TransactionRequest) -> Result<(), SdkError> {
        let from = tx.from.ok_or_else(|| SdkError::MissingField("from".into()))?;
        if tx.nonce.is_none() {
            tx.nonce = Some(self.client.get_nonce(&from, BlockId::Pending).await?);
        }
        if tx.gas_price.is_none() {
            tx.gas_price = Some(self.client.gas_price().await?);
        }
        if tx.gas.is_none() {
            tx.gas = Some(self.client.estimate_gas(&CallRequest::from(&*tx)).await?);
        }
        if tx.chain_id.is_none() {
            tx.chain_id = Some(self.client.chain_id().await?);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ContractInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractInstance")
            .field("address", &self.address)
            .field("functions", &self.abi.functions.len())
            .field("events", &self.abi.events.len())
            .field("signer", &self.signer.as_ref().map(|s| s.address()))
            .finish()
    }
}

/// Function handle returned by [`ContractInstance::function`]
///
/// Holds every overload matching the lookup; the concrete function is picked
/// per invocation from the arguments.
#[derive(Debug, Clone)]
pub struct FunctionRef<'a> {
    contract: &'a ContractInstance,
    name: String,
    candidates: Vec<&'a AbiFunction>,
}

impl<'a> FunctionRef<'a> {
    /// Name or signature used for the lookup
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overloads matching the lookup
    pub fn overloads(&self) -> &[&'a AbiFunction] {
        &self.candidates
    }

    /// The single overload, or `AmbiguousOverload`
    pub fn unique(&self) -> Result<&'a AbiFunction, SdkError> {
        match self.candidates.as_slice() {
            [function] => Ok(*function),
            _ => Err(self.ambiguous(self.candidates.iter().copied())),
        }
    }

    /// Pick the overload accepting `args`
    pub fn resolve(&self, args: &[Token]) -> Result<&'a AbiFunction, SdkError> {
        self.select(args.len(), |function| {
            function
                .inputs
                .iter()
                .zip(args)
                .try_for_each(|(param, token)| param.kind.check(token))
        })
        .map(|(function, ())| function)
    }

    /// Pick the overload accepting JSON `args` and coerce them
    pub fn resolve_json(&self, args: &[Value]) -> Result<(&'a AbiFunction, Vec<Token>), SdkError> {
        self.select(args.len(), |function| {
            function
                .inputs
                .iter()
                .zip(args)
                .map(|(param, value)| Token::from_json(&param.kind, value))
                .collect()
        })
    }

    /// Selector followed by the encoded arguments
    pub fn encode(&self, args: &[Token]) -> Result<Bytes, SdkError> {
        let function = self.resolve(args)?;
        let data = encode_function_call(function.selector(), &function.input_types(), args)?;
        Ok(Bytes::from(data))
    }

    /// Execute with `eth_call` and decode the outputs; nothing is submitted
    pub async fn call(&self, args: &[Token], opts: CallOptions) -> Result<Vec<Token>, SdkError> {
        let function = self.resolve(args)?;
        self.contract.call_resolved(function, args, &opts).await
    }

    /// [`call`](Self::call) with JSON arguments and JSON outputs
    pub async fn call_json(&self, args: &[Value], opts: CallOptions) -> Result<Vec<Value>, SdkError> {
        let (function, tokens) = self.resolve_json(args)?;
        let outputs = self.contract.call_resolved(function, &tokens, &opts).await?;
        Ok(outputs.iter().map(Token::to_json).collect())
    }

    /// Submit a transaction; the returned hash is ready for tracking
    pub async fn send(&self, args: &[Token], opts: SendOptions) -> Result<PendingTransaction, SdkError> {
        let function = self.resolve(args)?;
        self.contract.send_resolved(function, args, &opts).await
    }

    /// [`send`](Self::send) with JSON arguments
    pub async fn send_json(&self, args: &[Value], opts: SendOptions) -> Result<PendingTransaction, SdkError> {
        let (function, tokens) = self.resolve_json(args)?;
        self.contract.send_resolved(function, &tokens, &opts).await
    }

    /// Estimate the gas a [`send`](Self::send) would use
    pub async fn estimate_gas(&self, args: &[Token], opts: SendOptions) -> Result<u64, SdkError> {
        let function = self.resolve(args)?;
        let tx = self.contract.prepare_send(function, args, &opts)?;
        self.contract.client.estimate_gas(&CallRequest::from(&tx)).await
    }

    fn select<T>(
        &self,
        arity: usize,
        mut attempt: impl FnMut(&'a AbiFunction) -> Result<T, SdkError>,
    ) -> Result<(&'a AbiFunction, T), SdkError> {
        let by_arity: Vec<&'a AbiFunction> = self
            .candidates
            .iter()
            .copied()
            .filter(|function| function.inputs.len() == arity)
            .collect();
        if by_arity.is_empty() {
            return Err(SdkError::TypeMismatch(format!(
                "no overload of `{}` takes {} arguments",
                self.name, arity
            )));
        }

        let mut matches = Vec::new();
        let mut last_error = None;
        for function in by_arity.iter().copied() {
            match attempt(function) {
                Ok(value) => matches.push((function, value)),
                Err(e) => last_error = Some(e),
            }
        }

        let mut matches = matches.into_iter();
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            (None, _) => match (by_arity.len(), last_error) {
                (1, Some(e)) => Err(e),
                _ => Err(SdkError::TypeMismatch(format!(
                    "arguments match no overload of `{}`: {:?}",
                    self.name,
                    by_arity.iter().map(|f| f.signature()).collect::<Vec<_>>()
                ))),
            },
            (Some(first), Some(second)) => Err(self.ambiguous(
                [first.0, second.0]
                    .into_iter()
                    .chain(matches.map(|(function, _)| function)),
            )),
        }
    }

    fn ambiguous(&self, functions: impl Iterator<Item = &'a AbiFunction>) -> SdkError {
        SdkError::AmbiguousOverload {
            name: self.name.clone(),
            candidates: functions.map(AbiFunction::signature).collect(),
        }
    }
}

/// Normalise `name(type,...)` so `transfer(address, uint)` finds
/// `transfer(address,uint256)`
fn canonical_signature(signature: &str) -> Result<String, SdkError> {
    let open = signature
        .find('(')
        .ok_or_else(|| SdkError::InvalidAbi(format!("not a signature: {}", signature)))?;
    let name = signature[..open].trim();
    match parse_type(&signature[open..])? {
        ParamType::Tuple(types) => Ok(crate::abi::signature(name, &types)),
        _ => Err(SdkError::InvalidAbi(format!("not a signature: {}", signature))),
    }
}

fn check_value(function: &AbiFunction, value: Option<U256>) -> Result<(), SdkError> {
    let nonzero = value.map_or(false, |v| !v.is_zero());
    if nonzero && function.state_mutability != crate::abi::StateMutability::Payable {
        return Err(SdkError::NonPayableValue(function.signature()));
    }
    Ok(())
}
