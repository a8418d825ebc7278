//! Event log decoding

use rivet_primitives::H256;

use super::ContractInstance;
use crate::abi::{decode, AbiEvent, ParamType, Token};
use crate::types::{Log, Receipt};
use crate::SdkError;

/// Decoded event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    /// Event name
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<(String, Token)>,
}

impl DecodedLog {
    /// Parameter by name
    pub fn get(&self, name: &str) -> Option<&Token> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, token)| token)
    }

    /// Parameter values in declaration order
    pub fn values(&self) -> Vec<&Token> {
        self.params.iter().map(|(_, token)| token).collect()
    }
}

/// Event handle returned by [`ContractInstance::event`]
#[derive(Debug, Clone, Copy)]
pub struct EventRef<'a> {
    contract: &'a ContractInstance,
    event: &'a AbiEvent,
}

impl<'a> EventRef<'a> {
    pub(crate) fn new(contract: &'a ContractInstance, event: &'a AbiEvent) -> Self {
        Self { contract, event }
    }

    /// ABI entry
    pub fn event(&self) -> &'a AbiEvent {
        self.event
    }

    /// First topic of non-anonymous logs
    pub fn topic0(&self) -> H256 {
        self.event.topic0()
    }

    /// Whether `log` was emitted by this contract for this event
    pub fn matches(&self, log: &Log) -> bool {
        if log.address != *self.contract.address() {
            return false;
        }
        if self.event.anonymous {
            log.topics.len() == self.indexed_count()
        } else {
            log.topics.first() == Some(&self.topic0())
        }
    }

    /// Decode topics and data of `log`
    ///
    /// Indexed `bytes`, `string`, array and tuple parameters are stored by the
    /// EVM as their keccak hash; they decode to that 32-byte hash.
    pub fn decode_log(&self, log: &Log) -> Result<DecodedLog, SdkError> {
        let topics = if self.event.anonymous {
            &log.topics[..]
        } else {
            match log.topics.split_first() {
                Some((first, rest)) if *first == self.topic0() => rest,
                _ => {
                    return Err(SdkError::MalformedData(format!(
                        "log is not a {} event",
                        self.event.signature()
                    )))
                }
            }
        };

        if topics.len() != self.indexed_count() {
            return Err(SdkError::MalformedData(format!(
                "{} expects {} indexed topics, log has {}",
                self.event.signature(),
                self.indexed_count(),
                topics.len()
            )));
        }

        let data_types: Vec<ParamType> = self
            .event
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind.clone())
            .collect();
        let mut data_values = decode(&data_types, &log.data)?.into_iter();
        let mut topics = topics.iter();

        let mut params = Vec::with_capacity(self.event.inputs.len());
        for input in &self.event.inputs {
            let token = if input.indexed {
                let topic = topics
                    .next()
                    .ok_or_else(|| SdkError::MalformedData("missing topic".into()))?;
                decode_topic(&input.kind, topic)?
            } else {
                data_values
                    .next()
                    .ok_or_else(|| SdkError::MalformedData("missing data value".into()))?
            };
            params.push((input.name.clone(), token));
        }

        Ok(DecodedLog {
            name: self.event.name.clone(),
            params,
        })
    }

    /// Decode every log of `receipt` emitted by this contract for this event
    pub fn filter_logs(&self, receipt: &Receipt) -> Result<Vec<DecodedLog>, SdkError> {
        receipt
            .logs
            .iter()
            .filter(|log| self.matches(log))
            .map(|log| self.decode_log(log))
            .collect()
    }

    fn indexed_count(&self) -> usize {
        self.event.inputs.iter().filter(|p| p.indexed).count()
    }
}

fn decode_topic(kind: &ParamType, topic: &H256) -> Result<Token, SdkError> {
    match kind {
        ParamType::Bytes
        | ParamType::String
        | ParamType::Array(_)
        | ParamType::FixedArray(..)
        | ParamType::Tuple(_) => Ok(Token::FixedBytes(topic.as_bytes().to_vec())),
        _ => decode(std::slice::from_ref(kind), topic.as_bytes())?
            .pop()
            .ok_or_else(|| SdkError::MalformedData("empty topic".into())),
    }
}
