//! SDK types

use bytes::Bytes;
use rivet_primitives::{to_quantity, Address, H256, U256};
use serde::{Deserialize, Deserializer, Serialize};

/// Block identifier for RPC queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockId {
    /// Block number
    Number(u64),
    /// Latest block
    #[default]
    Latest,
    /// Pending block (includes pending transactions)
    Pending,
    /// Earliest block (genesis)
    Earliest,
    /// Safe block (finalized by consensus)
    Safe,
    /// Finalized block
    Finalized,
}

impl Serialize for BlockId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            BlockId::Number(n) => serializer.serialize_str(&format!("0x{:x}", n)),
            BlockId::Latest => serializer.serialize_str("latest"),
            BlockId::Pending => serializer.serialize_str("pending"),
            BlockId::Earliest => serializer.serialize_str("earliest"),
            BlockId::Safe => serializer.serialize_str("safe"),
            BlockId::Finalized => serializer.serialize_str("finalized"),
        }
    }
}

/// Call request for eth_call and eth_estimateGas
#[derive(Debug, Clone, Default)]
pub struct CallRequest {
    /// Sender address
    pub from: Option<Address>,
    /// Recipient address
    pub to: Option<Address>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price (legacy)
    pub gas_price: Option<u128>,
    /// Value to transfer
    pub value: Option<U256>,
    /// Input data
    pub data: Option<Bytes>,
}

impl Serialize for CallRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let count = [
            self.from.is_some(),
            self.to.is_some(),
            self.gas.is_some(),
            self.gas_price.is_some(),
            self.value.is_some(),
            self.data.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        let mut map = serializer.serialize_map(Some(count))?;

        if let Some(from) = &self.from {
            map.serialize_entry("from", &from.to_hex())?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", &to.to_hex())?;
        }
        if let Some(gas) = &self.gas {
            map.serialize_entry("gas", &format!("0x{:x}", gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &format!("0x{:x}", gas_price))?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", &to_quantity(value))?;
        }
        if let Some(data) = &self.data {
            map.serialize_entry("data", &format!("0x{}", hex::encode(data)))?;
        }

        map.end()
    }
}

/// Transaction request handed to a [`Signer`](crate::Signer) or submitted
/// with `eth_sendTransaction`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Chain ID
    pub chain_id: Option<u64>,
    /// Sender address
    pub from: Option<Address>,
    /// Recipient address (None for contract creation)
    pub to: Option<Address>,
    /// Sender nonce
    pub nonce: Option<u64>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price
    pub gas_price: Option<u128>,
    /// Value to transfer
    pub value: U256,
    /// Input data
    pub data: Bytes,
}

impl Serialize for TransactionRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        if let Some(from) = &self.from {
            map.serialize_entry("from", &from.to_hex())?;
        }
        if let Some(to) = &self.to {
            map.serialize_entry("to", &to.to_hex())?;
        }
        if let Some(nonce) = &self.nonce {
            map.serialize_entry("nonce", &format!("0x{:x}", nonce))?;
        }
        if let Some(gas) = &self.gas {
            map.serialize_entry("gas", &format!("0x{:x}", gas))?;
        }
        if let Some(gas_price) = &self.gas_price {
            map.serialize_entry("gasPrice", &format!("0x{:x}", gas_price))?;
        }
        if let Some(chain_id) = &self.chain_id {
            map.serialize_entry("chainId", &format!("0x{:x}", chain_id))?;
        }
        map.serialize_entry("value", &to_quantity(&self.value))?;
        map.serialize_entry("data", &format!("0x{}", hex::encode(&self.data)))?;
        map.end()
    }
}

impl From<&TransactionRequest> for CallRequest {
    fn from(tx: &TransactionRequest) -> Self {
        CallRequest {
            from: tx.from,
            to: tx.to,
            gas: tx.gas,
            gas_price: tx.gas_price,
            value: if tx.value.is_zero() { None } else { Some(tx.value) },
            data: Some(tx.data.clone()),
        }
    }
}

/// Pending transaction handle
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    /// Transaction hash
    pub hash: H256,
}

impl PendingTransaction {
    /// Create a new pending transaction
    pub fn new(hash: H256) -> Self {
        Self { hash }
    }

    /// Get the transaction hash
    pub fn hash(&self) -> &H256 {
        &self.hash
    }

    /// Hand the hash to a tracker
    pub fn track(
        &self,
        tracker: &crate::TransactionTracker,
        opts: crate::TrackOptions,
    ) -> crate::TransactionHandle {
        tracker.track(self.hash, opts)
    }
}

/// Execution status recorded in a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxStatus {
    /// Status `0x1`, or no status field (pre-Byzantium receipts)
    #[default]
    Success,
    /// Status `0x0`: execution reverted
    Failure,
}

impl TxStatus {
    /// Whether execution succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, TxStatus::Success)
    }
}

/// Log entry emitted during execution
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics; topic0 is the event id for non-anonymous events
    pub topics: Vec<H256>,
    /// Non-indexed data
    #[serde(deserialize_with = "hex_bytes")]
    pub data: Bytes,
    /// Block number
    #[serde(default, deserialize_with = "opt_quantity")]
    pub block_number: Option<u64>,
    /// Transaction hash
    #[serde(default)]
    pub transaction_hash: Option<H256>,
    /// Position in the block
    #[serde(default, deserialize_with = "opt_quantity")]
    pub log_index: Option<u64>,
}

/// Transaction receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Transaction hash
    pub transaction_hash: H256,
    /// Block hash
    #[serde(default)]
    pub block_hash: Option<H256>,
    /// Block number
    #[serde(deserialize_with = "quantity")]
    pub block_number: u64,
    /// Gas used by this transaction
    #[serde(deserialize_with = "quantity")]
    pub gas_used: u64,
    /// Gas used in the block up to and including this transaction
    #[serde(default, deserialize_with = "quantity")]
    pub cumulative_gas_used: u64,
    /// Created contract, for deployments
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// Execution status
    #[serde(default, deserialize_with = "status")]
    pub status: TxStatus,
    /// Emitted logs
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Whether execution succeeded
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid quantity {}: {}", s, e))
}

fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_u64(&s).map_err(serde::de::Error::custom)
}

fn opt_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let s = Option::<String>::deserialize(deserializer)?;
    s.map(|s| parse_u64(&s))
        .transpose()
        .map_err(serde::de::Error::custom)
}

fn hex_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
    let s = String::deserialize(deserializer)?;
    let digits = s.strip_prefix("0x").unwrap_or(&s);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(serde::de::Error::custom)
}

fn status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TxStatus, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(TxStatus::Success),
        Some(s) => match parse_u64(&s).map_err(serde::de::Error::custom)? {
            0 => Ok(TxStatus::Failure),
            1 => Ok(TxStatus::Success),
            other => Err(serde::de::Error::custom(format!("invalid status {}", other))),
        },
    }
}
