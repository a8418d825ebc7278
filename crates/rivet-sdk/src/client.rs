//! RpcClient - JSON-RPC client over a pluggable transport

use std::sync::Arc;

use bytes::Bytes;
use rivet_primitives::{parse_quantity, Address, H256, U256};
use serde_json::Value;
use tracing::debug;

use crate::transport::{deserialize_response, MockTransport, Transport};
use crate::types::{BlockId, CallRequest, PendingTransaction, Receipt, TransactionRequest};
use crate::SdkError;

#[cfg(feature = "http")]
use crate::config::ClientConfig;
#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Ethereum JSON-RPC client
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    chain_id: Option<u64>,
}

impl RpcClient {
    /// Create a new client with HTTP transport
    #[cfg(feature = "http")]
    pub async fn connect(url: &str) -> Result<Self, SdkError> {
        Self::connect_with(&ClientConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .await
    }

    /// Create a client from configuration
    #[cfg(feature = "http")]
    pub async fn connect_with(config: &ClientConfig) -> Result<Self, SdkError> {
        let transport = HttpTransport::with_timeout(&config.url, config.request_timeout())?;
        let mut client = Self {
            transport: Arc::new(transport),
            chain_id: config.chain_id,
        };

        if client.chain_id.is_none() {
            // Fetch and cache chain ID
            let chain_id = client.fetch_chain_id().await?;
            client.chain_id = Some(chain_id);
        }
        tracing::info!(url = %config.url, chain_id = ?client.chain_id, "connected");

        Ok(client)
    }

    /// Create a new client with mock transport (for testing)
    pub fn new_mock() -> Self {
        Self {
            transport: Arc::new(MockTransport::new()),
            chain_id: Some(1),
        }
    }

    /// Create a client with a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            chain_id: None,
        }
    }

    /// Pin the chain ID instead of asking the node
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Send a raw JSON-RPC request
    pub async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        debug!(method, "rpc request");
        self.transport.request_json(method, params).await
    }

    /// Helper method to make RPC request and deserialize
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        let value = self.send(method, params).await?;
        deserialize_response(value)
    }

    // ==================== Chain Info ====================

    /// Get the chain ID
    pub async fn chain_id(&self) -> Result<u64, SdkError> {
        if let Some(id) = self.chain_id {
            return Ok(id);
        }
        self.fetch_chain_id().await
    }

    async fn fetch_chain_id(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_chainId", vec![]).await?;
        parse_hex_u64(&result)
    }

    /// Get the current gas price
    pub async fn gas_price(&self) -> Result<u128, SdkError> {
        let result: String = self.request("eth_gasPrice", vec![]).await?;
        parse_hex_u128(&result)
    }

    /// Get the current block number
    pub async fn block_number(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&result)
    }

    // ==================== Account Queries ====================

    /// Get the balance of an address
    pub async fn get_balance(&self, address: &Address, block: BlockId) -> Result<U256, SdkError> {
        let result: String = self
            .request(
                "eth_getBalance",
                vec![
                    Value::String(address.to_hex()),
                    serde_json::to_value(block)?,
                ],
            )
            .await?;
        Ok(parse_quantity(&result)?)
    }

    /// Get the nonce (transaction count) of an address
    pub async fn get_nonce(&self, address: &Address, block: BlockId) -> Result<u64, SdkError> {
        let result: String = self
            .request(
                "eth_getTransactionCount",
                vec![
                    Value::String(address.to_hex()),
                    serde_json::to_value(block)?,
                ],
            )
            .await?;
        parse_hex_u64(&result)
    }

    /// Get the code at an address
    pub async fn get_code(&self, address: &Address, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_getCode",
                vec![
                    Value::String(address.to_hex()),
                    serde_json::to_value(block)?,
                ],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    // ==================== Transactions ====================

    /// Get a transaction receipt; `None` while the transaction is unmined
    pub async fn get_receipt(&self, hash: &H256) -> Result<Option<Receipt>, SdkError> {
        self.request(
            "eth_getTransactionReceipt",
            vec![Value::String(hash.to_hex())],
        )
        .await
    }

    /// Send a raw (signed, encoded) transaction
    pub async fn send_raw_transaction(&self, tx: &[u8]) -> Result<PendingTransaction, SdkError> {
        let hex = format!("0x{}", hex::encode(tx));
        let result: String = self
            .request("eth_sendRawTransaction", vec![Value::String(hex)])
            .await?;

        let hash = H256::from_hex(&result)?;
        debug!(%hash, "raw transaction submitted");
        Ok(PendingTransaction::new(hash))
    }

    /// Submit a transaction for the node to sign with one of its accounts
    pub async fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> Result<PendingTransaction, SdkError> {
        let result: String = self
            .request("eth_sendTransaction", vec![serde_json::to_value(tx)?])
            .await?;

        let hash = H256::from_hex(&result)?;
        debug!(%hash, "transaction submitted");
        Ok(PendingTransaction::new(hash))
    }

    // ==================== Call & Estimation ====================

    /// Execute a call (read-only, does not create transaction)
    pub async fn call(&self, request: &CallRequest, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_call",
                vec![serde_json::to_value(request)?, serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    /// Estimate gas for a transaction
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, SdkError> {
        let result: String = self
            .request("eth_estimateGas", vec![serde_json::to_value(request)?])
            .await?;
        parse_hex_u64(&result)
    }
}

// ==================== Helper Functions ====================

fn parse_hex_u64(s: &str) -> Result<u64, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(e.to_string()))
}

fn parse_hex_u128(s: &str) -> Result<u128, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u128::from_str_radix(s, 16).map_err(|e| SdkError::InvalidHex(e.to_string()))
}

fn parse_hex_bytes(s: &str) -> Result<Bytes, SdkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Bytes::new());
    }
    let bytes = hex::decode(s)?;
    Ok(Bytes::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockReply;
    use serde_json::json;

    #[tokio::test]
    async fn test_client_mock_chain_id() {
        let client = RpcClient::new_mock();
        let chain_id = client.chain_id().await.unwrap();
        assert_eq!(chain_id, 1);
    }

    #[tokio::test]
    async fn test_client_fetches_chain_id_when_unset() {
        let mock = MockTransport::new();
        mock.set_response("eth_chainId", json!("0x2a"));
        let client = RpcClient::with_transport(mock.clone());
        assert_eq!(client.chain_id().await.unwrap(), 42);
        assert_eq!(mock.call_count("eth_chainId"), 1);
    }

    #[tokio::test]
    async fn test_client_mock_gas_price() {
        let client = RpcClient::new_mock();
        let gas_price = client.gas_price().await.unwrap();
        assert_eq!(gas_price, 1_000_000_000); // 1 gwei
    }

    #[tokio::test]
    async fn test_client_mock_block_number() {
        let client = RpcClient::new_mock();
        let block_number = client.block_number().await.unwrap();
        assert_eq!(block_number, 256);
    }

    #[tokio::test]
    async fn test_client_mock_balance() {
        let client = RpcClient::new_mock();
        let balance = client
            .get_balance(&Address::ZERO, BlockId::Latest)
            .await
            .unwrap();
        assert_eq!(balance, U256::from(1_000_000_000_000_000_000u128)); // 1 ETH
    }

    #[tokio::test]
    async fn test_client_mock_nonce() {
        let client = RpcClient::new_mock();
        let nonce = client
            .get_nonce(&Address::ZERO, BlockId::Latest)
            .await
            .unwrap();
        assert_eq!(nonce, 0);
    }

    #[tokio::test]
    async fn test_client_mock_estimate_gas() {
        let client = RpcClient::new_mock();
        let gas = client
            .estimate_gas(&CallRequest::default())
            .await
            .unwrap();
        assert_eq!(gas, 21000);
    }

    #[tokio::test]
    async fn test_client_receipt_absent() {
        let client = RpcClient::new_mock();
        let receipt = client.get_receipt(&H256::ZERO).await.unwrap();
        assert!(receipt.is_none());
    }

    #[tokio::test]
    async fn test_client_send_transaction_params() {
        let mock = MockTransport::new();
        let client = RpcClient::with_transport(mock.clone());
        let tx = TransactionRequest {
            from: Some(Address::ZERO),
            data: Bytes::from_static(&[0x01]),
            ..Default::default()
        };
        let pending = client.send_transaction(&tx).await.unwrap();
        assert_eq!(
            pending.hash().to_hex(),
            "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b"
        );

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "eth_sendTransaction");
        assert_eq!(calls[0].1[0]["data"], "0x01");
    }

    #[tokio::test]
    async fn test_client_propagates_rpc_error() {
        let mock = MockTransport::new();
        mock.push_reply(
            "eth_call",
            MockReply::Rpc { code: 3, message: "execution reverted".into() },
        );
        let client = RpcClient::with_transport(mock);
        let result = client.call(&CallRequest::default(), BlockId::Latest).await;
        assert!(matches!(result, Err(SdkError::Rpc { code: 3, .. })));
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x1").unwrap(), 1);
        assert_eq!(parse_hex_u64("0x100").unwrap(), 256);
        assert_eq!(parse_hex_u64("100").unwrap(), 256);
    }

    #[test]
    fn test_parse_hex_u128() {
        assert_eq!(parse_hex_u128("0x3b9aca00").unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_parse_hex_bytes() {
        let result = parse_hex_bytes("0x1234").unwrap();
        assert_eq!(result.as_ref(), &[0x12, 0x34]);
    }

    #[test]
    fn test_parse_hex_bytes_empty() {
        let result = parse_hex_bytes("0x").unwrap();
        assert!(result.is_empty());
    }
}
