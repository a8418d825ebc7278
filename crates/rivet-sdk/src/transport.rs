//! Transport layer for RPC communication

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::SdkError;

/// Transport trait for RPC communication (object-safe)
///
/// Implementations report connection-level failures as
/// [`SdkError::Transport`] and node-reported failures as [`SdkError::Rpc`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an RPC request and get JSON response
    async fn request_json(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, SdkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request_json(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, SdkError> {
        (**self).request_json(method, params).await
    }
}

/// Helper to deserialize response
pub fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Serialization(e.to_string()))
}

/// Scripted reply for [`MockTransport`]
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful result
    Ok(Value),
    /// Node-reported error
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },
    /// Connection-level failure
    Transport(String),
}

impl MockReply {
    fn into_result(self) -> Result<Value, SdkError> {
        match self {
            MockReply::Ok(value) => Ok(value),
            MockReply::Rpc { code, message } => Err(SdkError::Rpc { code, message }),
            MockReply::Transport(message) => Err(SdkError::Transport(message)),
        }
    }
}

#[derive(Default)]
struct MockState {
    /// One-shot replies consumed in order, keyed by method or method+first param
    queued: HashMap<String, VecDeque<MockReply>>,
    /// Sticky replies, keyed the same way
    responses: HashMap<String, MockReply>,
    /// Artificial latency per key
    delays: HashMap<String, Duration>,
    /// Every request seen, in order
    calls: Vec<(String, Vec<Value>)>,
}

/// Mock transport for testing
///
/// Lookup order for a request: queued reply for `method:first_param`, sticky
/// reply for `method:first_param`, queued reply for `method`, sticky reply for
/// `method`, built-in default. Clones share the same script.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    default_responses: Arc<HashMap<String, Value>>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        let mut defaults = HashMap::new();

        // Default responses for common methods
        defaults.insert("eth_chainId".to_string(), Value::String("0x1".to_string()));
        defaults.insert("eth_gasPrice".to_string(), Value::String("0x3b9aca00".to_string())); // 1 gwei
        defaults.insert("eth_blockNumber".to_string(), Value::String("0x100".to_string())); // Block 256
        defaults.insert("eth_getBalance".to_string(), Value::String("0xde0b6b3a7640000".to_string())); // 1 ETH
        defaults.insert("eth_getTransactionCount".to_string(), Value::String("0x0".to_string()));
        defaults.insert("eth_estimateGas".to_string(), Value::String("0x5208".to_string())); // 21000
        defaults.insert("eth_sendRawTransaction".to_string(), Value::String(
            "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".to_string()
        ));
        defaults.insert("eth_sendTransaction".to_string(), Value::String(
            "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".to_string()
        ));
        defaults.insert("eth_call".to_string(), Value::String("0x".to_string()));
        defaults.insert("eth_getCode".to_string(), Value::String("0x".to_string()));
        defaults.insert("eth_getTransactionReceipt".to_string(), Value::Null);

        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            default_responses: Arc::new(defaults),
        }
    }

    /// Set a sticky response for a method
    pub fn set_response(&self, method: &str, response: Value) {
        self.state
            .lock()
            .responses
            .insert(method.to_string(), MockReply::Ok(response));
    }

    /// Set a sticky reply for a method called with `first_param`
    pub fn set_reply_for(&self, method: &str, first_param: &str, reply: MockReply) {
        self.state
            .lock()
            .responses
            .insert(keyed(method, first_param), reply);
    }

    /// Queue a one-shot reply for a method
    pub fn push_reply(&self, method: &str, reply: MockReply) {
        self.state
            .lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Queue a one-shot reply for a method called with `first_param`
    pub fn push_reply_for(&self, method: &str, first_param: &str, reply: MockReply) {
        self.state
            .lock()
            .queued
            .entry(keyed(method, first_param))
            .or_default()
            .push_back(reply);
    }

    /// Delay every reply for a method called with `first_param`
    pub fn set_delay_for(&self, method: &str, first_param: &str, delay: Duration) {
        self.state
            .lock()
            .delays
            .insert(keyed(method, first_param), delay);
    }

    /// Clear custom responses and recorded calls
    pub fn clear_responses(&self) {
        let mut state = self.state.lock();
        state.queued.clear();
        state.responses.clear();
        state.delays.clear();
        state.calls.clear();
    }

    /// All requests seen so far
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().calls.clone()
    }

    /// Number of requests seen for `method`
    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    /// Number of requests seen for `method` with `first_param`
    pub fn call_count_for(&self, method: &str, first_param: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, params)| m == method && first_param_key(params).as_deref() == Some(first_param))
            .count()
    }

    fn next_reply(&self, method: &str, params: &[Value]) -> (Option<MockReply>, Option<Duration>) {
        let mut state = self.state.lock();
        state.calls.push((method.to_string(), params.to_vec()));

        let specific = first_param_key(params).map(|p| keyed(method, &p));
        let delay = specific.as_ref().and_then(|k| state.delays.get(k).copied());

        let mut candidates = Vec::with_capacity(2);
        if let Some(key) = specific {
            candidates.push(key);
        }
        candidates.push(method.to_string());

        for key in &candidates {
            if let Some(reply) = state.queued.get_mut(key).and_then(VecDeque::pop_front) {
                return (Some(reply), delay);
            }
            if let Some(reply) = state.responses.get(key) {
                return (Some(reply.clone()), delay);
            }
        }
        (None, delay)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn keyed(method: &str, first_param: &str) -> String {
    format!("{}:{}", method, first_param.to_ascii_lowercase())
}

fn first_param_key(params: &[Value]) -> Option<String> {
    params.first().and_then(Value::as_str).map(str::to_ascii_lowercase)
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_json(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, SdkError> {
        let (reply, delay) = self.next_reply(method, &params);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reply) = reply {
            return reply.into_result();
        }

        if let Some(response) = self.default_responses.get(method) {
            return Ok(response.clone());
        }

        Err(SdkError::Rpc {
            code: -32601,
            message: format!("Method not found: {}", method),
        })
    }
}

/// HTTP transport for real RPC communication
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    request_id: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Create a transport whose requests fail after `timeout`
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, SdkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn request_json(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, SdkError> {
        let id = self.next_id();
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(id, method, url = %self.url, "sending rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(SdkError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        // A `null` result (e.g. receipt not found) is a valid answer
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_default_responses() {
        let transport = MockTransport::new();

        let result = transport
            .request_json("eth_chainId", vec![])
            .await
            .unwrap();
        assert_eq!(result, Value::String("0x1".to_string()));

        let result = transport
            .request_json("eth_getTransactionReceipt", vec![Value::String("0xab".into())])
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_mock_transport_custom_response() {
        let transport = MockTransport::new();
        transport.set_response("eth_chainId", Value::String("0x5".to_string()));

        let result = transport
            .request_json("eth_chainId", vec![])
            .await
            .unwrap();
        assert_eq!(result, Value::String("0x5".to_string()));
    }

    #[tokio::test]
    async fn test_mock_transport_queue_then_sticky() {
        let transport = MockTransport::new();
        transport.set_response("eth_blockNumber", Value::String("0x2".into()));
        transport.push_reply("eth_blockNumber", MockReply::Ok(Value::String("0x1".into())));

        let first = transport.request_json("eth_blockNumber", vec![]).await.unwrap();
        let second = transport.request_json("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(first, Value::String("0x1".into()));
        assert_eq!(second, Value::String("0x2".into()));
        assert_eq!(transport.call_count("eth_blockNumber"), 2);
    }

    #[tokio::test]
    async fn test_mock_transport_keyed_by_first_param() {
        let transport = MockTransport::new();
        transport.set_reply_for("eth_getBalance", "0xAA", MockReply::Ok(Value::String("0x7".into())));

        let keyed = transport
            .request_json("eth_getBalance", vec![Value::String("0xaa".into())])
            .await
            .unwrap();
        let other = transport
            .request_json("eth_getBalance", vec![Value::String("0xbb".into())])
            .await
            .unwrap();
        assert_eq!(keyed, Value::String("0x7".into()));
        assert_eq!(other, Value::String("0xde0b6b3a7640000".into()));
        assert_eq!(transport.call_count_for("eth_getBalance", "0xaa"), 1);
    }

    #[tokio::test]
    async fn test_mock_transport_scripted_errors() {
        let transport = MockTransport::new();
        transport.push_reply("eth_chainId", MockReply::Transport("connection reset".into()));
        transport.push_reply(
            "eth_chainId",
            MockReply::Rpc { code: -32000, message: "boom".into() },
        );

        let first = transport.request_json("eth_chainId", vec![]).await;
        let second = transport.request_json("eth_chainId", vec![]).await;
        assert!(matches!(first, Err(SdkError::Transport(_))));
        assert!(matches!(second, Err(SdkError::Rpc { code: -32000, .. })));
    }

    #[tokio::test]
    async fn test_mock_transport_unknown_method() {
        let transport = MockTransport::new();
        let result = transport
            .request_json("unknown_method", vec![])
            .await;
        assert!(matches!(result, Err(SdkError::Rpc { code: -32601, .. })));
    }
}
