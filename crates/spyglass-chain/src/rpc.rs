//! Protocol clients for the remote consensus node.
//!
//! Two clients per connection, matching the node's two RPC namespaces:
//! [`StatusClient`] speaks the consensus side (status, blocks,
//! validators) and returns loosely-shaped [`Value`]s for the normalizer;
//! [`QueryClient`] speaks the application side (balances, transactions,
//! broadcast). Both are bound into a [`ChainHandle`] whose construction
//! proves the endpoint with a status round-trip.

use std::time::Duration;

use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ChainConfig;
use crate::error::ChainError;

/// Node error code for a missing entity.
const CODE_NOT_FOUND: i64 = -5;
/// Node error code for a height past the chain tip.
const CODE_OUT_OF_RANGE: i64 = -8;

fn classify_code(code: i64, message: &str) -> ChainError {
    match code {
        CODE_NOT_FOUND | CODE_OUT_OF_RANGE => ChainError::NotFound(message.to_string()),
        _ => ChainError::Rpc(format!("{message} (code {code})")),
    }
}

fn classify_http(err: reqwest::Error, timeout: Duration) -> ChainError {
    if err.is_timeout() {
        ChainError::Timeout(timeout)
    } else if err.is_connect() {
        ChainError::Connection(err.to_string())
    } else {
        ChainError::Rpc(err.to_string())
    }
}

fn classify_client(err: jsonrpsee::core::client::Error, timeout: Duration) -> ChainError {
    use jsonrpsee::core::client::Error;
    match err {
        Error::RequestTimeout => ChainError::Timeout(timeout),
        Error::Transport(e) => ChainError::Connection(e.to_string()),
        Error::Call(obj) => classify_code(obj.code() as i64, obj.message()),
        other => ChainError::Rpc(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Status client (consensus namespace)
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 client for status, block and validator queries.
pub struct StatusClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl StatusClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Connection(e.to_string()))?;
        Ok(Self { client, endpoint: endpoint.to_owned(), timeout })
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let resp: Value = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_http(e, self.timeout))?
            .json()
            .await
            .map_err(|e| classify_http(e, self.timeout))?;

        if let Some(err) = resp.get("error") {
            if !err.is_null() {
                let code = err["code"].as_i64().unwrap_or(0);
                let message = err["message"].as_str().unwrap_or("unspecified RPC error");
                return Err(classify_code(code, message));
            }
        }
        Ok(resp["result"].clone())
    }

    pub async fn status(&self) -> Result<Value, ChainError> {
        self.call("status", json!({})).await
    }

    pub async fn block(&self, height: Option<u64>) -> Result<Value, ChainError> {
        match height {
            Some(h) => self.call("block", json!({"height": h})).await,
            None => self.call("block", json!({})).await,
        }
    }

    pub async fn validators(&self, height: Option<u64>) -> Result<Value, ChainError> {
        match height {
            Some(h) => self.call("validators", json!({"height": h})).await,
            None => self.call("validators", json!({})).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Query client (application namespace)
// ---------------------------------------------------------------------------

/// JSON-RPC client for account and transaction queries plus the
/// node-side signed broadcast.
pub struct QueryClient {
    client: HttpClient,
    timeout: Duration,
}

impl QueryClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ChainError> {
        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(endpoint)
            .map_err(|e| ChainError::Connection(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn request(&self, method: &str, params: ArrayParams) -> Result<Value, ChainError> {
        self.client
            .request(method, params)
            .await
            .map_err(|e| classify_client(e, self.timeout))
    }

    pub async fn balance(&self, address: &str, denom: &str) -> Result<Value, ChainError> {
        let mut params = ArrayParams::new();
        params.insert(address).unwrap();
        params.insert(denom).unwrap();
        self.request("bank_balance", params).await
    }

    pub async fn all_balances(&self, address: &str) -> Result<Value, ChainError> {
        let mut params = ArrayParams::new();
        params.insert(address).unwrap();
        self.request("bank_balances", params).await
    }

    pub async fn tx(&self, hash: &str) -> Result<Value, ChainError> {
        let mut params = ArrayParams::new();
        params.insert(hash).unwrap();
        self.request("tx", params).await
    }

    /// Search transactions by one event key/value filter.
    pub async fn tx_search(&self, key: &str, value: &str) -> Result<Value, ChainError> {
        let mut params = ArrayParams::new();
        params.insert(key).unwrap();
        params.insert(value).unwrap();
        self.request("tx_search", params).await
    }

    /// The node's most recently indexed transactions, unfiltered.
    pub async fn recent_txs(&self) -> Result<Value, ChainError> {
        self.request("tx_recent", ArrayParams::new()).await
    }

    /// Ask the node to sign and broadcast a transfer from an account it
    /// custodies. Write path: errors surface to the caller untouched.
    pub async fn broadcast_transfer(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        denom: &str,
        memo: &str,
    ) -> Result<Value, ChainError> {
        let mut params = ArrayParams::new();
        params.insert(from).unwrap();
        params.insert(to).unwrap();
        params.insert(amount).unwrap();
        params.insert(denom).unwrap();
        params.insert(memo).unwrap();
        self.request("broadcast_transfer", params).await
    }
}

// ---------------------------------------------------------------------------
// Handle pair
// ---------------------------------------------------------------------------

/// The live pair of protocol clients bound to one endpoint.
pub struct ChainHandle {
    pub status: StatusClient,
    pub query: QueryClient,
}

impl ChainHandle {
    /// Build both clients and prove the endpoint with a status
    /// round-trip. Client construction alone is lazy; only the probe
    /// distinguishes a live node from a dead address.
    pub async fn open(config: &ChainConfig) -> Result<Self, ChainError> {
        let status = StatusClient::new(&config.rpc_endpoint, config.call_timeout)?;
        let query = QueryClient::new(&config.rpc_endpoint, config.call_timeout)?;
        let handle = Self { status, query };
        handle
            .status
            .status()
            .await
            .map_err(|e| ChainError::Connection(format!("handshake with {}: {e}", config.rpc_endpoint)))?;
        Ok(handle)
    }
}
