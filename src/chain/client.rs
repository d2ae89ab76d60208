//! Chain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Talk to the node's `/v1/chain/*` HTTP API
//! - Fail over across configured endpoints for reads; submit to the primary only
//! - Surface node rejections verbatim
//! - Provide health check for chain connectivity

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use url::Url;

use crate::chain::transaction::PackedTransaction;
use crate::chain::types::{
    Block, ChainConfig, ChainError, ChainInfo, ChainResult, SubmittedTransaction, TableRows,
    TableRowsRequest,
};
use crate::observability::metrics;

/// The RPC surface this service needs from a node.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_info(&self) -> ChainResult<ChainInfo>;

    async fn get_block(&self, block_num: u32) -> ChainResult<Block>;

    async fn get_table_rows(&self, request: &TableRowsRequest) -> ChainResult<TableRows>;

    async fn push_transaction(&self, trx: &PackedTransaction) -> ChainResult<SubmittedTransaction>;

    /// True if the node answers `get_info`.
    async fn is_healthy(&self) -> bool {
        self.get_info().await.is_ok()
    }
}

/// Shared handle to a chain client.
pub type SharedChainRpc = Arc<dyn ChainRpc>;

/// Error body returned by nodeos on rejected requests.
#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: Option<NodeErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct NodeErrorDetail {
    #[serde(default)]
    what: String,
    #[serde(default)]
    details: Vec<NodeErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct NodeErrorMessage {
    #[serde(default)]
    message: String,
}

impl NodeErrorBody {
    /// Most specific message available: details, then `what`, then the top-level message.
    fn describe(&self) -> String {
        if let Some(error) = &self.error {
            let details: Vec<&str> = error
                .details
                .iter()
                .map(|d| d.message.as_str())
                .filter(|m| !m.is_empty())
                .collect();
            if !details.is_empty() {
                return details.join("; ");
            }
            if !error.what.is_empty() {
                return error.what.clone();
            }
        }
        self.message.clone()
    }
}

#[derive(Serialize)]
struct GetBlockParams {
    block_num_or_id: u32,
}

/// Parse a base URL so that relative joins append to its path.
fn parse_endpoint(raw: &str) -> Result<Url, url::ParseError> {
    let mut url: Url = raw.parse()?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// HTTP client for a nodeos endpoint with failover support.
#[derive(Clone)]
pub struct HttpChainClient {
    http: reqwest::Client,
    /// Primary endpoint first, then failovers.
    endpoints: Vec<Url>,
    config: ChainConfig,
    timeout_duration: Duration,
}

impl HttpChainClient {
    /// Create a new chain client.
    ///
    /// Fails only on an invalid primary URL; unreachable nodes are reported per call.
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut endpoints = Vec::new();

        let primary = parse_endpoint(&config.rpc_url).map_err(|e| {
            ChainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        endpoints.push(primary);

        for url_str in &config.failover_urls {
            match parse_endpoint(url_str) {
                Ok(url) => endpoints.push(url),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChainError::Rpc(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = endpoints.len() - 1,
            "Chain client initialized"
        );

        Ok(Self {
            http,
            endpoints,
            config,
            timeout_duration,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// POST `body` to `path` on one endpoint.
    async fn call<B, T>(&self, endpoint: &Url, path: &str, body: &B) -> ChainResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = endpoint
            .join(path)
            .map_err(|e| ChainError::Rpc(format!("Invalid RPC path '{}': {}", path, e)))?;

        let request = self.http.post(url).json(body).send();
        let response = match timeout(self.timeout_duration, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(ChainError::Rpc(e.to_string())),
            Err(_) => return Err(ChainError::Timeout(self.config.rpc_timeout_secs)),
        };

        let status = response.status();
        let bytes = match timeout(self.timeout_duration, response.bytes()).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(ChainError::Rpc(e.to_string())),
            Err(_) => return Err(ChainError::Timeout(self.config.rpc_timeout_secs)),
        };

        if !status.is_success() {
            let message = serde_json::from_slice::<NodeErrorBody>(&bytes)
                .map(|body| body.describe())
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ChainError::Rejected(message));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ChainError::InvalidResponse(format!("{}: {}", path, e)))
    }

    /// Try each endpoint in order. A node rejection is final: another node
    /// would answer the same.
    async fn call_with_failover<B, T>(&self, method: &'static str, path: &str, body: &B) -> ChainResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            match self.call(endpoint, path, body).await {
                Ok(result) => {
                    metrics::record_chain_call(method, "ok");
                    return Ok(result);
                }
                Err(e @ ChainError::Rejected(_)) | Err(e @ ChainError::InvalidResponse(_)) => {
                    metrics::record_chain_call(method, "rejected");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next endpoint");
                }
            }
        }
        metrics::record_chain_call(method, "unavailable");
        Err(ChainError::Rpc(format!("All RPC endpoints failed for {}", method)))
    }

    /// Single attempt on the primary endpoint. Used for submission: a push that
    /// timed out may still have been accepted, so it is never re-sent.
    async fn call_primary<B, T>(&self, method: &'static str, path: &str, body: &B) -> ChainResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let endpoint = self
            .endpoints
            .first()
            .ok_or_else(|| ChainError::Rpc("No RPC endpoint configured".to_string()))?;
        let result = self.call(endpoint, path, body).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(ChainError::Rejected(_)) | Err(ChainError::InvalidResponse(_)) => "rejected",
            Err(_) => "unavailable",
        };
        metrics::record_chain_call(method, outcome);
        result
    }
}

#[async_trait]
impl ChainRpc for HttpChainClient {
    async fn get_info(&self) -> ChainResult<ChainInfo> {
        self.call_with_failover("get_info", "v1/chain/get_info", &serde_json::json!({}))
            .await
    }

    async fn get_block(&self, block_num: u32) -> ChainResult<Block> {
        self.call_with_failover(
            "get_block",
            "v1/chain/get_block",
            &GetBlockParams { block_num_or_id: block_num },
        )
        .await
    }

    async fn get_table_rows(&self, request: &TableRowsRequest) -> ChainResult<TableRows> {
        self.call_with_failover("get_table_rows", "v1/chain/get_table_rows", request)
            .await
    }

    async fn push_transaction(&self, trx: &PackedTransaction) -> ChainResult<SubmittedTransaction> {
        let raw: serde_json::Value = self
            .call_primary("push_transaction", "v1/chain/push_transaction", trx)
            .await?;
        let transaction_id = raw
            .get("transaction_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChainError::InvalidResponse("push_transaction: missing transaction_id".to_string()))?
            .to_string();
        Ok(SubmittedTransaction { transaction_id, raw })
    }
}

impl std::fmt::Debug for HttpChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("endpoints", &self.endpoints.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChainConfig {
        ChainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            rpc_timeout_secs: 1,
            ..ChainConfig::default()
        }
    }

    #[test]
    fn test_client_creation() {
        assert!(HttpChainClient::new(test_config()).is_ok());

        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        assert!(HttpChainClient::new(config).is_err());
    }

    #[tokio::test]
    async fn test_rpc_failover() {
        let mut config = test_config();
        // Add a secondary unreachable URL
        config.failover_urls.push("http://127.0.0.1:2".to_string());

        let client = HttpChainClient::new(config).unwrap();

        // Both endpoints refuse connections, so every endpoint is tried.
        let result = client.get_info().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("All RPC endpoints failed"));
        assert!(!client.is_healthy().await);
    }

    /// Node that counts pushes and accepts them.
    async fn counting_node() -> (String, Arc<std::sync::atomic::AtomicUsize>) {
        use axum::routing::post;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let pushes = Arc::new(AtomicUsize::new(0));
        let counter = pushes.clone();
        let app = axum::Router::new().route(
            "/v1/chain/push_transaction",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(serde_json::json!({"transaction_id": "abc"}))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}", addr), pushes)
    }

    fn empty_trx() -> PackedTransaction {
        PackedTransaction {
            signatures: vec![],
            compression: 0,
            packed_context_free_data: String::new(),
            packed_trx: String::new(),
        }
    }

    #[tokio::test]
    async fn test_push_never_fails_over() {
        let (secondary, pushes) = counting_node().await;
        let mut config = test_config();
        config.failover_urls.push(secondary);
        let client = HttpChainClient::new(config).unwrap();

        // primary refuses the connection; the secondary must not see the push
        let result = client.push_transaction(&empty_trx()).await;
        assert!(matches!(result, Err(ChainError::Rpc(_))));
        assert_eq!(pushes.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_push_goes_to_primary() {
        let (primary, pushes) = counting_node().await;
        let mut config = test_config();
        config.rpc_url = primary;
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        let client = HttpChainClient::new(config).unwrap();

        let submitted = client.push_transaction(&empty_trx()).await.unwrap();
        assert_eq!(submitted.transaction_id, "abc");
        assert_eq!(pushes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = parse_endpoint("http://node.example/api").unwrap();
        assert_eq!(
            url.join("v1/chain/get_info").unwrap().as_str(),
            "http://node.example/api/v1/chain/get_info"
        );
    }

    #[test]
    fn test_node_error_description() {
        let body: NodeErrorBody = serde_json::from_value(serde_json::json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "code": 3050003,
                "name": "eosio_assert_message_exception",
                "what": "eosio_assert_message assertion failure",
                "details": [{"message": "assertion failure with message: Company had been added before."}]
            }
        }))
        .unwrap();
        assert_eq!(body.describe(), "assertion failure with message: Company had been added before.");

        let body: NodeErrorBody = serde_json::from_value(serde_json::json!({
            "message": "Unknown Endpoint"
        }))
        .unwrap();
        assert_eq!(body.describe(), "Unknown Endpoint");
    }
}
