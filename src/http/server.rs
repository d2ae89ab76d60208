//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request id, tracing, deadline, body limit, metrics)
//! - Bind server to listener and stop on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::certify::{EntityKind, TransactionBuilder};
use crate::chain::types::{Asset, ChainResult};
use crate::chain::{ChainSession, TransactOptions};
use crate::config::schema::{ConfirmationConfig, GatewayConfig};
use crate::confirmation::{ConfirmationPoller, PollPolicy};
use crate::http::handlers::{account, contract, health, lookup, price};
use crate::http::middleware::metrics::track_metrics;
use crate::http::middleware::timeout::enforce_deadline;
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::pricing::PriceEstimator;
use crate::query::TableQuery;

/// Confirmation scans end this long before the request deadline, so the
/// caller gets the scan's own timeout envelope.
pub const POLL_DEADLINE_MARGIN: Duration = Duration::from_millis(500);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: ChainSession,
    pub builder: Arc<TransactionBuilder>,
    pub query: TableQuery,
    pub pricing: Arc<PriceEstimator>,
    /// Options for operator-signed transactions.
    pub options: TransactOptions,
    /// Options for co-signed certificate signing.
    pub signing_options: TransactOptions,
    pub confirmation: ConfirmationConfig,
    pub request_timeout: Duration,
    /// Contract variant behind the shared certificate endpoints.
    pub entity_kind: EntityKind,
}

impl AppState {
    pub fn new(config: &GatewayConfig, session: ChainSession, pricing: Arc<PriceEstimator>) -> ChainResult<Self> {
        let stake: Asset = config.chain.new_account_stake.parse()?;
        let builder = Arc::new(TransactionBuilder::new(session.contract(), stake));
        let query = TableQuery::new(session.client().clone(), session.contract());

        Ok(Self {
            session,
            builder,
            query,
            pricing,
            options: TransactOptions {
                blocks_behind: config.chain.blocks_behind,
                expire_seconds: config.chain.expire_seconds,
            },
            signing_options: TransactOptions {
                blocks_behind: config.chain.signing_blocks_behind,
                expire_seconds: config.chain.expire_seconds,
            },
            confirmation: config.confirmation.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            entity_kind: config.contract.entity_kind,
        })
    }

    /// Latest moment a scan for a request received at `started` may run.
    pub fn poll_deadline(&self, started: Instant) -> Instant {
        started + self.request_timeout.saturating_sub(POLL_DEADLINE_MARGIN)
    }

    pub fn single_poller(&self, started: Instant) -> ConfirmationPoller {
        ConfirmationPoller::new(self.session.client().clone(), PollPolicy::single(&self.confirmation))
            .with_deadline(self.poll_deadline(started))
    }

    pub fn composite_poller(&self, started: Instant) -> ConfirmationPoller {
        ConfirmationPoller::new(self.session.client().clone(), PollPolicy::composite(&self.confirmation))
            .with_deadline(self.poll_deadline(started))
    }
}

/// HTTP server for the certification gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &GatewayConfig, state: AppState) -> Self {
        Self {
            router: build_router(config, state),
        }
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener, until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    Router::new()
        .route("/createinstitution", post(contract::create_institution))
        .route("/createcorporate", post(contract::create_corporate))
        .route("/createcertificate", post(contract::create_certificate))
        .route("/deletecertificate", post(contract::delete_certificate))
        .route("/addsigner", post(contract::add_signer))
        .route("/signcertificate", post(contract::sign_certificate))
        .route("/createmultiple", post(contract::create_multiple))
        .route("/createaccount", post(account::create_account))
        .route("/createaccountandconfirm", post(account::create_account_and_confirm))
        .route("/calculateprice", post(price::calculate_price))
        .route("/getparticipant", get(lookup::get_participant))
        .route("/getcertificate", get(lookup::get_certificate))
        .route("/getinstitution", get(lookup::get_institution))
        .route("/getcorporate", get(lookup::get_corporate))
        .route("/health", get(health::health))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.security.max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(propagate_request_id_layer())
                .layer(middleware::from_fn_with_state(
                    Duration::from_secs(config.timeouts.request_secs),
                    enforce_deadline,
                )),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::{ChainRpc, SharedChainRpc};
    use crate::chain::keys::SignerSet;
    use crate::chain::transaction::PackedTransaction;
    use crate::chain::types::{
        Block, ChainError, ChainInfo, SubmittedTransaction, TableRows, TableRowsRequest,
    };
    use crate::pricing::{ExchangeRateFeed, PricingResult};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Counts every call and fails all of them.
    #[derive(Default)]
    struct DeadNode {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainRpc for DeadNode {
        async fn get_info(&self) -> ChainResult<ChainInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ChainError::Rpc("connection refused".to_string()))
        }

        async fn get_block(&self, _block_num: u32) -> ChainResult<Block> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ChainError::Rpc("connection refused".to_string()))
        }

        async fn get_table_rows(&self, _request: &TableRowsRequest) -> ChainResult<TableRows> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ChainError::Rpc("connection refused".to_string()))
        }

        async fn push_transaction(&self, _trx: &PackedTransaction) -> ChainResult<SubmittedTransaction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ChainError::Rpc("connection refused".to_string()))
        }
    }

    struct FixedRate;

    #[async_trait]
    impl ExchangeRateFeed for FixedRate {
        async fn rate(&self) -> PricingResult<f64> {
            Ok(0.5)
        }
    }

    /// Answers reads and pushes at once. Blocks at or above `slow_from`
    /// take `block_delay`; `get_info` takes `info_delay`.
    struct SlowNode {
        slow_from: u32,
        block_delay: Duration,
        info_delay: Duration,
        blocks_fetched: AtomicUsize,
    }

    impl SlowNode {
        fn new(slow_from: u32, block_delay: Duration, info_delay: Duration) -> Arc<Self> {
            Arc::new(Self { slow_from, block_delay, info_delay, blocks_fetched: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl ChainRpc for SlowNode {
        async fn get_info(&self) -> ChainResult<ChainInfo> {
            tokio::time::sleep(self.info_delay).await;
            Ok(ChainInfo {
                chain_id: "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906".to_string(),
                head_block_num: 1000,
                head_block_time: "2024-01-01T00:00:00.500".to_string(),
                last_irreversible_block_num: 998,
                server_version_string: None,
            })
        }

        async fn get_block(&self, block_num: u32) -> ChainResult<Block> {
            if block_num >= self.slow_from {
                self.blocks_fetched.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.block_delay).await;
            }
            Ok(Block {
                block_num,
                timestamp: "2024-01-01T00:00:00.500".to_string(),
                ref_block_prefix: 7,
                transactions: vec![],
            })
        }

        async fn get_table_rows(&self, _request: &TableRowsRequest) -> ChainResult<TableRows> {
            Ok(TableRows::default())
        }

        async fn push_transaction(&self, _trx: &PackedTransaction) -> ChainResult<SubmittedTransaction> {
            Ok(SubmittedTransaction { transaction_id: "abc123".to_string(), raw: json!({"transaction_id": "abc123"}) })
        }
    }

    fn router(node: Arc<DeadNode>) -> Router {
        router_with(node, GatewayConfig::default())
    }

    fn router_with(client: SharedChainRpc, config: GatewayConfig) -> Router {
        let signer = SignerSet::new("5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3".parse().unwrap());
        let session = ChainSession::new(client.clone(), "certify".parse().unwrap(), signer);
        let pricing = Arc::new(PriceEstimator::new(client, Arc::new(FixedRate), "gbp", "£"));
        let state = AppState::new(&config, session, pricing).unwrap();
        build_router(&config, state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_before_any_rpc() {
        let node = Arc::new(DeadNode::default());
        let request = Request::post("/createcertificate")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"certificateId": 1}"#))
            .unwrap();

        let response = router(node.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key(&crate::http::X_REQUEST_ID));

        let body = body_json(response).await;
        assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
        assert_eq!(node.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_chain_error() {
        let node = Arc::new(DeadNode::default());
        let request = Request::get("/getinstitution?institutionId=4").body(Body::empty()).unwrap();

        let response = router(node.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errorCode"], json!("CHAIN_RPC_ERROR"));
        assert_eq!(body["message"], json!("RPC error: connection refused"));
        assert_eq!(node.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_scan_ends_in_confirmation_timeout() {
        // every scanned block takes 10 s; 20 of them cannot fit in 60 s
        let node = SlowNode::new(1000, Duration::from_secs(10), Duration::ZERO);
        let request = Request::post("/createaccountandconfirm")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"accountName": "newuser12345"}"#))
            .unwrap();

        let response = router_with(node.clone(), GatewayConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["errorCode"], json!("CONFIRMATION_TIMEOUT"));
        assert_eq!(body["data"], json!({}));
        assert_eq!(node.blocks_fetched.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline_uses_envelope() {
        let node = SlowNode::new(0, Duration::ZERO, Duration::from_secs(600));
        let request = Request::get("/health").body(Body::empty()).unwrap();

        let response = router_with(node, GatewayConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errorCode"], json!("REQUEST_TIMEOUT"));
        assert_eq!(body["message"], json!("Request did not complete within 60 seconds."));
    }

    #[tokio::test]
    async fn test_oversized_body_is_validation_error() {
        let node = Arc::new(DeadNode::default());
        let mut config = GatewayConfig::default();
        config.security.max_body_size = 64;
        let body = format!(r#"{{"institutionId": 1, "institutionName": "{}"}}"#, "a".repeat(200));
        let request = Request::post("/createinstitution")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = router_with(node.clone(), config).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
        assert_eq!(node.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let node = Arc::new(DeadNode::default());
        let request = Request::get("/nope").body(Body::empty()).unwrap();
        let response = router(node).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
