//! Shared utilities for integration testing: a scripted EOSIO node and a
//! gateway wired to it, both on ephemeral ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use certify_gateway::chain::keys::{PrivateKey, SignerSet};
use certify_gateway::config::GatewayConfig;
use certify_gateway::lifecycle::build_state;
use certify_gateway::{HttpServer, Shutdown};

pub const OPERATOR_KEY: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
pub const CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";
pub const TRANSACTION_ID: &str = "4f5b7cdb1d3b0d0a8b2d3c7e2a1f0e9d8c7b6a5f4e3d2c1b0a99887766554433";

/// What the mock node has seen and how it answers.
#[derive(Default)]
pub struct NodeState {
    pub head: AtomicU32,
    /// Block that carries `TRANSACTION_ID`, if any.
    pub confirm_at: Mutex<Option<u32>>,
    /// Rows served per table name.
    pub tables: Mutex<HashMap<String, Vec<Value>>>,
    /// Assertion message for rejected pushes.
    pub reject_with: Mutex<Option<String>>,
    pub pushes: Mutex<Vec<Value>>,
    pub table_requests: Mutex<Vec<Value>>,
    pub blocks_fetched: Mutex<Vec<u32>>,
    /// Fiat per EOS served by the price feed route.
    pub rate: Mutex<Option<f64>>,
}

pub struct MockNode {
    pub addr: SocketAddr,
    pub state: Arc<NodeState>,
}

impl MockNode {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_rows(&self, table: &str, rows: Vec<Value>) {
        self.state.tables.lock().unwrap().insert(table.to_string(), rows);
    }

    pub fn confirm_at(&self, block_num: u32) {
        *self.state.confirm_at.lock().unwrap() = Some(block_num);
    }

    pub fn reject_with(&self, message: &str) {
        *self.state.reject_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn push_count(&self) -> usize {
        self.state.pushes.lock().unwrap().len()
    }

    pub fn last_table_request(&self) -> Option<Value> {
        self.state.table_requests.lock().unwrap().last().cloned()
    }
}

async fn get_info(State(state): State<Arc<NodeState>>) -> Json<Value> {
    Json(json!({
        "server_version": "d133c641",
        "chain_id": CHAIN_ID,
        "head_block_num": state.head.load(Ordering::SeqCst),
        "last_irreversible_block_num": state.head.load(Ordering::SeqCst) - 2,
        "head_block_time": "2024-01-01T00:00:00.500",
        "server_version_string": "v2.0.13"
    }))
}

async fn get_block(State(state): State<Arc<NodeState>>, Json(body): Json<Value>) -> Json<Value> {
    let block_num = body["block_num_or_id"].as_u64().unwrap_or_default() as u32;
    state.blocks_fetched.lock().unwrap().push(block_num);

    let transactions = if *state.confirm_at.lock().unwrap() == Some(block_num) {
        json!([{"status": "executed", "trx": {"id": TRANSACTION_ID, "signatures": []}}])
    } else {
        json!([])
    };
    Json(json!({
        "block_num": block_num,
        "timestamp": "2024-01-01T00:00:00.500",
        "ref_block_prefix": 3_735_928_559u32,
        "transactions": transactions
    }))
}

async fn get_table_rows(State(state): State<Arc<NodeState>>, Json(body): Json<Value>) -> Json<Value> {
    let table = body["table"].as_str().unwrap_or_default().to_string();
    state.table_requests.lock().unwrap().push(body);
    let rows = state.tables.lock().unwrap().get(&table).cloned().unwrap_or_default();
    Json(json!({"rows": rows, "more": false}))
}

async fn push_transaction(State(state): State<Arc<NodeState>>, Json(body): Json<Value>) -> Response {
    if let Some(message) = state.reject_with.lock().unwrap().clone() {
        let error = json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "code": 3050003,
                "name": "eosio_assert_message_exception",
                "what": "eosio_assert_message assertion failure",
                "details": [{"message": format!("assertion failure with message: {}", message)}]
            }
        });
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response();
    }
    state.pushes.lock().unwrap().push(body);
    Json(json!({
        "transaction_id": TRANSACTION_ID,
        "processed": {"id": TRANSACTION_ID, "receipt": {"status": "executed"}}
    }))
    .into_response()
}

async fn simple_price(State(state): State<Arc<NodeState>>) -> Response {
    match *state.rate.lock().unwrap() {
        Some(rate) => Json(json!({"eos": {"gbp": rate}})).into_response(),
        None => (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response(),
    }
}

/// Start a mock node with the given head block. The price feed lives under `/feed`.
pub async fn start_mock_node(head: u32) -> MockNode {
    let state = Arc::new(NodeState::default());
    state.head.store(head, Ordering::SeqCst);
    *state.rate.lock().unwrap() = Some(0.5);

    let app = Router::new()
        .route("/v1/chain/get_info", post(get_info))
        .route("/v1/chain/get_block", post(get_block))
        .route("/v1/chain/get_table_rows", post(get_table_rows))
        .route("/v1/chain/push_transaction", post(push_transaction))
        .route("/feed/simple/price", get(simple_price))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockNode { addr, state }
}

/// Gateway config pointed at `node`, with fast confirmation scans.
pub fn gateway_config(node: &MockNode) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.chain.rpc_url = node.url();
    config.chain.rpc_timeout_secs = 2;
    config.pricing.feed_url = format!("{}/feed", node.url());
    config.confirmation.single_delay_ms = 5;
    config.confirmation.composite_delay_ms = 5;
    config
}

pub struct Gateway {
    pub base: String,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl Gateway {
    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .expect("gateway unreachable");
        let status = res.status().as_u16();
        (status, res.json().await.expect("envelope is JSON"))
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> (u16, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base, path))
            .query(query)
            .send()
            .await
            .expect("gateway unreachable");
        let status = res.status().as_u16();
        (status, res.json().await.expect("envelope is JSON"))
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve the gateway for `config` on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let key: PrivateKey = OPERATOR_KEY.parse().unwrap();
    let state = build_state(&config, SignerSet::new(key)).unwrap();

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, state);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    Gateway { base: format!("http://{}", addr), shutdown, client }
}
