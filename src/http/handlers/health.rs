//! Liveness with chain reachability.

use axum::extract::State;
use serde_json::json;

use crate::http::response::{ApiResponse, ApiResult};
use crate::http::server::AppState;

pub async fn health(State(state): State<AppState>) -> ApiResult {
    let info = state.session.client().get_info().await?;
    Ok(ApiResponse::ok(
        "Chain reachable",
        json!({
            "chain_id": info.chain_id,
            "head_block_num": info.head_block_num,
            "last_irreversible_block_num": info.last_irreversible_block_num,
            "server_version": info.server_version_string,
            "contract": state.session.contract().to_string(),
        }),
    ))
}
