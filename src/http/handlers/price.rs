//! Fee estimation endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::http::response::{ApiResponse, ApiResult};
use crate::http::server::AppState;
use crate::pricing::{PriceEstimate, PriceRequest};

pub async fn calculate_price(
    State(state): State<AppState>,
    payload: Result<Json<PriceRequest>, JsonRejection>,
) -> ApiResult<PriceEstimate> {
    let Json(request) = payload?;
    let estimate = state.pricing.estimate(&request).await?;
    Ok(ApiResponse::ok(state.pricing.message(&estimate), estimate))
}
