//! Request deadline.
//!
//! A request that outlives the deadline is answered with the uniform error
//! envelope rather than a bare 408. Installed with `from_fn_with_state`.

use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::time;

use crate::http::response::ApiError;

pub async fn enforce_deadline(State(limit): State<Duration>, request: Request<Body>, next: Next) -> Response {
    match time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError::RequestTimeout(format!(
            "Request did not complete within {} seconds.",
            limit.as_secs()
        ))
        .into_response(),
    }
}
