//! Account creation endpoints.
//!
//! The generated private key is returned in the response and nowhere else.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tokio::time::Instant;

use crate::certify::types::CreateAccountRequest;
use crate::http::response::{AccountKeys, ApiResponse, ApiResult};
use crate::http::server::AppState;

pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    let creation = state.builder.create_account(&request)?;
    let submitted = state.session.transact(creation.actions, state.options).await?;

    tracing::info!(account = %creation.account, transaction_id = %submitted.transaction_id, "Account created");
    Ok(ApiResponse::created(format!("Account {} created", creation.account), submitted.raw)
        .with_keys(AccountKeys::from(&creation.keys)))
}

/// Like [`create_account`], but only answers once the transaction is in a block.
pub async fn create_account_and_confirm(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult {
    let started = Instant::now();
    let Json(request) = payload?;
    let creation = state.builder.create_account(&request)?;

    let start_height = state.session.head_block_num().await?;
    let submitted = state.session.transact(creation.actions, state.options).await?;
    let confirmation = state
        .single_poller(started)
        .wait(start_height, &submitted.transaction_id)
        .await?;

    tracing::info!(
        account = %creation.account,
        transaction_id = %submitted.transaction_id,
        block_num = confirmation.block_num,
        "Account creation confirmed"
    );
    Ok(ApiResponse::created(format!("Account {} created", creation.account), submitted.raw)
        .with_keys(AccountKeys::from(&creation.keys)))
}
