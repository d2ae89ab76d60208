//! Certification contract endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tokio::time::Instant;

use crate::certify::types::{
    AddSignersRequest, CertificateRef, CreateCertificateRequest, CreateEntityRequest,
    CreateMultipleRequest, EntityKind, SignCertificateRequest,
};
use crate::chain::keys::PrivateKey;
use crate::http::response::{ApiError, ApiResponse, ApiResult};
use crate::http::server::AppState;

async fn create_entity(state: &AppState, kind: EntityKind, request: CreateEntityRequest) -> ApiResult {
    let actions = state.builder.create_entity(kind, &request)?;
    let submitted = state.session.transact(actions, state.options).await?;
    Ok(ApiResponse::created(
        format!(
            "{} with {} id is added.",
            request.name.unwrap_or_default(),
            request.id.unwrap_or_default()
        ),
        submitted.raw,
    ))
}

pub async fn create_institution(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntityRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    create_entity(&state, EntityKind::Institution, request).await
}

pub async fn create_corporate(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntityRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    create_entity(&state, EntityKind::Corporate, request).await
}

pub async fn create_certificate(
    State(state): State<AppState>,
    payload: Result<Json<CreateCertificateRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    let kind = state.entity_kind;
    let actions = state.builder.create_certificate(kind, &request)?;
    let submitted = state.session.transact(actions, state.options).await?;
    Ok(ApiResponse::created(
        format!(
            "Certificate with {} id is added for {} id {}.",
            request.certificate_id.unwrap_or_default(),
            kind.label(),
            request.owner_id.unwrap_or_default()
        ),
        submitted.raw,
    ))
}

pub async fn delete_certificate(
    State(state): State<AppState>,
    payload: Result<Json<CertificateRef>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    let kind = state.entity_kind;
    let actions = state.builder.delete_certificate(kind, &request)?;
    let submitted = state.session.transact(actions, state.options).await?;
    Ok(ApiResponse::created(
        format!(
            "Certificate with {} id is deleted from {} id {}.",
            request.certificate_id.unwrap_or_default(),
            kind.label(),
            request.owner_id.unwrap_or_default()
        ),
        submitted.raw,
    ))
}

pub async fn add_signer(
    State(state): State<AppState>,
    payload: Result<Json<AddSignersRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    let actions = state.builder.add_signers(state.entity_kind, &request)?;
    let submitted = state.session.transact(actions, state.options).await?;
    let names: Vec<&str> = request
        .signers
        .iter()
        .flatten()
        .map(|s| s.name())
        .collect();
    Ok(ApiResponse::created(
        format!("Signer(s) {} added to certificate {}.", names.join(", "), request.certificate_id.unwrap_or_default()),
        submitted.raw,
    ))
}

/// Co-signed by the operator and the certificate signer. The signer's key is
/// used for this one transaction only.
pub async fn sign_certificate(
    State(state): State<AppState>,
    payload: Result<Json<SignCertificateRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    let actions = state.builder.sign_certificate(state.entity_kind, &request)?;

    let raw_key = request
        .signer_private
        .as_deref()
        .ok_or_else(|| ApiError::Validation("Valid signerPrivate has not been provided.".to_string()))?;
    let key = PrivateKey::from_string(raw_key.trim())
        .map_err(|_| ApiError::Validation("signerPrivate is not a valid private key.".to_string()))?;

    let session = state.session.with_cosigner(key);
    let submitted = session.transact(actions, state.signing_options).await?;
    Ok(ApiResponse::created(
        format!(
            "Certificate with {} is signed by {}.",
            request.certificate_id.unwrap_or_default(),
            request.signer.as_deref().unwrap_or_default()
        ),
        submitted.raw,
    ))
}

/// Entity, certificate and signers in one transaction, then wait for inclusion.
pub async fn create_multiple(
    State(state): State<AppState>,
    payload: Result<Json<CreateMultipleRequest>, JsonRejection>,
) -> ApiResult {
    let started = Instant::now();
    let Json(request) = payload?;
    let actions = state.builder.create_multiple(state.entity_kind, &request)?;
    let executed: Vec<&'static str> = actions.iter().map(|a| a.name.as_str()).collect();

    let start_height = state.session.head_block_num().await?;
    let submitted = state.session.transact(actions, state.options).await?;
    let confirmation = state
        .composite_poller(started)
        .wait(start_height, &submitted.transaction_id)
        .await?;

    Ok(ApiResponse::created(
        format!(
            "Transactions {} executed in block {}.",
            executed.join(", "),
            confirmation.block_num
        ),
        submitted.raw,
    ))
}
