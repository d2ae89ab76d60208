//! Table lookups by query string.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::certify::types::{flexible_id, CertificateRef, EntityKind};
use crate::http::response::{ApiError, ApiResponse, ApiResult};
use crate::http::server::AppState;

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Validation(format!("Valid {} has not been provided.", field)))
}

#[derive(Debug, Deserialize)]
pub struct EntityParams {
    #[serde(rename = "institutionId", alias = "corporateId", default, deserialize_with = "flexible_id")]
    pub id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantParams {
    #[serde(rename = "certificateId", default, deserialize_with = "flexible_id")]
    pub certificate_id: Option<u64>,
    #[serde(rename = "institutionId", default, deserialize_with = "flexible_id")]
    pub institution_id: Option<u64>,
    #[serde(rename = "participantName", default)]
    pub participant_name: Option<String>,
}

async fn get_entity(state: &AppState, kind: EntityKind, params: EntityParams) -> ApiResult {
    let id = required(params.id, kind.owner_param())?;
    let row = state.query.entity(kind, id).await?;
    let noun = match kind {
        EntityKind::Institution => "Institution",
        EntityKind::Corporate => "Corporate",
    };
    Ok(ApiResponse::created(format!("{} with {} id returned", noun, id), row))
}

pub async fn get_institution(
    State(state): State<AppState>,
    params: Result<Query<EntityParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    get_entity(&state, EntityKind::Institution, params).await
}

pub async fn get_corporate(
    State(state): State<AppState>,
    params: Result<Query<EntityParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    get_entity(&state, EntityKind::Corporate, params).await
}

pub async fn get_certificate(
    State(state): State<AppState>,
    params: Result<Query<CertificateRef>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let owner_id = required(params.owner_id, state.entity_kind.owner_param())?;
    let certificate_id = required(params.certificate_id, "certificateId")?;
    let row = state.query.certificate(owner_id, certificate_id).await?;
    Ok(ApiResponse::created(format!("Certificate with {} id returned", certificate_id), row))
}

/// Participants only exist on institution certificates.
pub async fn get_participant(
    State(state): State<AppState>,
    params: Result<Query<ParticipantParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let institution_id = required(params.institution_id, "institutionId")?;
    let certificate_id = required(params.certificate_id, "certificateId")?;
    let name = required(params.participant_name, "participantName")?;

    let row = state.query.participant(institution_id, certificate_id, &name).await?;
    Ok(ApiResponse::created(
        format!("Participant {} with {} id is returned.", name, certificate_id),
        row,
    ))
}
