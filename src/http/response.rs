//! Response envelope and error mapping.
//!
//! Every response, success or failure, is
//! `{success, errorCode, message, data}`; account creation adds `keys`.
//! Every failure is HTTP 400.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::certify::types::BuildError;
use crate::chain::keys::KeyPair;
use crate::chain::types::ChainError;
use crate::confirmation::ConfirmationError;
use crate::pricing::PricingError;
use crate::query::QueryError;

/// Key pair handed to a new account owner, exactly once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountKeys {
    pub private_key: String,
    pub public_key: String,
}

impl From<&KeyPair> for AccountKeys {
    fn from(keys: &KeyPair) -> Self {
        Self {
            private_key: keys.private_key.to_wif(),
            public_key: keys.public_key.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    pub error_code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<AccountKeys>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 201: mutations and lookups.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            success: true,
            error_code: "",
            message: message.into(),
            keys: None,
            data,
        }
    }

    /// 200: price estimates and health.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            ..Self::created(message, data)
        }
    }

    pub fn with_keys(mut self, keys: AccountKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Request-scoped failure. The message is always the underlying error's own text.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    ChainRpc(String),

    #[error("{0}")]
    MissingDependency(String),

    #[error("{0}")]
    PriceFeed(String),

    /// The whole request outlived `timeouts.request_secs`.
    #[error("{0}")]
    RequestTimeout(String),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Timeout(_) => "CONFIRMATION_TIMEOUT",
            ApiError::ChainRpc(_) => "CHAIN_RPC_ERROR",
            ApiError::MissingDependency(_) => "MISSING_DEPENDENCY",
            ApiError::PriceFeed(_) => "PRICE_FEED_ERROR",
            ApiError::RequestTimeout(_) => "REQUEST_TIMEOUT",
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Key(_) | ChainError::InvalidName(_) | ChainError::InvalidAsset(_) => {
                ApiError::Validation(e.to_string())
            }
            other => ApiError::ChainRpc(other.to_string()),
        }
    }
}

impl From<BuildError> for ApiError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Validation(m) => ApiError::Validation(m),
            BuildError::MissingDependency(m) => ApiError::MissingDependency(m),
            BuildError::Chain(e) => e.into(),
        }
    }
}

impl From<ConfirmationError> for ApiError {
    fn from(e: ConfirmationError) -> Self {
        ApiError::Timeout(e.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::NotFound(m) => ApiError::NotFound(m),
            QueryError::Chain(e) => e.into(),
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::Validation(m) => ApiError::Validation(m),
            PricingError::Chain(e) => e.into(),
            PricingError::Market(_) => ApiError::ChainRpc(e.to_string()),
            PricingError::Feed(_) => ApiError::PriceFeed(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::Validation(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error_code = self.error_code(), error = %self, "Request failed");
        let body = ApiResponse {
            status: StatusCode::BAD_REQUEST,
            success: false,
            error_code: self.error_code(),
            message: self.to_string(),
            keys: None,
            data: Value::Object(Default::default()),
        };
        body.into_response()
    }
}

pub type ApiResult<T = Value> = Result<ApiResponse<T>, ApiError>;
