use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use service::ServiceError;
use thiserror::Error;
use tracing::{debug, error};

use crate::observability::INTERNAL_ERRORS_TOTAL;

const INTERNAL: &str = "Erro interno do servidor";

/// Handler error rendered as `{"erro": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// Delete refused; carries how many customers still point at the city.
    Linked { message: String, linked: usize },
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        debug!(kind = e.kind(), error = %e, "request failed");
        match e {
            ServiceError::Validation(m) => ApiError::BadRequest(m),
            ServiceError::Model(m) => ApiError::BadRequest(m.to_string()),
            ServiceError::Conflict(m) => ApiError::Conflict(m),
            ServiceError::NotFound(m) => ApiError::NotFound(m),
            ServiceError::Integrity { message, linked } => ApiError::Linked { message, linked },
            ServiceError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("JSON inválido: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, Json(json!({"erro": m}))).into_response(),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, Json(json!({"erro": m}))).into_response(),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, Json(json!({"erro": m}))).into_response(),
            ApiError::Linked { message, linked } => (
                StatusCode::BAD_REQUEST,
                Json(json!({"erro": message, "clientesVinculados": linked})),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                // details stay in the log, callers get a generic message
                error!(error = %detail, "internal error");
                INTERNAL_ERRORS_TOTAL.inc();
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"erro": INTERNAL}))).into_response()
            }
        }
    }
}

/// `Json` extractor whose rejections use the API's error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("store initialization failed: {0}")]
    Store(#[from] service::StoreError),
}
