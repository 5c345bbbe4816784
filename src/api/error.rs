use crate::db::StoreError;
use crate::service::ServiceError;
use crate::sync::SyncError;
use crate::validation::ValidationError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Upstream provider error: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// Malformed bodies, missing fields and wrong content types all answer 400 JSON
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidBitcoinAddress(address) => ApiError::InvalidAddress(address),
            ValidationError::MissingParameter(param) => {
                ApiError::BadRequest(format!("Missing parameter: {}", param))
            }
            ValidationError::InvalidParameter(msg) => ApiError::InvalidParameter(msg),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::RateLimitExceeded { .. } => ApiError::RateLimited(message),
            SyncError::Upstream { .. } | SyncError::MalformedData { .. } => ApiError::BadGateway(message),
            SyncError::GapDetected { .. } => ApiError::Conflict(message),
            SyncError::Store {
                source: StoreError::Conflict(_),
                ..
            } => ApiError::Conflict(message),
            SyncError::Store { source, .. } => ApiError::Database(source),
            SyncError::Cancelled { .. } => ApiError::Unavailable(message),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotTracked(address) => {
                ApiError::NotFound(format!("Address {} is not being tracked", address))
            }
            ServiceError::Validation(e) => e.into(),
            ServiceError::Sync(e) => e.into(),
            ServiceError::Store(StoreError::Conflict(address)) => {
                ApiError::Conflict(format!("Address {} changed concurrently", address))
            }
            ServiceError::Store(e) => ApiError::Database(e),
        }
    }
}
