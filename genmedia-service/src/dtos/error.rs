use crate::models::{ErrorKind, GenerationError};
use crate::services::{ImageQaError, LocalImageError};
use crate::services::providers::ProviderError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use service_core::error::AppError;

/// HTTP status for a failed generation or provider call.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError | ErrorKind::CredentialError => StatusCode::BAD_REQUEST,
        ErrorKind::AuthenticationError => StatusCode::UNAUTHORIZED,
        ErrorKind::QuotaExceededError => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::NetworkError | ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ProviderTimeoutError => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::PersistenceError | ErrorKind::UnknownError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub error_type: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
}

/// Error returned by the API handlers.
///
/// Provider-facing failures carry an [`ErrorKind`] and render as
/// `{success, error, error_type, suggestion}`; everything else is an
/// [`AppError`].
#[derive(Debug)]
pub enum ApiError {
    Generation(GenerationError),
    App(AppError),
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        ApiError::Generation(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::Generation(GenerationError::new(err.kind(), err.to_string()))
    }
}

impl From<ImageQaError> for ApiError {
    fn from(err: ImageQaError) -> Self {
        ApiError::Generation(GenerationError::new(err.kind(), err.to_string()))
    }
}

impl From<LocalImageError> for ApiError {
    fn from(err: LocalImageError) -> Self {
        match err {
            LocalImageError::NotFound(_) => {
                ApiError::App(AppError::NotFound(anyhow::anyhow!(err.to_string())))
            }
            LocalImageError::OutsideProject(_) | LocalImageError::UnsupportedType(_) => {
                ApiError::Generation(GenerationError::validation(err.to_string()))
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Generation(GenerationError::validation(err.to_string()))
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::App(AppError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::App(err) => err.into_response(),
            ApiError::Generation(err) => {
                if err.kind == ErrorKind::UnknownError || err.kind == ErrorKind::PersistenceError {
                    tracing::error!(error_type = %err.kind, error = %err.message, "Request failed");
                } else {
                    tracing::warn!(error_type = %err.kind, error = %err.message, "Request failed");
                }
                let body = ErrorBody {
                    success: false,
                    error: err.message,
                    error_type: err.kind,
                    suggestion: err.kind.hint(),
                };
                (status_for(err.kind), Json(body)).into_response()
            }
        }
    }
}
