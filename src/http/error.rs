//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::backup::BackupError;
use crate::import::ImportError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Api(api) => match api {
                ApiError::Validation(_) | ApiError::DuplicateKey(_) => StatusCode::BAD_REQUEST,
                ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                ApiError::Import(ImportError::Validation(_))
                | ApiError::Import(ImportError::DuplicateKey(_)) => StatusCode::BAD_REQUEST,
                ApiError::Import(ImportError::ConcurrentImport) => StatusCode::CONFLICT,
                ApiError::Backup(BackupError::FileNotFound(_))
                | ApiError::Backup(BackupError::NoMatchingRecords) => StatusCode::NOT_FOUND,
                ApiError::Backup(BackupError::InvalidFileName(_)) => StatusCode::BAD_REQUEST,
                ApiError::Auth(AuthError::InvalidCredentials)
                | ApiError::Auth(AuthError::InvalidToken) => StatusCode::UNAUTHORIZED,
                ApiError::Auth(AuthError::AccountExists(_)) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Api(ApiError::Validation("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Api(ApiError::DuplicateKey("1".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Api(ApiError::NotFound("1".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Api(ApiError::Import(ImportError::ConcurrentImport)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Api(ApiError::Auth(AuthError::InvalidCredentials)).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Api(ApiError::Storage(StorageError::ContactNotFound("1".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
