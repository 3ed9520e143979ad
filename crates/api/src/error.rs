//! Unified error handling for the registration API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::identity::IdentityError;
use crate::services::registration::RegistrationError;

/// Application-level error type, mapped onto the wire taxonomy.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed (includes exhausted allocation retries).
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Identity provider operation failed.
    #[error("Identity provider error: {0}")]
    Identity(IdentityError),

    /// The email is already associated with an account.
    #[error("The provided e-mail is already in use")]
    DuplicateIdentity,

    /// Missing or invalid bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Required payload fields missing or invalid.
    #[error("Bad request: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(msg) => Self::Validation(msg),
            RegistrationError::DuplicateIdentity => Self::DuplicateIdentity,
            RegistrationError::Provisioning(err) => Self::Identity(err),
            RegistrationError::Allocation(err) => Self::Database(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Identity(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Registration request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) | Self::Identity(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::DuplicateIdentity => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) | Self::Identity(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Validation("planId is required".to_string());
        assert_eq!(err.to_string(), "Bad request: planId is required");

        let err = AppError::Unauthorized("missing bearer token".to_string());
        assert_eq!(err.to_string(), "Unauthorized: missing bearer token");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::DuplicateIdentity),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Busy)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_duplicate_identity_is_distinct_from_generic_failure() {
        // A duplicate email must never collapse into the opaque 500 path.
        assert_ne!(
            get_status(AppError::DuplicateIdentity),
            get_status(AppError::Internal("test".to_string()))
        );
    }

    #[test]
    fn test_workflow_errors_map_onto_taxonomy() {
        assert_eq!(
            get_status(AppError::from(RegistrationError::DuplicateIdentity)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::from(RegistrationError::Validation(
                "name is required".to_string()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::from(RegistrationError::Allocation(
                RepositoryError::Busy
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::from(RegistrationError::Provisioning(
                IdentityError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                }
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
