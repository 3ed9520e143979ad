//! Authentication extractor for mutating routes.
//!
//! Every mutating route requires an `Authorization: Bearer <token>` header;
//! the token is verified against the identity provider before any workflow
//! logic runs. Token verification internals (signatures, expiry) belong to
//! the provider.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use crate::services::identity::AdminClaims;
use crate::state::AppState;

/// Extractor that requires an authenticated administrator.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.account_id)
/// }
/// ```
pub struct RequireAdminAuth(pub AdminClaims);

/// Error returned when admin authentication fails.
pub enum AdminAuthRejection {
    /// No usable `Authorization: Bearer` header on the request.
    MissingCredentials,
    /// The provider rejected the token.
    InvalidToken,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingCredentials => "Missing authentication credentials",
            Self::InvalidToken => "Invalid or expired authentication",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AdminAuthRejection::MissingCredentials)?;

        let token = bearer_token(header).ok_or(AdminAuthRejection::MissingCredentials)?;

        let claims = state.identity().verify_token(token).await.map_err(|err| {
            tracing::debug!(error = %err, "bearer token rejected");
            AdminAuthRejection::InvalidToken
        })?;

        Ok(Self(claims))
    }
}

/// Extract the token from a `Bearer <token>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extracts_token() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
    }

    #[test]
    fn test_bearer_token_rejects_empty_token() {
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer    "), None);
    }

    #[test]
    fn test_bearer_token_rejects_bare_scheme() {
        assert_eq!(bearer_token("Bearer"), None);
    }
}
