//! Identity provider client.
//!
//! The provider owns accounts and credentials. This service only ever
//! verifies admin bearer tokens and creates passwordless member accounts -
//! the member sets their password later through the provider's out-of-band
//! reset flow.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use socio_core::{AccountId, Email};

use crate::config::IdentityConfig;

/// Errors that can occur when interacting with the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed (transport, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The email is already associated with an existing account.
    #[error("an account already exists for this email")]
    DuplicateEmail,

    /// Bearer token is missing, malformed, or expired.
    #[error("invalid or expired credentials")]
    Unauthorized,

    /// Failed to parse a provider response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Token claims the provider attaches to a verified admin bearer token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminClaims {
    /// The administrator's provider account.
    pub account_id: AccountId,
    /// The administrator's email, when the provider discloses it.
    pub email: Option<Email>,
}

/// Identity provider seam.
///
/// Implemented by [`IdentityClient`] in production; tests substitute fakes
/// with call counters.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify an admin bearer token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` for a rejected token, any other
    /// variant for provider failures.
    async fn verify_token(&self, token: &str) -> Result<AdminClaims, IdentityError>;

    /// Create a passwordless account for a new member.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::DuplicateEmail` when the email is already
    /// registered; any other variant for provider failures.
    async fn create_account(
        &self,
        email: &Email,
        display_name: &str,
    ) -> Result<AccountId, IdentityError>;
}

/// HTTP client for the identity provider's admin API.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountResponse {
    account_id: AccountId,
}

impl IdentityClient {
    /// Create a new identity provider client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig, timeout: Duration) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();

        // Server key authorizes the admin API
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| IdentityError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    async fn verify_token(&self, token: &str) -> Result<AdminClaims, IdentityError> {
        let url = format!("{}/v1/token/verify", self.base_url);

        let body = serde_json::json!({ "token": token });
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(IdentityError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }

    async fn create_account(
        &self,
        email: &Email,
        display_name: &str,
    ) -> Result<AccountId, IdentityError> {
        let url = format!("{}/v1/accounts", self.base_url);

        // No credential is supplied: the account starts passwordless and the
        // member claims it via the provider's reset flow.
        let body = serde_json::json!({
            "email": email.as_str(),
            "displayName": display_name,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if status == StatusCode::CONFLICT {
            return Err(IdentityError::DuplicateEmail);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CreateAccountResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        Ok(parsed.account_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_deserialize() {
        let claims: AdminClaims = serde_json::from_str(
            r#"{"accountId":"acct_8f3k","email":"admin@example.com"}"#,
        )
        .unwrap();
        assert_eq!(claims.account_id.as_str(), "acct_8f3k");
        assert_eq!(claims.email.unwrap().as_str(), "admin@example.com");
    }

    #[test]
    fn test_claims_deserialize_without_email() {
        let claims: AdminClaims = serde_json::from_str(r#"{"accountId":"acct_8f3k"}"#).unwrap();
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_create_account_response_deserialize() {
        let parsed: CreateAccountResponse =
            serde_json::from_str(r#"{"accountId":"acct_new"}"#).unwrap();
        assert_eq!(parsed.account_id.as_str(), "acct_new");
    }
}
