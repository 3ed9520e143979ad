//! Billing collaborator client for customer lookups.
//!
//! Linking a new member to a pre-existing billing customer is advisory: the
//! workflow swallows every failure from this client and registers the member
//! without a linkage. Nothing here may abort a registration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use socio_core::{CustomerId, NationalId};

use crate::config::BillingConfig;

/// Errors that can occur when interacting with the billing API.
#[derive(Debug, Error)]
pub enum BillingError {
    /// HTTP request failed (transport, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Billing-customer lookup seam.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Look up a billing customer by national identifier.
    ///
    /// Returns `Ok(None)` when no customer matches.
    ///
    /// # Errors
    ///
    /// Returns `BillingError` if the API request fails; callers in the
    /// registration path degrade this to `None`.
    async fn find_customer_by_national_id(
        &self,
        national_id: &NationalId,
    ) -> Result<Option<CustomerId>, BillingError>;
}

/// HTTP client for the billing collaborator.
#[derive(Clone)]
pub struct BillingClient {
    client: reqwest::Client,
    base_url: String,
}

/// Wrapper for the API's list response.
#[derive(Debug, Deserialize)]
struct ApiListResponse<T> {
    data: Vec<T>,
}

/// One customer match.
#[derive(Debug, Deserialize)]
struct CustomerMatch {
    id: CustomerId,
}

impl BillingClient {
    /// Create a new billing API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BillingConfig, timeout: Duration) -> Result<Self, BillingError> {
        let mut headers = HeaderMap::new();

        // Static server-held key
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| BillingError::Parse(format!("Invalid API key format: {e}")))?,
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
impl CustomerDirectory for BillingClient {
    async fn find_customer_by_national_id(
        &self,
        national_id: &NationalId,
    ) -> Result<Option<CustomerId>, BillingError> {
        let url = format!("{}/customers", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("nationalId", national_id.as_str())])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BillingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: ApiListResponse<CustomerMatch> = response
            .json()
            .await
            .map_err(|e| BillingError::Parse(e.to_string()))?;

        Ok(first_match(api_response))
    }
}

/// The observed contract: the first match wins, an empty list means no
/// linkage.
fn first_match(response: ApiListResponse<CustomerMatch>) -> Option<CustomerId> {
    response.data.into_iter().next().map(|m| m.id)
}
