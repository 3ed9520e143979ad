//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::db::members::MemberRepository;
use crate::services::billing::{BillingClient, BillingError, CustomerDirectory};
use crate::services::identity::{IdentityClient, IdentityError, IdentityProvider};
use crate::services::registration::RegistrationService;

/// Errors that can occur while assembling the application state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Identity provider client failed to build.
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),

    /// Billing client failed to build.
    #[error("billing client: {0}")]
    Billing(#[from] BillingError),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    identity: Arc<dyn IdentityProvider>,
    registration: RegistrationService,
}

impl AppState {
    /// Assemble the state: collaborator clients, repository, and the
    /// registration service wired together.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if a collaborator HTTP client fails to build.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let identity: Arc<dyn IdentityProvider> = Arc::new(IdentityClient::new(
            config.identity(),
            config.external_timeout,
        )?);

        let billing: Option<Arc<dyn CustomerDirectory>> = match config.billing() {
            Some(billing_config) => Some(Arc::new(BillingClient::new(
                billing_config,
                config.external_timeout,
            )?)),
            None => None,
        };

        let store = Arc::new(MemberRepository::new(pool.clone()));
        let registration = RegistrationService::new(Arc::clone(&identity), billing, store);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                identity,
                registration,
            }),
        })
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Identity provider handle (used by the auth extractor).
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Registration workflow service.
    #[must_use]
    pub fn registration(&self) -> &RegistrationService {
        &self.inner.registration
    }
}
