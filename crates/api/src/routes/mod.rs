//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check (in main.rs)
//! GET  /health/ready           - Readiness check (in main.rs)
//!
//! GET  /                       - Service banner
//!
//! # Members (bearer-token auth required)
//! POST /registerMember         - Register a new member, returns passportId
//! GET  /customers              - Look up a billing customer by nationalId
//! ```
//!
//! The `/registerMember` path and camelCase body are the contract the admin
//! frontend already speaks; they are kept as-is rather than renamed.

pub mod members;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .merge(members::router())
}

/// Service banner, also a cheap smoke check for deploys.
async fn banner() -> &'static str {
    "Socio membership API is up"
}
