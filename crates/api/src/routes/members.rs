//! Member registration route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use socio_core::{CustomerId, PassportId};

use crate::error::AppError;
use crate::middleware::RequireAdminAuth;
use crate::services::registration::RegisterMemberRequest;
use crate::state::AppState;

/// Build the members router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/registerMember", post(register_member))
        .route("/customers", get(find_customer))
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Successful registration response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterMemberResponse {
    status: &'static str,
    passport_id: PassportId,
}

/// Query parameters for the customer lookup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLookupQuery {
    national_id: String,
}

/// Customer lookup response; `customerId` is `null` when nothing matched.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomerLookupResponse {
    customer_id: Option<CustomerId>,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Register a new member.
///
/// POST /registerMember
async fn register_member(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(req): Json<RegisterMemberRequest>,
) -> Result<Json<RegisterMemberResponse>, AppError> {
    tracing::info!(admin = %admin.account_id, "member registration requested");

    let passport_id = state.registration().register_member(&admin, req).await?;

    Ok(Json(RegisterMemberResponse {
        status: "success",
        passport_id,
    }))
}

/// Look up a billing customer by national identifier.
///
/// Lookup failures and an unconfigured billing collaborator both answer
/// `null`, the same collapse the inline linking does during registration.
///
/// GET /customers?nationalId=X
async fn find_customer(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<CustomerLookupQuery>,
) -> Json<CustomerLookupResponse> {
    let customer_id = state.registration().lookup_customer(&query.national_id).await;

    Json(CustomerLookupResponse { customer_id })
}
