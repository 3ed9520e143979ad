//! Member record domain types.
//!
//! A `MemberRecord` is written exactly once, inside the allocator's
//! transaction, and never updated or deleted by this service. Downstream
//! billing sync owns any later mutation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use socio_core::{AccountId, CustomerId, Email, MemberRole, MemberStatus, NationalId, PassportId};

/// The member's financial responsible - the person the billing collaborator
/// invoices. For adult members this is the member themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialResponsible {
    /// Full name.
    pub name: String,
    /// National identifier, normalized to digits.
    pub national_id: Option<NationalId>,
    /// Date of birth, as entered by the admin.
    pub date_of_birth: Option<String>,
    /// Contact email; also the member's identity-provider login.
    pub email: Email,
    /// Contact phone, free-form.
    pub phone: Option<String>,
    /// Postal address, free-form.
    pub address: Option<String>,
}

/// A registered member (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    /// Sequential membership number; also the record's primary key.
    pub passport_id: PassportId,
    /// Identity-provider account, when provisioning produced one.
    pub account_id: Option<AccountId>,
    /// Linked billing-collaborator customer, when the lookup matched.
    pub external_customer_id: Option<CustomerId>,
    /// Account of the administrator who performed the registration.
    pub created_by: AccountId,
    /// Always [`MemberRole::Member`] for records this service creates.
    pub role: MemberRole,
    /// Subscription plan identifier.
    pub plan_id: String,
    /// Always [`MemberStatus::Active`] for records this service creates.
    pub status: MemberStatus,
    /// Server-assigned creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Financial responsible group.
    pub financial_responsible: FinancialResponsible,
}

/// Fields collected by the registration workflow before allocation.
///
/// The passport number, timestamps, role, and status are assigned inside the
/// allocator's transaction, not here.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub account_id: Option<AccountId>,
    pub external_customer_id: Option<CustomerId>,
    pub created_by: AccountId,
    pub plan_id: String,
    pub financial_responsible: FinancialResponsible,
}
