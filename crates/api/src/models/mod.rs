//! Domain types for the member registration backend.

pub mod member;

pub use member::{FinancialResponsible, MemberRecord, NewMember};
