//! Core types for the Socio backend.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod national_id;
pub mod passport;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use national_id::{NationalId, NationalIdError};
pub use passport::{PassportId, PassportIdError};
pub use status::*;
