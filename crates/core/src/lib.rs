//! Socio Core - Shared types library.
//!
//! This crate provides common types used across the Socio backend components:
//! - `api` - Member registration HTTP backend
//! - `integration-tests` - Database-backed test harness
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for passport numbers, national identifiers,
//!   emails, opaque collaborator IDs, and member statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
