//! External collaborators and the registration workflow.

pub mod billing;
pub mod identity;
pub mod registration;

pub use billing::{BillingClient, BillingError, CustomerDirectory};
pub use identity::{AdminClaims, IdentityClient, IdentityError, IdentityProvider};
pub use registration::{RegisterMemberRequest, RegistrationError, RegistrationService};
