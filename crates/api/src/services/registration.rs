//! Member registration workflow.
//!
//! `Validating -> Linking (optional) -> Provisioning -> Allocating ->
//! Committed`, with `Failed` reachable from every state. Nothing is retried
//! here; the only retry in the whole flow is the allocator's internal
//! transaction-conflict retry.
//!
//! Failure semantics:
//! - validation failures happen before any external call
//! - linker failures degrade to "no linkage" and are never surfaced
//! - a duplicate email aborts before the allocator runs, so the counter is
//!   untouched
//! - an allocation failure after provisioning leaves the created account
//!   orphaned; there is no compensating deletion, the account is logged for
//!   operator reconciliation

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use socio_core::{CustomerId, Email, NationalId, PassportId};

use crate::db::{MemberStore, RepositoryError};
use crate::models::{FinancialResponsible, NewMember};
use crate::services::billing::CustomerDirectory;
use crate::services::identity::{AdminClaims, IdentityError, IdentityProvider};

/// Errors produced by the registration workflow.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A required payload field is missing or invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The email already has an identity-provider account.
    #[error("an account already exists for this email")]
    DuplicateIdentity,

    /// The identity provider failed for any other reason.
    #[error("account provisioning failed: {0}")]
    Provisioning(#[source] IdentityError),

    /// The allocation transaction failed; nothing was committed.
    #[error("member allocation failed: {0}")]
    Allocation(#[source] RepositoryError),
}

/// Registration payload, deserialized straight off the wire.
///
/// Every field is optional at the serde layer so that missing fields surface
/// as this service's validation errors rather than as framework
/// deserialization rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMemberRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub plan_id: Option<String>,
    /// A customer the caller already resolved; when present the inline
    /// lookup is skipped.
    pub external_customer_id: Option<CustomerId>,
}

/// Orchestrates identity provisioning, customer linking, and passport
/// allocation for one registration request.
#[derive(Clone)]
pub struct RegistrationService {
    identity: Arc<dyn IdentityProvider>,
    billing: Option<Arc<dyn CustomerDirectory>>,
    store: Arc<dyn MemberStore>,
}

impl RegistrationService {
    /// Create a new registration service.
    ///
    /// `billing` is `None` when the billing collaborator is not configured;
    /// registrations then proceed without customer linkage.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        billing: Option<Arc<dyn CustomerDirectory>>,
        store: Arc<dyn MemberStore>,
    ) -> Self {
        Self {
            identity,
            billing,
            store,
        }
    }

    /// Register a new member and return their passport number.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Validation` before any external call when
    /// required fields are missing, `DuplicateIdentity` when the email is
    /// already provisioned (no allocation happens), and
    /// `Provisioning`/`Allocation` for collaborator failures.
    pub async fn register_member(
        &self,
        admin: &AdminClaims,
        req: RegisterMemberRequest,
    ) -> Result<PassportId, RegistrationError> {
        // Validating
        let name = require(req.name.as_deref(), "name")?.to_owned();
        let email_raw = require(req.email.as_deref(), "email")?;
        let plan_id = require(req.plan_id.as_deref(), "planId")?.to_owned();

        let email = Email::parse(email_raw)
            .map_err(|e| RegistrationError::Validation(format!("email: {e}")))?;

        // An identifier that is empty after digit-stripping counts as absent.
        let national_id = req
            .national_id
            .as_deref()
            .and_then(|raw| NationalId::parse(raw).ok());

        // Linking (optional, best-effort)
        let external_customer_id = match (req.external_customer_id, national_id.as_ref()) {
            (Some(customer_id), _) => Some(customer_id),
            (None, Some(national_id)) => self.link_customer(national_id).await,
            (None, None) => None,
        };

        // Provisioning
        let account_id = match self.identity.create_account(&email, &name).await {
            Ok(account_id) => account_id,
            Err(IdentityError::DuplicateEmail) => {
                return Err(RegistrationError::DuplicateIdentity);
            }
            Err(err) => return Err(RegistrationError::Provisioning(err)),
        };

        // Allocating
        let new = NewMember {
            account_id: Some(account_id.clone()),
            external_customer_id,
            created_by: admin.account_id.clone(),
            plan_id,
            financial_responsible: FinancialResponsible {
                name,
                national_id,
                date_of_birth: req.date_of_birth,
                email,
                phone: req.phone,
                address: req.address,
            },
        };

        let record = self.store.create_member(new).await.map_err(|err| {
            // There is no compensation: the account now exists with no
            // member record and must be reconciled by an operator.
            tracing::error!(
                account_id = %account_id,
                error = %err,
                "member persistence failed after account provisioning; account is orphaned"
            );
            RegistrationError::Allocation(err)
        })?;

        tracing::info!(
            passport_id = %record.passport_id,
            created_by = %record.created_by,
            "member registered"
        );

        Ok(record.passport_id)
    }

    /// Resolve a billing customer for a raw national identifier, degrading
    /// every failure to `None`.
    ///
    /// Backs the standalone lookup endpoint; the registration path goes
    /// through the same collapse.
    pub async fn lookup_customer(&self, raw_national_id: &str) -> Option<CustomerId> {
        let national_id = NationalId::parse(raw_national_id).ok()?;
        self.link_customer(&national_id).await
    }

    /// Collapse the directory's `Result<Option<_>, _>` to an `Option<_>`,
    /// logging the error path as a side effect.
    async fn link_customer(&self, national_id: &NationalId) -> Option<CustomerId> {
        let directory = self.billing.as_ref()?;
        match directory.find_customer_by_national_id(national_id).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "billing customer lookup failed; continuing without linkage"
                );
                None
            }
        }
    }
}

/// Fail fast on a missing or blank required field.
fn require<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, RegistrationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RegistrationError::Validation(format!(
            "{field} is required"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use socio_core::{AccountId, MemberRole, MemberStatus};

    use super::*;
    use crate::models::MemberRecord;
    use crate::services::billing::BillingError;

    #[derive(Default)]
    struct FakeIdentity {
        calls: AtomicUsize,
        duplicate: bool,
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn verify_token(&self, _token: &str) -> Result<AdminClaims, IdentityError> {
            Ok(admin())
        }

        async fn create_account(
            &self,
            email: &Email,
            _display_name: &str,
        ) -> Result<AccountId, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.duplicate {
                return Err(IdentityError::DuplicateEmail);
            }
            Ok(AccountId::new(format!("acct_{}", email.as_str())))
        }
    }

    enum DirectoryBehavior {
        Match(&'static str),
        NoMatch,
        Fail,
    }

    struct FakeDirectory {
        calls: AtomicUsize,
        behavior: DirectoryBehavior,
    }

    impl FakeDirectory {
        fn new(behavior: DirectoryBehavior) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                behavior,
            }
        }
    }

    #[async_trait]
    impl CustomerDirectory for FakeDirectory {
        async fn find_customer_by_national_id(
            &self,
            _national_id: &NationalId,
        ) -> Result<Option<CustomerId>, BillingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                DirectoryBehavior::Match(id) => Ok(Some(CustomerId::new(id))),
                DirectoryBehavior::NoMatch => Ok(None),
                DirectoryBehavior::Fail => Err(BillingError::Api {
                    status: 503,
                    message: "unavailable".to_owned(),
                }),
            }
        }
    }

    /// In-memory stand-in for the transactional store: a mutex plays the
    /// role of the database row lock.
    #[derive(Default)]
    struct FakeStore {
        counter: Mutex<i64>,
        calls: AtomicUsize,
        last: Mutex<Option<NewMember>>,
    }

    impl FakeStore {
        fn with_counter(count: i64) -> Self {
            Self {
                counter: Mutex::new(count),
                ..Self::default()
            }
        }

        fn counter_value(&self) -> i64 {
            *self.counter.lock().unwrap()
        }
    }

    #[async_trait]
    impl MemberStore for FakeStore {
        async fn create_member(&self, new: NewMember) -> Result<MemberRecord, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut counter = self.counter.lock().unwrap();
            *counter += 1;
            let record = MemberRecord {
                passport_id: PassportId::from_sequence(*counter),
                account_id: new.account_id.clone(),
                external_customer_id: new.external_customer_id.clone(),
                created_by: new.created_by.clone(),
                role: MemberRole::Member,
                plan_id: new.plan_id.clone(),
                status: MemberStatus::Active,
                created_at: Utc::now(),
                financial_responsible: new.financial_responsible.clone(),
            };
            *self.last.lock().unwrap() = Some(new);
            Ok(record)
        }
    }

    fn admin() -> AdminClaims {
        AdminClaims {
            account_id: AccountId::new("acct_admin"),
            email: None,
        }
    }

    fn request() -> RegisterMemberRequest {
        RegisterMemberRequest {
            name: Some("Maria Silva".to_owned()),
            email: Some("maria@example.com".to_owned()),
            national_id: Some("123.456.789-09".to_owned()),
            date_of_birth: Some("1990-04-12".to_owned()),
            phone: Some("+351 912 345 678".to_owned()),
            address: Some("Rua das Flores 1, Lisboa".to_owned()),
            plan_id: Some("plan_family".to_owned()),
            external_customer_id: None,
        }
    }

    fn service(
        identity: Arc<FakeIdentity>,
        directory: Option<Arc<FakeDirectory>>,
        store: Arc<FakeStore>,
    ) -> RegistrationService {
        RegistrationService::new(
            identity,
            directory.map(|d| d as Arc<dyn CustomerDirectory>),
            store,
        )
    }

    #[tokio::test]
    async fn test_happy_path_allocates_first_passport() {
        let store = Arc::new(FakeStore::default());
        let svc = service(
            Arc::new(FakeIdentity::default()),
            Some(Arc::new(FakeDirectory::new(DirectoryBehavior::Match(
                "cus_000042",
            )))),
            store.clone(),
        );

        let passport = svc.register_member(&admin(), request()).await.unwrap();

        assert_eq!(passport.as_str(), "00001");
        assert_eq!(store.counter_value(), 1);
        let stored = store.last.lock().unwrap().clone().unwrap();
        assert_eq!(
            stored.external_customer_id,
            Some(CustomerId::new("cus_000042"))
        );
        assert_eq!(stored.created_by, AccountId::new("acct_admin"));
        assert!(stored.account_id.is_some());
    }

    #[tokio::test]
    async fn test_counter_at_41_yields_passport_42() {
        let store = Arc::new(FakeStore::with_counter(41));
        let svc = service(Arc::new(FakeIdentity::default()), None, store.clone());

        let passport = svc.register_member(&admin(), request()).await.unwrap();

        assert_eq!(passport.as_str(), "00042");
        assert_eq!(store.counter_value(), 42);
    }

    #[tokio::test]
    async fn test_missing_plan_id_fails_before_any_collaborator() {
        let identity = Arc::new(FakeIdentity::default());
        let directory = Arc::new(FakeDirectory::new(DirectoryBehavior::NoMatch));
        let store = Arc::new(FakeStore::default());
        let svc = service(identity.clone(), Some(directory.clone()), store.clone());

        let mut req = request();
        req.plan_id = None;
        let err = svc.register_member(&admin(), req).await.unwrap_err();

        assert!(matches!(err, RegistrationError::Validation(_)));
        assert_eq!(identity.calls.load(Ordering::SeqCst), 0);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let svc = service(
            Arc::new(FakeIdentity::default()),
            None,
            Arc::new(FakeStore::default()),
        );

        let mut req = request();
        req.name = Some("   ".to_owned());
        let err = svc.register_member(&admin(), req).await.unwrap_err();

        assert!(matches!(err, RegistrationError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_aborts_before_allocation() {
        let identity = Arc::new(FakeIdentity {
            duplicate: true,
            ..FakeIdentity::default()
        });
        let store = Arc::new(FakeStore::default());
        let svc = service(identity, None, store.clone());

        let err = svc.register_member(&admin(), request()).await.unwrap_err();

        assert!(matches!(err, RegistrationError::DuplicateIdentity));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.counter_value(), 0);
    }

    #[tokio::test]
    async fn test_no_billing_match_still_registers() {
        let store = Arc::new(FakeStore::default());
        let svc = service(
            Arc::new(FakeIdentity::default()),
            Some(Arc::new(FakeDirectory::new(DirectoryBehavior::NoMatch))),
            store.clone(),
        );

        svc.register_member(&admin(), request()).await.unwrap();

        let stored = store.last.lock().unwrap().clone().unwrap();
        assert_eq!(stored.external_customer_id, None);
    }

    #[tokio::test]
    async fn test_billing_failure_is_swallowed() {
        let store = Arc::new(FakeStore::default());
        let svc = service(
            Arc::new(FakeIdentity::default()),
            Some(Arc::new(FakeDirectory::new(DirectoryBehavior::Fail))),
            store.clone(),
        );

        let passport = svc.register_member(&admin(), request()).await.unwrap();

        assert_eq!(passport.as_str(), "00001");
        let stored = store.last.lock().unwrap().clone().unwrap();
        assert_eq!(stored.external_customer_id, None);
    }

    #[tokio::test]
    async fn test_caller_resolved_customer_skips_lookup() {
        let directory = Arc::new(FakeDirectory::new(DirectoryBehavior::Match("cus_other")));
        let store = Arc::new(FakeStore::default());
        let svc = service(
            Arc::new(FakeIdentity::default()),
            Some(directory.clone()),
            store.clone(),
        );

        let mut req = request();
        req.external_customer_id = Some(CustomerId::new("cus_presupplied"));
        svc.register_member(&admin(), req).await.unwrap();

        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
        let stored = store.last.lock().unwrap().clone().unwrap();
        assert_eq!(
            stored.external_customer_id,
            Some(CustomerId::new("cus_presupplied"))
        );
    }

    #[tokio::test]
    async fn test_digitless_national_id_skips_lookup() {
        let directory = Arc::new(FakeDirectory::new(DirectoryBehavior::Match("cus_1")));
        let store = Arc::new(FakeStore::default());
        let svc = service(
            Arc::new(FakeIdentity::default()),
            Some(directory.clone()),
            store.clone(),
        );

        let mut req = request();
        req.national_id = Some("--..".to_owned());
        svc.register_member(&admin(), req).await.unwrap();

        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
        let stored = store.last.lock().unwrap().clone().unwrap();
        assert_eq!(stored.external_customer_id, None);
        assert_eq!(stored.financial_responsible.national_id, None);
    }

    #[tokio::test]
    async fn test_missing_billing_config_registers_without_linkage() {
        let store = Arc::new(FakeStore::default());
        let svc = service(Arc::new(FakeIdentity::default()), None, store.clone());

        svc.register_member(&admin(), request()).await.unwrap();

        let stored = store.last.lock().unwrap().clone().unwrap();
        assert_eq!(stored.external_customer_id, None);
    }

    #[tokio::test]
    async fn test_lookup_customer_collapses_errors() {
        let svc = service(
            Arc::new(FakeIdentity::default()),
            Some(Arc::new(FakeDirectory::new(DirectoryBehavior::Fail))),
            Arc::new(FakeStore::default()),
        );

        assert_eq!(svc.lookup_customer("123.456.789-09").await, None);
    }

    #[tokio::test]
    async fn test_lookup_customer_finds_match() {
        let svc = service(
            Arc::new(FakeIdentity::default()),
            Some(Arc::new(FakeDirectory::new(DirectoryBehavior::Match(
                "cus_000042",
            )))),
            Arc::new(FakeStore::default()),
        );

        assert_eq!(
            svc.lookup_customer("123.456.789-09").await,
            Some(CustomerId::new("cus_000042"))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_allocate_collision_free() {
        const N: usize = 25;

        let store = Arc::new(FakeStore::default());
        let svc = Arc::new(service(
            Arc::new(FakeIdentity::default()),
            None,
            store.clone(),
        ));

        let mut handles = Vec::with_capacity(N);
        for i in 0..N {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                let mut req = request();
                req.email = Some(format!("socio{i}@example.com"));
                svc.register_member(&admin(), req).await
            }));
        }

        let mut issued = BTreeSet::new();
        for handle in handles {
            let passport = handle.await.unwrap().unwrap();
            issued.insert(passport.into_inner());
        }

        let expected: BTreeSet<String> = (1..=N).map(|n| format!("{n:05}")).collect();
        assert_eq!(issued, expected, "no duplicates, no gaps");
        assert_eq!(store.counter_value(), N as i64);
    }
}
