//! Integration tests for the Socio backend.
//!
//! # Running Tests
//!
//! These tests need a real `PostgreSQL` instance because the allocator's
//! correctness lives in the database's transactional isolation, not in
//! process memory. Point `SOCIO_TEST_DATABASE_URL` at a disposable database:
//!
//! ```bash
//! SOCIO_TEST_DATABASE_URL=postgres://localhost/socio_test cargo test -p socio-integration-tests
//! ```
//!
//! When the variable is unset, every test skips and passes, so a plain
//! `cargo test` stays green on machines without Postgres.

#![cfg_attr(not(test), forbid(unsafe_code))]

use secrecy::SecretString;
use sqlx::PgPool;

use socio_api::db::{self, MemberRepository};

/// Connection to the disposable test database, with migrations applied and
/// all registration state reset.
pub struct TestContext {
    pub pool: PgPool,
    pub repo: MemberRepository,
}

impl TestContext {
    /// Connect to the database named by `SOCIO_TEST_DATABASE_URL`.
    ///
    /// Returns `None` when the variable is unset, letting callers skip.
    ///
    /// # Panics
    ///
    /// Panics if the variable is set but the database is unreachable or the
    /// migrations fail - a misconfigured test environment should be loud.
    pub async fn connect() -> Option<Self> {
        let url = std::env::var("SOCIO_TEST_DATABASE_URL").ok()?;

        let pool = db::create_pool(&SecretString::from(url))
            .await
            .expect("failed to connect to SOCIO_TEST_DATABASE_URL");
        db::run_migrations(&pool)
            .await
            .expect("failed to apply migrations to the test database");

        // Reset registration state so runs are repeatable.
        sqlx::query("TRUNCATE member")
            .execute(&pool)
            .await
            .expect("failed to truncate member table");
        sqlx::query("UPDATE passport_counter SET count = 0 WHERE id")
            .execute(&pool)
            .await
            .expect("failed to reset passport counter");

        let repo = MemberRepository::new(pool.clone());
        Some(Self { pool, repo })
    }

    /// Force the counter to a specific value, for resume-from-N scenarios.
    ///
    /// # Panics
    ///
    /// Panics if the update fails.
    pub async fn set_counter(&self, count: i64) {
        sqlx::query("UPDATE passport_counter SET count = $1 WHERE id")
            .bind(count)
            .execute(&self.pool)
            .await
            .expect("failed to set passport counter");
    }
}
