//! Member repository and the sequential passport-number allocator.
//!
//! Allocation is a single transaction: lock the counter row, compute the
//! next sequence, insert the member keyed by the formatted number, write the
//! counter back. The row lock is the only serialization point - handlers may
//! run in independent worker processes, so an in-process lock would not be
//! correct here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use socio_core::{AccountId, CustomerId, Email, MemberRole, MemberStatus, NationalId, PassportId};

use super::RepositoryError;
use crate::models::{FinancialResponsible, MemberRecord, NewMember};

/// Upper bound on allocation attempts when the transaction keeps losing
/// serialization conflicts.
const MAX_ALLOCATION_ATTEMPTS: u32 = 5;

/// Storage seam for the registration workflow.
///
/// The production implementation is [`MemberRepository`]; tests substitute an
/// in-memory fake to exercise the workflow without a database.
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Atomically allocate the next passport number and persist the member.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Busy` when the allocation transaction could
    /// not commit after retries; any other variant aborts the registration.
    async fn create_member(&self, new: NewMember) -> Result<MemberRecord, RepositoryError>;
}

/// Repository for member database operations.
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    /// Create a new member repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a member by passport number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored field is invalid.
    pub async fn get_by_passport(
        &self,
        passport_id: &PassportId,
    ) -> Result<Option<MemberRecord>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT passport_id, account_id, external_customer_id, created_by,
                   role, plan_id, status, created_at,
                   fr_name, fr_national_id, fr_date_of_birth, fr_email,
                   fr_phone, fr_address
            FROM member
            WHERE passport_id = $1
            ",
        )
        .bind(passport_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| member_from_row(&r)).transpose()
    }

    /// Read the last issued sequence number.
    ///
    /// Reads outside the allocation transaction are only meaningful for
    /// monitoring and tests; a missing row reads as zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counter_value(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count FROM passport_counter WHERE id")
            .fetch_optional(&self.pool)
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// One allocation attempt: the whole read-format-insert-update sequence
    /// inside a single transaction.
    async fn try_create(&self, new: &NewMember) -> Result<MemberRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent allocators.
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count FROM passport_counter WHERE id FOR UPDATE",
        )
        .fetch_one(&mut *tx)
        .await?;

        let next = count + 1;
        let passport_id = PassportId::from_sequence(next);

        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r"
            INSERT INTO member (
                passport_id, account_id, external_customer_id, created_by,
                role, plan_id, status,
                fr_name, fr_national_id, fr_date_of_birth, fr_email,
                fr_phone, fr_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING created_at
            ",
        )
        .bind(passport_id.as_str())
        .bind(new.account_id.as_ref())
        .bind(new.external_customer_id.as_ref())
        .bind(&new.created_by)
        .bind(MemberRole::Member.as_str())
        .bind(&new.plan_id)
        .bind(MemberStatus::Active.as_str())
        .bind(&new.financial_responsible.name)
        .bind(new.financial_responsible.national_id.as_ref())
        .bind(new.financial_responsible.date_of_birth.as_ref())
        .bind(&new.financial_responsible.email)
        .bind(new.financial_responsible.phone.as_ref())
        .bind(new.financial_responsible.address.as_ref())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE passport_counter SET count = $1 WHERE id")
            .bind(next)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(MemberRecord {
            passport_id,
            account_id: new.account_id.clone(),
            external_customer_id: new.external_customer_id.clone(),
            created_by: new.created_by.clone(),
            role: MemberRole::Member,
            plan_id: new.plan_id.clone(),
            status: MemberStatus::Active,
            created_at,
            financial_responsible: new.financial_responsible.clone(),
        })
    }
}

#[async_trait]
impl MemberStore for MemberRepository {
    async fn create_member(&self, new: NewMember) -> Result<MemberRecord, RepositoryError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create(&new).await {
                Ok(record) => return Ok(record),
                Err(err) if is_serialization_conflict(&err) => {
                    if attempt >= MAX_ALLOCATION_ATTEMPTS {
                        tracing::error!(attempt, "passport allocation kept conflicting, giving up");
                        return Err(RepositoryError::Busy);
                    }
                    tracing::warn!(attempt, "passport allocation conflict, retrying");
                }
                Err(err) => {
                    if let sqlx::Error::Database(ref db_err) = err
                        && db_err.is_unique_violation()
                    {
                        return Err(RepositoryError::Conflict(
                            "passport number already issued".to_owned(),
                        ));
                    }
                    return Err(RepositoryError::Database(err));
                }
            }
        }
    }
}

/// Serialization failures and deadlocks are retryable; everything else is not.
fn is_serialization_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("40001" | "40P01"))
        }
        _ => false,
    }
}

fn member_from_row(row: &PgRow) -> Result<MemberRecord, RepositoryError> {
    let passport_id = PassportId::parse(row.try_get::<&str, _>("passport_id")?)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid passport number: {e}")))?;
    let email = Email::parse(row.try_get::<&str, _>("fr_email")?)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;
    let role = row
        .try_get::<&str, _>("role")?
        .parse::<MemberRole>()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid role: {e}")))?;
    let status = row
        .try_get::<&str, _>("status")?
        .parse::<MemberStatus>()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid status: {e}")))?;
    let national_id = row
        .try_get::<Option<&str>, _>("fr_national_id")?
        .map(NationalId::parse)
        .transpose()
        .map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid national identifier: {e}"))
        })?;

    Ok(MemberRecord {
        passport_id,
        account_id: row
            .try_get::<Option<String>, _>("account_id")?
            .map(AccountId::new),
        external_customer_id: row
            .try_get::<Option<String>, _>("external_customer_id")?
            .map(CustomerId::new),
        created_by: AccountId::new(row.try_get::<String, _>("created_by")?),
        role,
        plan_id: row.try_get("plan_id")?,
        status,
        created_at: row.try_get("created_at")?,
        financial_responsible: FinancialResponsible {
            name: row.try_get("fr_name")?,
            national_id,
            date_of_birth: row.try_get("fr_date_of_birth")?,
            email,
            phone: row.try_get("fr_phone")?,
            address: row.try_get("fr_address")?,
        },
    })
}
