//! National identifier type.
//!
//! The financial responsible's national identifier (CPF/CNPJ) arrives from
//! the admin frontend in whatever format the admin typed: `"123.456.789-09"`,
//! `"123 456 789 09"`, or bare digits. Lookups against the billing
//! collaborator are always by digits, so the type normalizes on parse.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`NationalId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NationalIdError {
    /// The input contains no digits at all.
    #[error("national identifier contains no digits")]
    NoDigits,
}

/// A normalized national identifier (digits only).
///
/// Parsing strips every non-digit character; an input that is empty after
/// stripping is rejected. Callers that tolerate a missing identifier should
/// treat the [`NationalIdError::NoDigits`] case as "no identifier".
///
/// ## Examples
///
/// ```
/// use socio_core::NationalId;
///
/// let id = NationalId::parse("123.456.789-09").unwrap();
/// assert_eq!(id.as_str(), "12345678909");
///
/// assert!(NationalId::parse("--..").is_err());
/// assert!(NationalId::parse("").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct NationalId(String);

impl NationalId {
    /// Parse a `NationalId` from a string, stripping all non-digit
    /// characters.
    ///
    /// # Errors
    ///
    /// Returns [`NationalIdError::NoDigits`] if nothing remains after
    /// stripping.
    pub fn parse(s: &str) -> Result<Self, NationalIdError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(NationalIdError::NoDigits);
        }
        Ok(Self(digits))
    }

    /// Returns the normalized digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `NationalId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NationalId {
    type Err = NationalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for NationalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for NationalId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for NationalId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for NationalId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
