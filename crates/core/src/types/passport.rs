//! Passport number type.
//!
//! The passport number is the member's sequential membership number and the
//! member record's primary key. It is always rendered as a fixed-width,
//! zero-padded decimal string.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PassportId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PassportIdError {
    /// The input string is empty.
    #[error("passport number cannot be empty")]
    Empty,
    /// The input contains a non-digit character.
    #[error("passport number must contain only digits")]
    NonDigit,
    /// The input is shorter than the fixed width.
    #[error("passport number must be at least {width} digits", width = PassportId::WIDTH)]
    TooShort,
}

/// A sequential membership (passport) number.
///
/// Numbers are issued in strictly increasing order, one per member, and
/// rendered zero-padded to a fixed width: sequence `42` becomes `"00042"`.
/// Sequences beyond the fixed width keep all their digits (`123456` stays
/// `"123456"`).
///
/// ## Examples
///
/// ```
/// use socio_core::PassportId;
///
/// let id = PassportId::from_sequence(42);
/// assert_eq!(id.as_str(), "00042");
///
/// assert!(PassportId::parse("00042").is_ok());
/// assert!(PassportId::parse("42").is_err());     // too short
/// assert!(PassportId::parse("0004x").is_err());  // non-digit
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PassportId(String);

impl PassportId {
    /// Fixed rendering width of a passport number.
    pub const WIDTH: usize = 5;

    /// Build a `PassportId` from a counter sequence value.
    ///
    /// The caller guarantees `sequence` is positive; the allocator only ever
    /// produces `count + 1` for a non-negative counter.
    #[must_use]
    pub fn from_sequence(sequence: i64) -> Self {
        Self(format!("{sequence:0width$}", width = Self::WIDTH))
    }

    /// Parse a `PassportId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains a non-digit
    /// character, or is shorter than [`Self::WIDTH`] digits.
    pub fn parse(s: &str) -> Result<Self, PassportIdError> {
        if s.is_empty() {
            return Err(PassportIdError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PassportIdError::NonDigit);
        }
        if s.len() < Self::WIDTH {
            return Err(PassportIdError::TooShort);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the passport number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PassportId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the numeric sequence this passport number was issued from.
    #[must_use]
    pub fn sequence(&self) -> i64 {
        // Invariant: the inner string is all ASCII digits.
        self.0.parse().unwrap_or(0)
    }
}

impl fmt::Display for PassportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PassportId {
    type Err = PassportIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PassportId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PassportId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PassportId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PassportId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
