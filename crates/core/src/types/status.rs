//! Status and role enums for member records.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a member record.
///
/// Registration only ever produces `Active`; the variant list exists so the
/// wire and storage formats stay stable if downstream billing sync (out of
/// scope here) later introduces other states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    #[default]
    Active,
}

impl MemberStatus {
    /// Storage/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// Role assigned to a registered member.
///
/// Fixed at `Member` for every record this service creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    #[default]
    Member,
}

impl MemberRole {
    /// Storage/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// Error returned when a stored status/role string is not a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&MemberStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");
    }

    #[test]
    fn test_status_roundtrip() {
        let status: MemberStatus = "active".parse().unwrap();
        assert_eq!(status, MemberStatus::Active);
        assert_eq!(status.as_str(), "active");
    }

    #[test]
    fn test_role_roundtrip() {
        let role: MemberRole = "member".parse().unwrap();
        assert_eq!(role, MemberRole::Member);
        assert_eq!(role.as_str(), "member");
    }

    #[test]
    fn test_unknown_variant() {
        assert!("suspended".parse::<MemberStatus>().is_err());
        assert!("admin".parse::<MemberRole>().is_err());
    }
}
