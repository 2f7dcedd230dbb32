//! Session identifier type.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Unique identifier for a viewer session.
///
/// Session IDs are random 128-bit values (UUID v4), so they can be embedded
/// in URLs without leaking anything about the artifact or the order in which
/// sessions were created. The ID is displayed in hyphenated lowercase form,
/// e.g. `67e55044-10b1-426f-9247-bb680e5fe0c8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a SessionId from a raw 128-bit value.
    ///
    /// This is primarily for testing.
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = crate::error::ProfviewError;

    /// Only the hyphenated lowercase form produced by `Display` is accepted,
    /// so each session has exactly one URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .ok()
            .map(SessionId)
            .filter(|id| id.to_string() == s)
            .ok_or_else(|| crate::error::ProfviewError::SessionNotFound(s.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..10_000 {
            let id = SessionId::new();
            assert!(ids.insert(id), "Duplicate ID generated: {}", id);
        }
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_display_format() {
        let id = SessionId::from_u128(0xff);
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-0000000000ff");
    }

    #[test]
    fn test_display_is_url_safe() {
        let id = SessionId::new().to_string();
        assert_eq!(id.len(), 36);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() || c == '-'));
    }

    #[test]
    fn test_parse_valid() {
        let id: SessionId = "00000000-0000-0000-0000-0000000000ff".parse().unwrap();
        assert_eq!(id, SessionId::from_u128(0xff));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("does-not-exist".parse::<SessionId>().is_err());
        assert!("sess-000000ff".parse::<SessionId>().is_err());
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        let id = SessionId::from_u128(0xabc);
        let uuid = Uuid::from_u128(0xabc);

        for form in [
            uuid.simple().to_string(),
            uuid.braced().to_string(),
            uuid.urn().to_string(),
            id.to_string().to_uppercase(),
        ] {
            assert!(form.parse::<SessionId>().is_err(), "{form}");
        }
    }

    #[test]
    fn test_roundtrip() {
        let original = SessionId::new();
        let parsed: SessionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }
}
