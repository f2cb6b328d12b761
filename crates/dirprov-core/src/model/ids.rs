// ── Core identity types ──
//
// EntryId and Address form the foundation of every directory object.
// EntryId is the immutable identity stored in the `entryId` attribute;
// Address is the normalized `local@domain` form every account, alias and
// group is known by.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

// ── EntryId ─────────────────────────────────────────────────────────

/// Immutable, globally unique identifier of a directory entry.
///
/// Generated as a v4 UUID. Ids written by other tools that are not UUIDs
/// are kept verbatim so they still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Uuid(Uuid),
    Opaque(String),
}

impl EntryId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self::Uuid(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Uuid(u) => Some(u),
            Self::Opaque(_) => None,
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Opaque(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntryId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<Uuid> for EntryId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        match Uuid::parse_str(s.trim()) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Opaque(s.trim().to_owned()),
        }
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

// ── Address ─────────────────────────────────────────────────────────

/// An email-style address, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    full: String,
    at: usize,
}

impl Address {
    /// Validate and normalize `local@domain`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let full = raw.trim().to_lowercase();
        let mut parts = full.splitn(3, '@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CoreError::validation(format!(
                "invalid address '{raw}': expected local@domain"
            )));
        };
        validate_local_part(local)
            .map_err(|reason| CoreError::validation(format!("invalid address '{raw}': {reason}")))?;
        validate_domain_name(domain)?;

        let at = local.len();
        Ok(Self { full, at })
    }

    pub fn from_parts(local: &str, domain: &str) -> Result<Self, CoreError> {
        Self::parse(&format!("{local}@{domain}"))
    }

    pub fn local(&self) -> &str {
        &self.full[..self.at]
    }

    pub fn domain(&self) -> &str {
        &self.full[self.at + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Same local part, different domain.
    pub fn with_domain(&self, domain: &str) -> Result<Self, CoreError> {
        Self::from_parts(self.local(), domain)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.full
    }
}

fn validate_local_part(local: &str) -> Result<(), &'static str> {
    if local.is_empty() {
        return Err("empty local part");
    }
    if local.len() > 64 {
        return Err("local part longer than 64 characters");
    }
    if local
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "(),:;<>[]\\\"".contains(c))
    {
        return Err("local part contains a forbidden character");
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err("misplaced '.' in local part");
    }
    Ok(())
}

/// Validate a (lowercase) domain name: dot-separated labels of letters,
/// digits and inner hyphens.
pub fn validate_domain_name(name: &str) -> Result<(), CoreError> {
    let fail = |reason: &str| CoreError::validation(format!("invalid domain name '{name}': {reason}"));

    if name.is_empty() {
        return Err(fail("empty"));
    }
    if name.len() > 253 {
        return Err(fail("longer than 253 characters"));
    }
    for label in name.split('.') {
        if label.is_empty() {
            return Err(fail("empty label"));
        }
        if label.len() > 63 {
            return Err(fail("label longer than 63 characters"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(fail("labels may only contain letters, digits and '-'"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(fail("labels cannot start or end with '-'"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_from_uuid_string() {
        let id = EntryId::from("550e8400-e29b-41d4-a716-446655440000");
        assert!(id.as_uuid().is_some());
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn entry_id_keeps_opaque_values() {
        let id: EntryId = "legacy-17".parse().unwrap();
        assert_eq!(id, EntryId::Opaque("legacy-17".into()));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(EntryId::generate(), EntryId::generate());
    }

    #[test]
    fn address_normalizes_case() {
        let addr = Address::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(addr.as_str(), "alice@example.com");
        assert_eq!(addr.local(), "alice");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn address_rejects_bad_syntax() {
        for bad in ["alice", "@a.com", "a@", "a@b@c.com", "a b@c.com", "a@-x.com", "a@x..com", ".a@x.com"] {
            assert!(Address::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn address_domain_swap() {
        let addr = Address::parse("al@a.com").unwrap();
        assert_eq!(addr.with_domain("b.com").unwrap().as_str(), "al@b.com");
    }
}
