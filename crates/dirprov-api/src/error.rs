use thiserror::Error;

/// Top-level error type for the `dirprov-api` crate.
///
/// Covers every failure mode a directory store can report: missing or
/// conflicting entries, malformed names and filters, and backend
/// availability. `dirprov-core` maps these into domain-level errors
/// so consumers never match on store-specific details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ── Entry errors ────────────────────────────────────────────────
    /// The addressed entry (or the parent required to create it) does not exist.
    #[error("No such entry: {dn}")]
    NoSuchEntry { dn: String },

    /// An entry already occupies the target location.
    #[error("Entry already exists: {dn}")]
    AlreadyExists { dn: String },

    /// Delete was attempted on an entry that still has children.
    #[error("Entry has children and cannot be deleted: {dn}")]
    NotLeaf { dn: String },

    // ── Syntax errors ───────────────────────────────────────────────
    /// A distinguished name could not be parsed.
    #[error("Invalid DN '{input}': {reason}")]
    InvalidDn { input: String, reason: String },

    /// A search filter could not be parsed.
    #[error("Invalid filter '{input}': {reason}")]
    InvalidFilter { input: String, reason: String },

    // ── Backend errors ──────────────────────────────────────────────
    /// The store could not be reached (connection refused, replica down, ...).
    #[error("Directory unavailable: {reason}")]
    Unavailable { reason: String },

    /// The store refused the operation (constraint or schema violation).
    #[error("Operation rejected for {dn}: {reason}")]
    Rejected { dn: String, reason: String },
}

impl Error {
    /// Returns `true` if this error indicates the addressed entry was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchEntry { .. })
    }

    /// Returns `true` if the target location was already taken.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` if this error is likely transient and the caller may
    /// retry at a higher level. Nothing in this workspace retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        let missing = Error::NoSuchEntry { dn: "uid=a".into() };
        assert!(missing.is_not_found());
        assert!(!missing.is_already_exists());

        let taken = Error::AlreadyExists { dn: "uid=a".into() };
        assert!(taken.is_already_exists());

        let down = Error::Unavailable {
            reason: "replica down".into(),
        };
        assert!(down.is_transient());
        assert!(!taken.is_transient());
    }
}
