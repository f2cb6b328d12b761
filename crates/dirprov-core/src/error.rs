// ── Core error types ──
//
// User-facing errors from dirprov-core. Store-level failures arrive as
// `dirprov_api::Error` and are translated here: a missing entry becomes
// `NotFound`, an occupied location becomes `Collision`, everything else
// is a backend failure propagated as-is.
//
// Failures of best-effort cascade steps are never returned through this
// type; they are recorded in a `CascadeReport` instead.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Validation errors ────────────────────────────────────────────
    /// Bad address or domain syntax, or a precondition the caller broke.
    /// Nothing was mutated.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Conflict errors ──────────────────────────────────────────────
    #[error("{entity_type} already exists: {identifier}")]
    Collision {
        entity_type: String,
        identifier: String,
    },

    /// An alias whose recorded target no longer exists.
    #[error("Alias {address} points to missing entry {target_id}")]
    DanglingReference { address: String, target_id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    #[error("Authentication failed for {account}: {reason}")]
    AuthenticationFailed { account: String, reason: String },

    // ── Backend errors (propagated, never retried) ───────────────────
    #[error("Directory error: {0}")]
    Backend(dirprov_api::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: &str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    pub fn collision(entity_type: &str, identifier: impl Into<String>) -> Self {
        Self::Collision {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    pub fn unsupported(operation: &str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_collision(&self) -> bool {
        matches!(self, Self::Collision { .. })
    }

    /// Whether the underlying store reported a transient failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_transient())
    }
}

// ── Conversion from store-layer errors ───────────────────────────────

impl From<dirprov_api::Error> for CoreError {
    fn from(err: dirprov_api::Error) -> Self {
        match err {
            dirprov_api::Error::NoSuchEntry { dn } => CoreError::NotFound {
                entity_type: "entry".into(),
                identifier: dn,
            },
            dirprov_api::Error::AlreadyExists { dn } => CoreError::Collision {
                entity_type: "entry".into(),
                identifier: dn,
            },
            dirprov_api::Error::InvalidDn { input, reason }
            | dirprov_api::Error::InvalidFilter { input, reason } => CoreError::Validation {
                message: format!("{input}: {reason}"),
            },
            other => CoreError::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_domain_kinds() {
        let missing: CoreError = dirprov_api::Error::NoSuchEntry { dn: "uid=a".into() }.into();
        assert!(missing.is_not_found());

        let taken: CoreError = dirprov_api::Error::AlreadyExists { dn: "uid=a".into() }.into();
        assert!(taken.is_collision());

        let down: CoreError = dirprov_api::Error::Unavailable {
            reason: "no route".into(),
        }
        .into();
        assert!(down.is_transient());
        assert!(matches!(down, CoreError::Backend(_)));
    }
}
