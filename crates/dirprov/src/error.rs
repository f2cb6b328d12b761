//! Errors surfaced by the binary, rendered as miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code per failure class.

use miette::Diagnostic;
use thiserror::Error;

use dirprov_config::ConfigError;
use dirprov_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const BACKEND: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Lookups ──────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(dirprov::not_found),
        help("Run: dirprov {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Conflicts ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(dirprov::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    #[error("Alias '{address}' points to missing entry {target}")]
    #[diagnostic(
        code(dirprov::dangling_alias),
        help("Remove it with: dirprov alias remove {address}")
    )]
    DanglingAlias { address: String, target: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed for '{account}'")]
    #[diagnostic(code(dirprov::auth_failed), help("{reason}"))]
    AuthFailed { account: String, reason: String },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Operation '{operation}' is not supported")]
    #[diagnostic(code(dirprov::unsupported), help("{reason}"))]
    Unsupported { operation: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dirprov::validation))]
    Validation { field: String, reason: String },

    #[error("Directory error: {message}")]
    #[diagnostic(
        code(dirprov::backend),
        help("The directory reported a failure. Transient failures can simply be retried.")
    )]
    Backend { message: String, transient: bool },

    #[error("Internal error: {0}")]
    #[diagnostic(code(dirprov::internal))]
    Internal(String),

    // ── State and configuration ──────────────────────────────────────
    #[error("Could not use state file {path}: {reason}")]
    #[diagnostic(
        code(dirprov::state),
        help("Pass --state <file> or set DIRPROV_STATE to choose another file.")
    )]
    State { path: String, reason: String },

    #[error(transparent)]
    #[diagnostic(
        code(dirprov::config),
        help("Check the file shown by: dirprov config path")
    )]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dirprov::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Output serialization failed: {0}")]
    #[diagnostic(code(dirprov::render))]
    Render(String),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::DanglingAlias { .. } => exit_code::CONFLICT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Backend { .. } => exit_code::BACKEND,
            _ => exit_code::GENERAL,
        }
    }

    pub fn render(err: impl std::fmt::Display) -> Self {
        Self::Render(err.to_string())
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

/// The list subcommand that shows entities of a core entity type.
fn list_command_for(entity_type: &str) -> String {
    match entity_type {
        "account" => "account list".into(),
        "group" | "static_group" | "dynamic_group" | "member" => "group list".into(),
        "domain" => "domain list".into(),
        "cos" => "cos list".into(),
        "server" | "uc_service" => "server list".into(),
        "alias" => "search --kind alias".into(),
        _ => "search".into(),
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command_for(&entity_type),
                resource_type: entity_type,
                identifier,
            },

            CoreError::Collision {
                entity_type,
                identifier,
            } => CliError::Conflict {
                resource_type: entity_type,
                identifier,
            },

            CoreError::DanglingReference { address, target_id } => CliError::DanglingAlias {
                address,
                target: target_id,
            },

            CoreError::Unsupported { operation, reason } => {
                CliError::Unsupported { operation, reason }
            }

            CoreError::AuthenticationFailed { account, reason } => {
                CliError::AuthFailed { account, reason }
            }

            CoreError::Backend(inner) => CliError::Backend {
                transient: inner.is_transient(),
                message: inner.to_string(),
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_exit_class() {
        let missing: CliError = CoreError::not_found("account", "a@b.com").into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(missing, CliError::NotFound { ref list_command, .. } if list_command == "account list"));

        let taken: CliError = CoreError::collision("address", "a@b.com").into();
        assert_eq!(taken.exit_code(), exit_code::CONFLICT);

        let bad: CliError = CoreError::validation("no '@'").into();
        assert_eq!(bad.exit_code(), exit_code::USAGE);

        let down: CliError = CoreError::Backend(dirprov_api::Error::Unavailable {
            reason: "replica down".into(),
        })
        .into();
        assert!(matches!(down, CliError::Backend { transient: true, .. }));
        assert_eq!(down.exit_code(), exit_code::BACKEND);
    }
}
