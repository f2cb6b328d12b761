//! Provisioning engine for a groupware identity directory.
//!
//! The engine maps accounts, aliases, groups, domains and configuration
//! objects onto a hierarchical directory reached through
//! [`dirprov_api::DirectoryClient`], and keeps the caches and
//! cross-references between them coherent:
//!
//! - **[`Provisioning`]**: The explicitly constructed engine. Every entity
//!   operation (create, lookup, modify, rename, delete, search) is a method
//!   on it. Clones share one directory handle and one set of caches.
//!
//! - **[`DitLayout`]**: Pure mapping between object names and directory
//!   locations, plus minimal search roots for a set of kinds.
//!
//! - **[`Caches`]**: Per-kind entry caches keyed by id, name and the
//!   other names an object answers to, a domain cache that also remembers
//!   absent names, and the authorization verdict cache.
//!
//! - **Membership**: [`Provisioning::group_membership`] resolves direct
//!   and nested containment across static groups and dynamic groups, with
//!   results cached on the subject entry.
//!
//! - **Aliases and renames**: [`Provisioning::add_alias`],
//!   [`Provisioning::rename_account`] and friends run a fixed critical
//!   path and report best-effort follow-up work in a [`CascadeReport`].
//!
//! - **Domain model** ([`model`]): [`Entry`] with its [`EntryKind`] tag,
//!   typed views ([`Account`], [`Group`], [`Domain`], ...) and the
//!   capability traits algorithms are written against.

pub mod alias;
pub mod cache;
pub mod cascade;
pub mod config;
pub mod dyngroup;
pub mod engine;
pub mod error;
pub mod factory;
pub mod hooks;
pub mod membership;
pub mod model;
pub mod naming;
pub mod rename;
pub mod schema;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alias::AliasState;
pub use cache::{CacheStats, CacheType, Caches};
pub use cascade::{CascadeAction, CascadeReport, CascadeStep, StepOutcome};
pub use config::{CacheMode, CacheSettings, DitConfig, EngineConfig, LockoutPolicy};
pub use engine::{PasswordVerifier, Provisioning, StoredPasswordVerifier};
pub use error::CoreError;
pub use factory::ProvisioningFactory;
pub use hooks::{DefaultSchemaHooks, SchemaHooks};
pub use naming::{DitLayout, Unit};
pub use rename::{RenamePhase, RenameReport};

pub use model::{
    Account, AccountStatus, Address, Aliasable, Cos, Domain, DomainStatus, DomainType, Entry,
    EntryId, EntryKind, EntryView, Group, GroupMember, GroupMembership, MemberOf, Nameable, Server,
};
