//! Directory client layer for dirprov.
//!
//! This crate owns everything the provisioning engine needs to talk to a
//! hierarchical directory store, without knowing anything about accounts,
//! groups or domains:
//!
//! - **[`Dn`]**: entry locations with escaping, ancestry tests and
//!   suffix replacement (used for subtree moves).
//! - **[`Attributes`]** / **[`Modification`]**: case-insensitive
//!   multi-valued attribute maps and modify requests.
//! - **[`Filter`]**: equality/presence/boolean search filters that render
//!   to the standard string syntax and evaluate in memory.
//! - **[`DirectoryClient`]**: the blocking store contract: create, modify,
//!   delete, rename, get, and paged visitor-based search with a routing hint.
//! - **[`MemoryDirectory`]**: a complete in-memory store with snapshots,
//!   per-operation counters and one-shot failure injection.

pub mod attrs;
pub mod client;
pub mod dn;
pub mod error;
pub mod filter;
pub mod memory;

// ── Primary re-exports ──────────────────────────────────────────────
pub use attrs::{Attributes, Modification};
pub use client::{DirectoryClient, Routing, Scope, SearchHit, SearchRequest, Visit};
pub use dn::{Dn, Rdn};
pub use error::Error;
pub use filter::Filter;
pub use memory::{MemoryDirectory, OpStats, Operation, Snapshot};
