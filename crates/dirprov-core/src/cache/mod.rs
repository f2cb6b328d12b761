// ── Entity cache layer ──
//
// One independent cache per entity type, all built from the same engine
// configuration. With `CacheMode::None` every cache is a pass-through.

pub mod authorization;
pub mod domain;
pub mod entry_cache;

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

pub use authorization::AuthorizationCache;
pub use domain::{DomainCache, DomainLookup};
pub use entry_cache::{EntryCache, KeyKind};

use crate::config::EngineConfig;
use crate::model::{CacheDataKind, EntryKind};

/// Size and hit-rate counters of one cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub size: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(name: &str, size: u64, hits: u64, misses: u64) -> Self {
        let mut stats = Self {
            name: name.into(),
            size,
            hits,
            misses,
            hit_rate: 0.0,
        };
        stats.recompute_hit_rate();
        stats
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub(crate) fn recompute_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        };
    }
}

/// Caches that can be flushed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CacheType {
    Account,
    Group,
    Domain,
    Cos,
    Server,
    Authorization,
    All,
}

/// Every cache the engine owns.
pub struct Caches {
    pub accounts: EntryCache,
    pub groups: EntryCache,
    pub domains: DomainCache,
    pub cos: EntryCache,
    pub servers: EntryCache,
    pub authorization: AuthorizationCache,
}

impl Caches {
    pub fn new(config: &EngineConfig) -> Self {
        let mode = config.cache_mode;
        Self {
            accounts: EntryCache::new("accounts", config.accounts, mode),
            groups: EntryCache::new("groups", config.groups, mode),
            domains: DomainCache::new(config.domains, config.domain_negative_ttl, mode),
            cos: EntryCache::new("cos", config.cos, mode),
            servers: EntryCache::new("servers", config.servers, mode),
            authorization: AuthorizationCache::new(config.authorization, mode),
        }
    }

    /// The cache holding entries of `kind`, for the kinds kept in an
    /// [`EntryCache`]. Aliases and units are never cached.
    pub fn for_kind(&self, kind: EntryKind) -> Option<&EntryCache> {
        match kind {
            EntryKind::Account => Some(&self.accounts),
            EntryKind::StaticGroup | EntryKind::DynamicGroup => Some(&self.groups),
            EntryKind::Cos => Some(&self.cos),
            EntryKind::Server | EntryKind::UcService => Some(&self.servers),
            EntryKind::Alias | EntryKind::DynamicGroupUnit | EntryKind::Domain => None,
        }
    }

    /// Drop membership-derived values from every cached account and group.
    /// Needed when a group's own containment changes, because every
    /// transitive member's closure may include it.
    pub fn invalidate_all_memberships(&self) {
        for entry in self.accounts.entries().into_iter().chain(self.groups.entries()) {
            entry.invalidate(&CacheDataKind::MEMBERSHIP);
        }
    }

    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            self.accounts.stats(),
            self.groups.stats(),
            self.domains.stats(),
            self.cos.stats(),
            self.servers.stats(),
            self.authorization.stats(),
        ]
    }

    pub fn clear_all(&self) {
        self.accounts.clear();
        self.groups.clear();
        self.domains.clear();
        self.cos.clear();
        self.servers.clear();
        self.authorization.clear();
    }
}
