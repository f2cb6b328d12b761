// ── Runtime engine configuration ──
//
// These types describe how the provisioning engine caches, pages and
// lays out the directory. They never touch disk: `dirprov-config` (or a
// test) builds an `EngineConfig` and hands it to `Provisioning::new`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Process-wide cache toggle, fixed when the engine is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Every cache behaves normally.
    #[default]
    Default,
    /// Every cache is a pass-through: puts are dropped, gets miss.
    None,
}

/// Bounds for one entity cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub max_entries: u64,
    pub ttl: Duration,
}

impl CacheSettings {
    pub const fn new(max_entries: u64, ttl_secs: u64) -> Self {
        Self {
            max_entries,
            ttl: Duration::from_secs(ttl_secs),
        }
    }
}

/// Names of the fixed containers in the directory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitConfig {
    /// Value of the configuration root entry (`cn=<config_root>`).
    pub config_root: String,
    /// Account/alias/static group container under each domain (`ou=...`).
    pub people_container: String,
    /// Dynamic group container under each domain (`cn=...`).
    pub groups_container: String,
}

impl Default for DitConfig {
    fn default() -> Self {
        Self {
            config_root: "dirprov".into(),
            people_container: "people".into(),
            groups_container: "groups".into(),
        }
    }
}

/// Failed-login lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub enabled: bool,
    /// Consecutive failures that flip the account to `lockout`.
    pub max_failures: u32,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failures: 10,
        }
    }
}

/// Complete configuration for one [`Provisioning`](crate::Provisioning) engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_mode: CacheMode,
    pub accounts: CacheSettings,
    pub groups: CacheSettings,
    pub domains: CacheSettings,
    /// How long a remembered "domain does not exist" stays valid.
    pub domain_negative_ttl: Duration,
    pub cos: CacheSettings,
    pub servers: CacheSettings,
    pub authorization: CacheSettings,
    /// Addresses per OR-filter when reverse-searching static group membership.
    pub membership_batch_size: usize,
    pub search_page_size: usize,
    pub dit: DitConfig,
    pub lockout: LockoutPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_mode: CacheMode::Default,
            accounts: CacheSettings::new(20_000, 15 * 60),
            groups: CacheSettings::new(10_000, 15 * 60),
            domains: CacheSettings::new(500, 15 * 60),
            domain_negative_ttl: Duration::from_secs(15 * 60),
            cos: CacheSettings::new(100, 15 * 60),
            servers: CacheSettings::new(100, 15 * 60),
            authorization: CacheSettings::new(20_000, 15 * 60),
            membership_batch_size: 100,
            search_page_size: dirprov_api::client::DEFAULT_PAGE_SIZE,
            dit: DitConfig::default(),
            lockout: LockoutPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Same defaults with every cache disabled.
    pub fn uncached() -> Self {
        Self {
            cache_mode: CacheMode::None,
            ..Self::default()
        }
    }
}
