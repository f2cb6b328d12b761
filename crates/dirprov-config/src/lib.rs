//! Shared configuration for the dirprov CLI.
//!
//! A TOML file with cache, layout and lockout settings, layered under
//! `DIRPROV_` environment variables, and translation to
//! `dirprov_core::EngineConfig`. The engine itself never reads files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dirprov_core::{CacheMode, CacheSettings, DitConfig, EngineConfig, LockoutPolicy};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Directory snapshot the CLI works on.
    pub state: Option<PathBuf>,

    /// `default`, or `none` to disable every cache.
    #[serde(default = "default_cache_mode")]
    pub cache_mode: String,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub dit: DitSection,

    #[serde(default)]
    pub membership: MembershipSection,

    #[serde(default)]
    pub lockout: LockoutSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state: None,
            cache_mode: default_cache_mode(),
            defaults: Defaults::default(),
            cache: CacheSection::default(),
            dit: DitSection::default(),
            membership: MembershipSection::default(),
            lockout: LockoutSection::default(),
        }
    }
}

fn default_cache_mode() -> String {
    "default".into()
}

/// CLI presentation defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// Size and lifetime of one entity cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheLimits {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

impl CacheLimits {
    const fn new(max_entries: u64, ttl_secs: u64) -> Self {
        Self {
            max_entries,
            ttl_secs,
        }
    }

    fn to_settings(self) -> CacheSettings {
        CacheSettings::new(self.max_entries, self.ttl_secs)
    }
}

impl From<CacheSettings> for CacheLimits {
    fn from(settings: CacheSettings) -> Self {
        Self::new(settings.max_entries, settings.ttl.as_secs())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSection {
    pub accounts: CacheLimits,
    pub groups: CacheLimits,
    pub domains: CacheLimits,
    pub cos: CacheLimits,
    pub servers: CacheLimits,
    pub authorization: CacheLimits,
    /// How long "domain does not exist" is remembered.
    pub domain_negative_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            accounts: engine.accounts.into(),
            groups: engine.groups.into(),
            domains: engine.domains.into(),
            cos: engine.cos.into(),
            servers: engine.servers.into(),
            authorization: engine.authorization.into(),
            domain_negative_ttl_secs: engine.domain_negative_ttl.as_secs(),
        }
    }
}

/// Container names of the directory layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DitSection {
    pub config_root: String,
    pub people_container: String,
    pub groups_container: String,
}

impl Default for DitSection {
    fn default() -> Self {
        let dit = DitConfig::default();
        Self {
            config_root: dit.config_root,
            people_container: dit.people_container,
            groups_container: dit.groups_container,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MembershipSection {
    /// Addresses per reverse membership search.
    pub batch_size: usize,
    pub search_page_size: usize,
}

impl Default for MembershipSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            batch_size: engine.membership_batch_size,
            search_page_size: engine.search_page_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LockoutSection {
    pub enabled: bool,
    pub max_failures: u32,
}

impl Default for LockoutSection {
    fn default() -> Self {
        let policy = LockoutPolicy::default();
        Self {
            enabled: policy.enabled,
            max_failures: policy.max_failures,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "dirprov", "dirprov").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the directory snapshot lives when neither the CLI nor the
/// config file names one.
pub fn default_state_path() -> PathBuf {
    ProjectDirs::from("org", "dirprov", "dirprov").map_or_else(
        || {
            let mut p = home_dir();
            p.push(".local");
            p.push("share");
            p.push("dirprov");
            p.push("state.json");
            p
        },
        |dirs| dirs.data_dir().join("state.json"),
    )
}

/// Effective state path: explicit override, then the config file's
/// `state` key, then the platform default.
pub fn resolve_state_path(explicit: Option<&Path>, cfg: &Config) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| cfg.state.clone())
        .unwrap_or_else(default_state_path)
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
}

fn dirs_fallback() -> PathBuf {
    let mut p = home_dir();
    p.push(".config");
    p.push("dirprov");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file contributes nothing.
///
/// Environment variables use `__` between section and key, e.g.
/// `DIRPROV_LOCKOUT__MAX_FAILURES=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DIRPROV_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the engine configuration, rejecting values the engine cannot
/// work with.
pub fn to_engine_config(cfg: &Config) -> Result<EngineConfig, ConfigError> {
    let cache_mode: CacheMode = cfg.cache_mode.parse().map_err(|_| {
        ConfigError::invalid(
            "cache_mode",
            format!("expected 'default' or 'none', got '{}'", cfg.cache_mode),
        )
    })?;

    for (field, value) in [
        ("dit.config_root", &cfg.dit.config_root),
        ("dit.people_container", &cfg.dit.people_container),
        ("dit.groups_container", &cfg.dit.groups_container),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid(field, "must not be empty"));
        }
    }
    if cfg.membership.batch_size == 0 {
        return Err(ConfigError::invalid("membership.batch_size", "must be at least 1"));
    }
    if cfg.membership.search_page_size == 0 {
        return Err(ConfigError::invalid(
            "membership.search_page_size",
            "must be at least 1",
        ));
    }
    if cfg.lockout.enabled && cfg.lockout.max_failures == 0 {
        return Err(ConfigError::invalid(
            "lockout.max_failures",
            "must be at least 1 when lockout is enabled",
        ));
    }

    let cache = &cfg.cache;
    Ok(EngineConfig {
        cache_mode,
        accounts: cache.accounts.to_settings(),
        groups: cache.groups.to_settings(),
        domains: cache.domains.to_settings(),
        domain_negative_ttl: Duration::from_secs(cache.domain_negative_ttl_secs),
        cos: cache.cos.to_settings(),
        servers: cache.servers.to_settings(),
        authorization: cache.authorization.to_settings(),
        membership_batch_size: cfg.membership.batch_size,
        search_page_size: cfg.membership.search_page_size,
        dit: DitConfig {
            config_root: cfg.dit.config_root.trim().to_owned(),
            people_container: cfg.dit.people_container.trim().to_owned(),
            groups_container: cfg.dit.groups_container.trim().to_owned(),
        },
        lockout: LockoutPolicy {
            enabled: cfg.lockout.enabled,
            max_failures: cfg.lockout.max_failures,
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_engine() {
        let engine = to_engine_config(&Config::default()).unwrap();
        let reference = EngineConfig::default();
        assert_eq!(engine.cache_mode, reference.cache_mode);
        assert_eq!(engine.accounts, reference.accounts);
        assert_eq!(engine.dit, reference.dit);
        assert_eq!(engine.lockout, reference.lockout);
        assert_eq!(engine.membership_batch_size, reference.membership_batch_size);
    }

    #[test]
    fn rejects_unknown_cache_mode() {
        let cfg = Config {
            cache_mode: "sometimes".into(),
            ..Config::default()
        };
        let err = to_engine_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "cache_mode"));
    }

    #[test]
    fn state_path_prefers_the_explicit_override() {
        let cfg = Config {
            state: Some(PathBuf::from("/srv/dir.json")),
            ..Config::default()
        };
        assert_eq!(
            resolve_state_path(Some(Path::new("/tmp/x.json")), &cfg),
            PathBuf::from("/tmp/x.json")
        );
        assert_eq!(resolve_state_path(None, &cfg), PathBuf::from("/srv/dir.json"));
        assert!(resolve_state_path(None, &Config::default()).ends_with("state.json"));
    }

    #[test]
    fn rejects_zero_lockout_threshold() {
        let mut cfg = Config::default();
        cfg.lockout.max_failures = 0;
        assert!(to_engine_config(&cfg).is_err());

        cfg.lockout.enabled = false;
        assert!(to_engine_config(&cfg).is_ok());
    }
}
