// ── Domain cache ──
//
// Domains are probed by arbitrary hostnames far more often than they
// change, so misses are remembered too. A negative entry is dropped the
// moment a domain is cached under the same key.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;
use tracing::trace;

use super::CacheStats;
use super::entry_cache::{EntryCache, KeyKind};
use crate::config::{CacheMode, CacheSettings};
use crate::model::{Entry, EntryId};
use crate::schema;

/// Outcome of a cached domain lookup.
#[derive(Debug, Clone)]
pub enum DomainLookup {
    Hit(Arc<Entry>),
    /// Known not to exist.
    Negative,
    Miss,
}

pub struct DomainCache {
    entries: EntryCache,
    negative: Cache<(KeyKind, String), ()>,
    negative_hits: AtomicU64,
}

impl DomainCache {
    pub fn new(settings: CacheSettings, negative_ttl: Duration, mode: CacheMode) -> Self {
        Self {
            entries: EntryCache::new("domains", settings, mode),
            negative: Cache::builder()
                .max_capacity(settings.max_entries.saturating_mul(4))
                .time_to_live(negative_ttl)
                .build(),
            negative_hits: AtomicU64::new(0),
        }
    }

    pub fn lookup_id(&self, id: &EntryId) -> DomainLookup {
        match self.entries.get_by_id(id) {
            Some(entry) => DomainLookup::Hit(entry),
            None => DomainLookup::Miss,
        }
    }

    /// Look up by name, virtual hostname or foreign principal.
    pub fn lookup(&self, kind: KeyKind, value: &str) -> DomainLookup {
        if let Some(entry) = self.entries.get_by_key(kind, value) {
            return DomainLookup::Hit(entry);
        }
        if self.entries.is_enabled() && self.negative.contains_key(&negative_key(kind, value)) {
            self.negative_hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = value, "negative domain cache hit");
            return DomainLookup::Negative;
        }
        DomainLookup::Miss
    }

    /// Cache a domain and forget any remembered absence under its keys.
    pub fn put(&self, entry: &Arc<Entry>) {
        self.clear_negatives_for(entry);
        self.entries.put(entry);
    }

    pub fn put_negative(&self, kind: KeyKind, value: &str) {
        if self.entries.is_enabled() {
            self.negative.insert(negative_key(kind, value), ());
        }
    }

    pub fn replace(&self, entry: &Arc<Entry>) {
        self.clear_negatives_for(entry);
        self.entries.replace(entry);
    }

    pub fn remove(&self, entry: &Entry) {
        self.entries.remove(entry);
    }

    pub fn remove_by_name(&self, name: &str) -> bool {
        self.negative.invalidate(&negative_key(KeyKind::Name, name));
        self.entries.remove_by_name(name)
    }

    pub fn remove_id(&self, id: &EntryId) {
        self.entries.remove_id(id);
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.negative.invalidate_all();
    }

    pub fn entries(&self) -> Vec<Arc<Entry>> {
        self.entries.entries()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.entries.stats();
        // A remembered absence saved a round trip just like a hit.
        let negative_hits = self.negative_hits.load(Ordering::Relaxed);
        stats.hits += negative_hits;
        stats.misses = stats.misses.saturating_sub(negative_hits);
        stats.recompute_hit_rate();
        stats
    }

    fn clear_negatives_for(&self, entry: &Entry) {
        self.negative.invalidate(&negative_key(KeyKind::Name, &entry.name()));
        for host in entry.attr_values(schema::VIRTUAL_HOSTNAME) {
            self.negative
                .invalidate(&negative_key(KeyKind::VirtualHostname, &host));
        }
        for principal in entry.attr_values(schema::FOREIGN_PRINCIPAL) {
            self.negative
                .invalidate(&negative_key(KeyKind::ForeignPrincipal, &principal));
        }
    }
}

fn negative_key(kind: KeyKind, value: &str) -> (KeyKind, String) {
    (kind, value.trim().to_lowercase())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dirprov_api::{Attributes, Dn};

    use crate::model::EntryKind;

    fn cache() -> DomainCache {
        DomainCache::new(
            CacheSettings::new(10, 60),
            Duration::from_secs(60),
            CacheMode::Default,
        )
    }

    fn domain(name: &str) -> Arc<Entry> {
        Arc::new(Entry::new(
            EntryId::generate(),
            EntryKind::Domain,
            name.into(),
            Dn::root(),
            Attributes::new().with(schema::VIRTUAL_HOSTNAME, "mail.bogus.com"),
        ))
    }

    #[test]
    fn negative_entry_is_superseded_by_put() {
        let cache = cache();
        cache.put_negative(KeyKind::Name, "bogus.com");
        cache.put_negative(KeyKind::VirtualHostname, "mail.bogus.com");
        assert!(matches!(cache.lookup(KeyKind::Name, "bogus.com"), DomainLookup::Negative));

        let d = domain("bogus.com");
        cache.put(&d);
        match cache.lookup(KeyKind::Name, "BOGUS.com") {
            DomainLookup::Hit(found) => assert!(Arc::ptr_eq(&found, &d)),
            other => panic!("expected hit, got {other:?}"),
        }
        assert!(matches!(
            cache.lookup(KeyKind::VirtualHostname, "mail.bogus.com"),
            DomainLookup::Hit(_)
        ));
    }

    #[test]
    fn negative_hits_count_as_hits() {
        let cache = cache();
        cache.put_negative(KeyKind::Name, "nowhere.com");
        cache.lookup(KeyKind::Name, "nowhere.com");
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn disabled_mode_never_remembers_absence() {
        let cache = DomainCache::new(CacheSettings::new(10, 60), Duration::from_secs(60), CacheMode::None);
        cache.put_negative(KeyKind::Name, "nowhere.com");
        assert!(matches!(cache.lookup(KeyKind::Name, "nowhere.com"), DomainLookup::Miss));
    }
}
