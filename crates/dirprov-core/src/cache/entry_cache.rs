// ── Keyed entry cache ──
//
// Bounded concurrent storage for one entity type. The primary map is a
// moka cache keyed by entry id; secondary keys (name, foreign principal,
// virtual hostname) live in a DashMap index pointing back at the id.
// Capacity and TTL evictions drop the evicted instance's keys through the
// moka eviction listener; explicit removals unregister directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use tracing::trace;

use super::CacheStats;
use crate::config::{CacheMode, CacheSettings};
use crate::model::{Entry, EntryId};
use crate::schema;

/// Secondary key families an entry can be found under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Name,
    ForeignPrincipal,
    VirtualHostname,
}

type Key = (KeyKind, String);

fn key(kind: KeyKind, value: &str) -> Key {
    (kind, value.trim().to_lowercase())
}

/// Every secondary key an entry is currently known under.
fn keys_for(entry: &Entry) -> Vec<Key> {
    let mut keys = vec![key(KeyKind::Name, &entry.name())];
    keys.extend(
        entry
            .attr_values(schema::FOREIGN_PRINCIPAL)
            .iter()
            .map(|v| key(KeyKind::ForeignPrincipal, v)),
    );
    keys.extend(
        entry
            .attr_values(schema::VIRTUAL_HOSTNAME)
            .iter()
            .map(|v| key(KeyKind::VirtualHostname, v)),
    );
    keys
}

/// Keys registered for one cached instance.
struct Registration {
    instance: Weak<Entry>,
    keys: Vec<Key>,
}

type Index = DashMap<Key, EntryId>;
type KeysOf = DashMap<EntryId, Registration>;

/// Drop the secondary keys registered for `id`. With `instance`, only when
/// the registration still belongs to that instance.
fn forget(index: &Index, keys_of: &KeysOf, id: &EntryId, instance: Option<&Arc<Entry>>) {
    let removed = match instance {
        Some(entry) => keys_of.remove_if(id, |_, reg| std::ptr::eq(reg.instance.as_ptr(), Arc::as_ptr(entry))),
        None => keys_of.remove(id),
    };
    if let Some((_, reg)) = removed {
        for k in reg.keys {
            index.remove_if(&k, |_, v| v == id);
        }
    }
}

pub struct EntryCache {
    name: &'static str,
    enabled: bool,
    by_id: Cache<EntryId, Arc<Entry>>,
    index: Arc<Index>,
    keys_of: Arc<KeysOf>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EntryCache {
    pub fn new(name: &'static str, settings: CacheSettings, mode: CacheMode) -> Self {
        let index: Arc<Index> = Arc::new(DashMap::new());
        let keys_of: Arc<KeysOf> = Arc::new(DashMap::new());
        let listener = {
            let index = Arc::clone(&index);
            let keys_of = Arc::clone(&keys_of);
            move |id: Arc<EntryId>, entry: Arc<Entry>, cause: RemovalCause| {
                if cause.was_evicted() {
                    trace!(cache = name, id = %id, ?cause, "evicted");
                    forget(&index, &keys_of, &id, Some(&entry));
                }
            }
        };
        Self {
            name,
            enabled: mode == CacheMode::Default,
            by_id: Cache::builder()
                .max_capacity(settings.max_entries)
                .time_to_live(settings.ttl)
                .eviction_listener(listener)
                .build(),
            index,
            keys_of,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Register `entry` under its id and every secondary key. A different
    /// instance cached under the same id is displaced.
    pub fn put(&self, entry: &Arc<Entry>) {
        if !self.enabled {
            return;
        }
        let id = entry.id().clone();
        self.unregister(&id);
        self.by_id.insert(id.clone(), Arc::clone(entry));
        self.register(entry);
        trace!(cache = self.name, %id, "cached");
    }

    /// Reconcile the cache after `entry` was refreshed with new state.
    ///
    /// When `entry` is the canonical cached instance its keys are
    /// re-registered (the name may have changed). When a different
    /// instance is cached under the same id, that instance is stale and
    /// is evicted instead of being overwritten.
    pub fn replace(&self, entry: &Arc<Entry>) {
        if !self.enabled {
            return;
        }
        let id = entry.id();
        match self.by_id.get(id) {
            Some(cached) if Arc::ptr_eq(&cached, entry) => {
                self.unregister(id);
                self.register(entry);
            }
            Some(_) => {
                trace!(cache = self.name, %id, "evicting stale canonical instance");
                self.remove_id(id);
            }
            None => {}
        }
    }

    pub fn remove(&self, entry: &Entry) {
        self.remove_id(entry.id());
    }

    pub fn remove_id(&self, id: &EntryId) {
        if !self.enabled {
            return;
        }
        self.by_id.invalidate(id);
        self.unregister(id);
    }

    /// Evict whatever is cached under `name`. Returns whether anything was.
    pub fn remove_by_name(&self, name: &str) -> bool {
        let Some(id) = self.index.get(&key(KeyKind::Name, name)).map(|r| r.value().clone()) else {
            return false;
        };
        self.remove_id(&id);
        true
    }

    pub fn clear(&self) {
        self.by_id.invalidate_all();
        self.index.clear();
        self.keys_of.clear();
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn get_by_id(&self, id: &EntryId) -> Option<Arc<Entry>> {
        if !self.enabled {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let found = self.by_id.get(id);
        self.count(found.is_some());
        found
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<Entry>> {
        self.get_by_key(KeyKind::Name, name)
    }

    pub fn get_by_foreign_principal(&self, principal: &str) -> Option<Arc<Entry>> {
        self.get_by_key(KeyKind::ForeignPrincipal, principal)
    }

    pub fn get_by_virtual_hostname(&self, hostname: &str) -> Option<Arc<Entry>> {
        self.get_by_key(KeyKind::VirtualHostname, hostname)
    }

    pub fn get_by_key(&self, kind: KeyKind, value: &str) -> Option<Arc<Entry>> {
        if !self.enabled {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let k = key(kind, value);
        let found = self
            .index
            .get(&k)
            .map(|r| r.value().clone())
            .and_then(|id| {
                let entry = self.by_id.get(&id);
                if entry.is_none() {
                    self.index.remove_if(&k, |_, v| *v == id);
                }
                entry
            });
        self.count(found.is_some());
        found
    }

    /// Every cached instance.
    pub fn entries(&self) -> Vec<Arc<Entry>> {
        self.by_id.iter().map(|(_, entry)| entry).collect()
    }

    pub fn len(&self) -> u64 {
        self.by_id.run_pending_tasks();
        self.by_id.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.name,
            self.len(),
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    // ── Private helpers ─────────────────────────────────────────────

    fn count(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn register(&self, entry: &Arc<Entry>) {
        let id = entry.id();
        let keys = keys_for(entry);
        for k in &keys {
            self.index.insert(k.clone(), id.clone());
        }
        self.keys_of.insert(
            id.clone(),
            Registration {
                instance: Arc::downgrade(entry),
                keys,
            },
        );
    }

    fn unregister(&self, id: &EntryId) {
        forget(&self.index, &self.keys_of, id, None);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dirprov_api::{Attributes, Dn};

    use crate::model::EntryKind;

    fn cache() -> EntryCache {
        EntryCache::new("accounts", CacheSettings::new(100, 60), CacheMode::Default)
    }

    fn account(name: &str) -> Arc<Entry> {
        Arc::new(Entry::new(
            EntryId::generate(),
            EntryKind::Account,
            name.into(),
            Dn::root(),
            Attributes::new().with(schema::FOREIGN_PRINCIPAL, "ad:alice"),
        ))
    }

    #[test]
    fn put_then_get_is_identical_under_every_key() {
        let cache = cache();
        let e = account("alice@a.com");
        cache.put(&e);

        assert!(Arc::ptr_eq(&cache.get_by_id(e.id()).unwrap(), &e));
        assert!(Arc::ptr_eq(&cache.get_by_name("ALICE@a.com").unwrap(), &e));
        assert!(Arc::ptr_eq(&cache.get_by_foreign_principal("ad:alice").unwrap(), &e));
    }

    #[test]
    fn remove_evicts_every_key() {
        let cache = cache();
        let e = account("alice@a.com");
        cache.put(&e);
        cache.remove(&e);

        assert!(cache.get_by_id(e.id()).is_none());
        assert!(cache.get_by_name("alice@a.com").is_none());
        assert!(cache.get_by_foreign_principal("ad:alice").is_none());
    }

    #[test]
    fn replace_rekeys_canonical_instance() {
        let cache = cache();
        let e = account("alice@a.com");
        cache.put(&e);

        e.refresh("alice@b.com".into(), Dn::root(), Attributes::new());
        cache.replace(&e);

        assert!(cache.get_by_name("alice@a.com").is_none());
        assert!(Arc::ptr_eq(&cache.get_by_name("alice@b.com").unwrap(), &e));
    }

    #[test]
    fn replace_with_foreign_instance_evicts() {
        let cache = cache();
        let canonical = account("alice@a.com");
        cache.put(&canonical);

        let other = Arc::new(Entry::new(
            canonical.id().clone(),
            EntryKind::Account,
            "alice@a.com".into(),
            Dn::root(),
            Attributes::new(),
        ));
        other.refresh("alice@a.com".into(), Dn::root(), Attributes::new().with("cn", "A"));
        cache.replace(&other);

        assert!(cache.get_by_id(canonical.id()).is_none());
        assert!(canonical.attr("cn").is_none());
    }

    #[test]
    fn capacity_evictions_release_secondary_keys() {
        let cache = EntryCache::new("accounts", CacheSettings::new(2, 60), CacheMode::Default);
        let entries: Vec<Arc<Entry>> = (0..20)
            .map(|i| {
                Arc::new(Entry::new(
                    EntryId::generate(),
                    EntryKind::Account,
                    format!("user{i}@a.com"),
                    Dn::root(),
                    Attributes::new(),
                ))
            })
            .collect();
        for e in &entries {
            cache.put(e);
        }

        let size = cache.len();
        assert!(size <= 2, "size {size}");
        assert_eq!(cache.keys_of.len() as u64, size);
        assert_eq!(cache.index.len() as u64, size);
    }

    #[test]
    fn disabled_cache_is_pass_through() {
        let cache = EntryCache::new("accounts", CacheSettings::new(100, 60), CacheMode::None);
        let e = account("alice@a.com");
        cache.put(&e);
        assert!(cache.get_by_id(e.id()).is_none());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn hit_rate_counts() {
        let cache = cache();
        let e = account("alice@a.com");
        cache.put(&e);
        cache.get_by_name("alice@a.com");
        cache.get_by_name("bob@a.com");
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }
}
