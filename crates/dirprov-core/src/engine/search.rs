// ── Search and cache administration ──

use std::sync::Arc;

use dirprov_api::Filter;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use super::Provisioning;
use crate::cache::{CacheStats, CacheType};
use crate::error::CoreError;
use crate::model::{Entry, EntryId, EntryKind};
use crate::schema;

impl Provisioning {
    /// Search for entries of the given kinds, optionally inside one domain
    /// and narrowed by `filter`. Results are sorted by kind, then name.
    pub fn search(
        &self,
        kinds: &[EntryKind],
        domain: Option<&str>,
        filter: Option<&Filter>,
    ) -> Result<Vec<Arc<Entry>>, CoreError> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }
        let roots = self.layout().search_roots_for(kinds, domain)?;
        let by_class = Filter::or(
            kinds
                .iter()
                .map(|k| Filter::eq(schema::OBJECT_CLASS, k.object_class())),
        );
        let full = match filter {
            Some(f) => Filter::and([by_class, f.clone()]),
            None => by_class,
        };
        debug!(roots = roots.len(), filter = %full, "searching");

        let mut found: Vec<Arc<Entry>> = self
            .search_entries(&roots, &full)?
            .into_iter()
            .filter(|e| kinds.contains(&e.kind()))
            .collect();
        found.sort_by(|a, b| {
            a.kind()
                .to_string()
                .cmp(&b.kind().to_string())
                .then_with(|| a.name().cmp(&b.name()))
        });
        Ok(found)
    }

    /// Evict the listed keys (names or ids) from one cache, or clear it
    /// entirely when `keys` is empty.
    pub fn flush_cache(&self, cache_type: CacheType, keys: &[String]) {
        let caches = self.caches();
        if keys.is_empty() || matches!(cache_type, CacheType::All | CacheType::Authorization) {
            match cache_type {
                CacheType::Account => caches.accounts.clear(),
                CacheType::Group => caches.groups.clear(),
                CacheType::Domain => caches.domains.clear(),
                CacheType::Cos => caches.cos.clear(),
                CacheType::Server => caches.servers.clear(),
                CacheType::Authorization => caches.authorization.clear(),
                CacheType::All => caches.clear_all(),
            }
            info!(cache = %cache_type, "cache flushed");
            return;
        }

        for key in keys {
            let evicted = match cache_type {
                CacheType::Domain => {
                    let by_name = caches.domains.remove_by_name(key);
                    caches.domains.remove_id(&EntryId::from(key.as_str()));
                    by_name
                }
                _ => {
                    let Some(cache) = cache_kind(cache_type).and_then(|k| caches.for_kind(k)) else {
                        continue;
                    };
                    let by_name = cache.remove_by_name(key);
                    cache.remove_id(&EntryId::from(key.as_str()));
                    by_name
                }
            };
            debug!(cache = %cache_type, key = %key, evicted, "cache key flushed");
        }
    }

    /// Size and hit-rate counters of every cache.
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        self.caches().stats()
    }

    /// Names every flushable cache accepts.
    pub fn cache_types() -> Vec<CacheType> {
        CacheType::iter().collect()
    }
}

fn cache_kind(cache_type: CacheType) -> Option<EntryKind> {
    match cache_type {
        CacheType::Account => Some(EntryKind::Account),
        CacheType::Group => Some(EntryKind::StaticGroup),
        CacheType::Cos => Some(EntryKind::Cos),
        CacheType::Server => Some(EntryKind::Server),
        CacheType::Domain | CacheType::Authorization | CacheType::All => None,
    }
}
