// ── Authorization cache ──
//
// Computed "is this subject an administrator" verdicts, keyed by subject
// id. Any structural change to groups or aliases can flip a verdict
// anywhere, so the whole cache is cleared rather than tracked per key.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::sync::Cache;
use tracing::debug;

use super::CacheStats;
use crate::config::{CacheMode, CacheSettings};
use crate::model::EntryId;

pub struct AuthorizationCache {
    enabled: bool,
    verdicts: Cache<EntryId, bool>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl AuthorizationCache {
    pub fn new(settings: CacheSettings, mode: CacheMode) -> Self {
        Self {
            enabled: mode == CacheMode::Default,
            verdicts: Cache::builder()
                .max_capacity(settings.max_entries)
                .time_to_live(settings.ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn get(&self, subject: &EntryId) -> Option<bool> {
        let found = if self.enabled {
            self.verdicts.get(subject)
        } else {
            None
        };
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn put(&self, subject: EntryId, is_admin: bool) {
        if self.enabled {
            self.verdicts.insert(subject, is_admin);
        }
    }

    /// Forget every verdict.
    pub fn clear(&self) {
        self.verdicts.invalidate_all();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!("authorization cache cleared");
    }

    /// How many times the cache has been cleared.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        self.verdicts.run_pending_tasks();
        CacheStats::new(
            "authorization",
            self.verdicts.entry_count(),
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_forgets_verdicts() {
        let cache = AuthorizationCache::new(CacheSettings::new(10, 60), CacheMode::Default);
        let id = EntryId::generate();
        cache.put(id.clone(), true);
        assert_eq!(cache.get(&id), Some(true));

        cache.clear();
        assert_eq!(cache.get(&id), None);
        assert_eq!(cache.invalidations(), 1);
    }
}
