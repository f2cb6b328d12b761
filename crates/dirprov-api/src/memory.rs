// ── In-memory directory store ──
//
// A complete `DirectoryClient` over a sorted map, used by the CLI (backed
// by a JSON snapshot file) and by tests. It enforces the same structural
// rules a real directory server does: parents must exist, only leaves can
// be deleted, renames move whole subtrees, naming values stay present.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::attrs::{Attributes, Modification};
use crate::client::{DirectoryClient, Routing, Scope, SearchHit, SearchRequest, Visit};
use crate::dn::Dn;
use crate::error::Error;

/// The operations a [`MemoryDirectory`] counts and can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Modify,
    Delete,
    Rename,
    Get,
    Search,
}

/// Round-trip counters, one per operation kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpStats {
    pub creates: u64,
    pub modifies: u64,
    pub deletes: u64,
    pub renames: u64,
    pub gets: u64,
    pub searches: u64,
    pub pages: u64,
}

#[derive(Default)]
struct Counters {
    creates: AtomicU64,
    modifies: AtomicU64,
    deletes: AtomicU64,
    renames: AtomicU64,
    gets: AtomicU64,
    searches: AtomicU64,
    pages: AtomicU64,
}

struct Fault {
    op: Operation,
    dn_contains: String,
    error: Error,
}

/// Serializable dump of every entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub entries: Vec<SearchHit>,
}

/// Thread-safe in-memory directory.
#[derive(Default)]
pub struct MemoryDirectory {
    /// Normalized DN -> entry.
    entries: RwLock<BTreeMap<String, SearchHit>>,
    counters: Counters,
    faults: Mutex<Vec<Fault>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a directory from a previously taken snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let entries = snapshot
            .entries
            .into_iter()
            .map(|hit| (hit.dn.normalized(), hit))
            .collect();
        Self {
            entries: RwLock::new(entries),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.read().values().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> OpStats {
        let c = &self.counters;
        OpStats {
            creates: c.creates.load(Ordering::Relaxed),
            modifies: c.modifies.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            renames: c.renames.load(Ordering::Relaxed),
            gets: c.gets.load(Ordering::Relaxed),
            searches: c.searches.load(Ordering::Relaxed),
            pages: c.pages.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        let c = &self.counters;
        for counter in [
            &c.creates,
            &c.modifies,
            &c.deletes,
            &c.renames,
            &c.gets,
            &c.searches,
            &c.pages,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Make the next `op` whose DN contains `dn_contains` (case-insensitive)
    /// fail with `error`. Each registered fault fires once.
    pub fn fail_next(&self, op: Operation, dn_contains: &str, error: Error) {
        self.faults.lock().push(Fault {
            op,
            dn_contains: dn_contains.to_lowercase(),
            error,
        });
    }

    // ── Private helpers ─────────────────────────────────────────────

    fn injected(&self, op: Operation, dn: &Dn) -> Result<(), Error> {
        let key = dn.normalized();
        let mut faults = self.faults.lock();
        if let Some(pos) = faults
            .iter()
            .position(|f| f.op == op && key.contains(&f.dn_contains))
        {
            let fault = faults.remove(pos);
            debug!(?op, dn = %dn, "injected directory failure");
            return Err(fault.error);
        }
        Ok(())
    }

    fn require_parent(entries: &BTreeMap<String, SearchHit>, dn: &Dn) -> Result<(), Error> {
        if dn.len() <= 1 {
            return Ok(());
        }
        match dn.parent() {
            Some(parent) if !entries.contains_key(&parent.normalized()) => {
                Err(Error::NoSuchEntry {
                    dn: parent.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn in_scope(dn: &Dn, base: &Dn, scope: Scope) -> bool {
    match scope {
        Scope::Base => dn == base,
        Scope::One => dn.parent().is_some_and(|p| &p == base),
        Scope::Subtree => dn.is_under(base),
    }
}

impl DirectoryClient for MemoryDirectory {
    fn create(&self, dn: &Dn, mut attrs: Attributes) -> Result<(), Error> {
        self.counters.creates.fetch_add(1, Ordering::Relaxed);
        self.injected(Operation::Create, dn)?;

        let Some(rdn) = dn.first() else {
            return Err(Error::Rejected {
                dn: String::new(),
                reason: "cannot create the root entry".into(),
            });
        };

        let mut entries = self.entries.write();
        let key = dn.normalized();
        if entries.contains_key(&key) {
            return Err(Error::AlreadyExists { dn: dn.to_string() });
        }
        Self::require_parent(&entries, dn)?;

        attrs.add_values(rdn.attr(), [rdn.value()]);
        entries.insert(
            key,
            SearchHit {
                dn: dn.clone(),
                attrs,
            },
        );
        debug!(dn = %dn, "entry created");
        Ok(())
    }

    fn modify(&self, dn: &Dn, mods: &[Modification]) -> Result<(), Error> {
        self.counters.modifies.fetch_add(1, Ordering::Relaxed);
        self.injected(Operation::Modify, dn)?;

        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(&dn.normalized()) else {
            return Err(Error::NoSuchEntry { dn: dn.to_string() });
        };

        let mut updated = entry.attrs.clone();
        updated.apply(mods);
        if let Some(rdn) = dn
            .first()
            .filter(|rdn| !updated.has_value(rdn.attr(), rdn.value()))
        {
            return Err(Error::Rejected {
                dn: dn.to_string(),
                reason: format!("naming attribute '{}' cannot be removed", rdn.attr()),
            });
        }
        entry.attrs = updated;
        trace!(dn = %dn, changes = mods.len(), "entry modified");
        Ok(())
    }

    fn delete(&self, dn: &Dn) -> Result<(), Error> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        self.injected(Operation::Delete, dn)?;

        let mut entries = self.entries.write();
        let key = dn.normalized();
        if !entries.contains_key(&key) {
            return Err(Error::NoSuchEntry { dn: dn.to_string() });
        }
        if entries.values().any(|hit| hit.dn.is_strictly_under(dn)) {
            return Err(Error::NotLeaf { dn: dn.to_string() });
        }
        entries.remove(&key);
        debug!(dn = %dn, "entry deleted");
        Ok(())
    }

    fn rename(&self, from: &Dn, to: &Dn) -> Result<(), Error> {
        self.counters.renames.fetch_add(1, Ordering::Relaxed);
        self.injected(Operation::Rename, from)?;

        let mut entries = self.entries.write();
        if !entries.contains_key(&from.normalized()) {
            return Err(Error::NoSuchEntry {
                dn: from.to_string(),
            });
        }
        if from == to {
            return Ok(());
        }
        if entries.contains_key(&to.normalized()) {
            return Err(Error::AlreadyExists { dn: to.to_string() });
        }
        if to.is_under(from) {
            return Err(Error::Rejected {
                dn: from.to_string(),
                reason: "cannot move an entry below itself".into(),
            });
        }
        Self::require_parent(&entries, to)?;

        let moving: Vec<String> = entries
            .iter()
            .filter(|(_, hit)| hit.dn.is_under(from))
            .map(|(key, _)| key.clone())
            .collect();

        for key in moving {
            let Some(mut hit) = entries.remove(&key) else {
                continue;
            };
            let Some(new_dn) = hit.dn.with_suffix_replaced(from, to) else {
                continue;
            };
            if hit.dn == *from {
                if let (Some(old_rdn), Some(new_rdn)) = (from.first(), to.first()) {
                    hit.attrs.remove_values(old_rdn.attr(), [old_rdn.value()]);
                    hit.attrs.add_values(new_rdn.attr(), [new_rdn.value()]);
                }
            }
            hit.dn = new_dn;
            entries.insert(hit.dn.normalized(), hit);
        }

        debug!(from = %from, to = %to, "entry renamed");
        Ok(())
    }

    fn get(&self, dn: &Dn, _routing: Routing) -> Result<Option<Attributes>, Error> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        self.injected(Operation::Get, dn)?;

        Ok(self
            .entries
            .read()
            .get(&dn.normalized())
            .map(|hit| hit.attrs.clone()))
    }

    fn search(
        &self,
        request: &SearchRequest,
        visitor: &mut dyn FnMut(SearchHit) -> Visit,
    ) -> Result<(), Error> {
        self.counters.searches.fetch_add(1, Ordering::Relaxed);
        self.injected(Operation::Search, &request.base)?;

        // Collect under the lock, deliver without it so visitors may call back in.
        let hits: Vec<SearchHit> = {
            let entries = self.entries.read();
            if !request.base.is_root() && !entries.contains_key(&request.base.normalized()) {
                return Err(Error::NoSuchEntry {
                    dn: request.base.to_string(),
                });
            }
            entries
                .values()
                .filter(|hit| in_scope(&hit.dn, &request.base, request.scope))
                .filter(|hit| request.filter.matches(&hit.attrs))
                .map(|hit| SearchHit {
                    dn: hit.dn.clone(),
                    attrs: hit.attrs.project(&request.attrs),
                })
                .collect()
        };

        trace!(
            base = %request.base,
            filter = %request.filter,
            hits = hits.len(),
            "search"
        );

        let page_size = request.page_size.max(1);
        let mut remaining = hits.into_iter();
        loop {
            let page: Vec<SearchHit> = remaining.by_ref().take(page_size).collect();
            if page.is_empty() {
                return Ok(());
            }
            self.counters.pages.fetch_add(1, Ordering::Relaxed);
            for hit in page {
                if visitor(hit) == Visit::Stop {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn create_requires_parent() {
        let dir = MemoryDirectory::new();
        let err = dir
            .create(&dn("uid=a,ou=people,dc=x"), Attributes::new())
            .unwrap_err();
        assert_eq!(err, Error::NoSuchEntry { dn: "ou=people,dc=x".into() });

        dir.create(&dn("dc=x"), Attributes::new()).unwrap();
        dir.create(&dn("ou=people,dc=x"), Attributes::new()).unwrap();
        dir.create(&dn("uid=a,ou=people,dc=x"), Attributes::new()).unwrap();

        let attrs = dir.get(&dn("UID=A,ou=people,dc=x"), Routing::PreferMaster).unwrap().unwrap();
        assert_eq!(attrs.get_one("uid"), Some("a"));
    }

    #[test]
    fn modify_cannot_drop_naming_value() {
        let dir = MemoryDirectory::new();
        dir.create(&dn("dc=x"), Attributes::new()).unwrap();
        let err = dir
            .modify(&dn("dc=x"), &[Modification::delete_attr("dc")])
            .unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
    }

    #[test]
    fn injected_fault_fires_once() {
        let dir = MemoryDirectory::new();
        dir.fail_next(
            Operation::Create,
            "DC=X",
            Error::Unavailable {
                reason: "down".into(),
            },
        );
        assert!(dir.create(&dn("dc=x"), Attributes::new()).unwrap_err().is_transient());
        dir.create(&dn("dc=x"), Attributes::new()).unwrap();
    }

    #[test]
    fn search_pages_and_stops() {
        let dir = MemoryDirectory::new();
        dir.create(&dn("dc=x"), Attributes::new()).unwrap();
        for i in 0..5 {
            dir.create(&dn(&format!("uid=u{i},dc=x")), Attributes::new()).unwrap();
        }

        let req = SearchRequest::subtree(dn("dc=x"), Filter::present("uid")).with_page_size(2);
        assert_eq!(dir.search_all(&req).unwrap().len(), 5);
        assert_eq!(dir.stats().pages, 3);

        let mut seen = 0;
        dir.search(&req, &mut |_| {
            seen += 1;
            if seen == 3 { Visit::Stop } else { Visit::Continue }
        })
        .unwrap();
        assert_eq!(seen, 3);
    }
}
