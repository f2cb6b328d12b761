// ── Provisioning engine ──
//
// The explicitly constructed engine that owns the directory handle, the
// location layout and every cache. Entity operations live in sibling
// modules as further `impl Provisioning` blocks; this file holds the
// entry plumbing they share: loading, materializing, writing through the
// hooks and keeping the caches coherent after each write.

mod accounts;
mod auth;
mod config_entries;
mod domains;
mod groups;
mod search;

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dirprov_api::{
    Attributes, DirectoryClient, Dn, Filter, Modification, Routing, SearchHit, SearchRequest,
};
use parking_lot::Mutex;
use tracing::{debug, trace};

pub use auth::{PasswordVerifier, StoredPasswordVerifier};
pub(crate) use accounts::{collision_as, merge_user_attrs};

use crate::cache::{Caches, KeyKind};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::hooks::{DefaultSchemaHooks, SchemaHooks};
use crate::model::{Address, Entry, EntryId, EntryKind};
use crate::naming::DitLayout;
use crate::schema;

/// The provisioning engine.
///
/// Cheaply cloneable; clones share the directory handle and caches.
#[derive(Clone)]
pub struct Provisioning {
    inner: Arc<ProvisioningInner>,
}

struct ProvisioningInner {
    directory: Arc<dyn DirectoryClient>,
    layout: DitLayout,
    caches: Caches,
    config: EngineConfig,
    hooks: Arc<dyn SchemaHooks>,
    verifier: Arc<dyn PasswordVerifier>,
    /// Serializes password checks and failed-login updates per account.
    auth_locks: DashMap<EntryId, Arc<Mutex<()>>>,
}

impl Provisioning {
    /// Engine with the default schema hooks and password verifier.
    pub fn new(directory: Arc<dyn DirectoryClient>, config: EngineConfig) -> Self {
        Self::with_collaborators(
            directory,
            config,
            Arc::new(DefaultSchemaHooks),
            Arc::new(StoredPasswordVerifier),
        )
    }

    pub fn with_collaborators(
        directory: Arc<dyn DirectoryClient>,
        config: EngineConfig,
        hooks: Arc<dyn SchemaHooks>,
        verifier: Arc<dyn PasswordVerifier>,
    ) -> Self {
        debug!(cache_mode = %config.cache_mode, "provisioning engine created");
        Self {
            inner: Arc::new(ProvisioningInner {
                layout: DitLayout::new(config.dit.clone()),
                caches: Caches::new(&config),
                directory,
                config,
                hooks,
                verifier,
                auth_locks: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn layout(&self) -> &DitLayout {
        &self.inner.layout
    }

    pub fn caches(&self) -> &Caches {
        &self.inner.caches
    }

    pub fn directory(&self) -> &Arc<dyn DirectoryClient> {
        &self.inner.directory
    }

    // ── Reading entries ─────────────────────────────────────────────

    pub(crate) fn dir(&self) -> &dyn DirectoryClient {
        self.inner.directory.as_ref()
    }

    /// Build a live entry from raw directory data.
    pub(crate) fn materialize(&self, dn: Dn, attrs: Attributes) -> Result<Arc<Entry>, CoreError> {
        let kind = EntryKind::from_attrs(&attrs)
            .ok_or_else(|| CoreError::Internal(format!("{dn} has no known object class")))?;
        let id = attrs
            .get_one(schema::ENTRY_ID)
            .map(EntryId::from)
            .ok_or_else(|| CoreError::Internal(format!("{dn} has no {}", schema::ENTRY_ID)))?;
        let name = self.entry_name(kind, &dn, &attrs)?;
        Ok(Arc::new(Entry::new(id, kind, name, dn, attrs)))
    }

    /// Canonical name of an entry: its address for mail objects.
    fn entry_name(&self, kind: EntryKind, dn: &Dn, attrs: &Attributes) -> Result<String, CoreError> {
        let layout = self.layout();
        match kind {
            EntryKind::Account | EntryKind::Alias | EntryKind::StaticGroup => {
                layout.address_from_location(dn, None)
            }
            EntryKind::DynamicGroup => layout.address_from_location(dn, Some(schema::CN)),
            EntryKind::DynamicGroupUnit => Ok(dn.to_string()),
            EntryKind::Domain => Ok(attrs.get_one(schema::DOMAIN_NAME).map_or_else(
                || {
                    dn.rdns()
                        .iter()
                        .map(dirprov_api::Rdn::value)
                        .collect::<Vec<_>>()
                        .join(".")
                },
                str::to_lowercase,
            )),
            EntryKind::Cos | EntryKind::Server | EntryKind::UcService => dn
                .first()
                .map(|rdn| rdn.value().to_owned())
                .ok_or_else(|| CoreError::Internal("configuration entry at the root".into())),
        }
    }

    /// Fetch and materialize the entry at `dn`, bypassing the caches.
    pub(crate) fn load(&self, dn: &Dn) -> Result<Option<Arc<Entry>>, CoreError> {
        match self.dir().get(dn, Routing::PreferMaster)? {
            Some(attrs) => Ok(Some(self.materialize(dn.clone(), attrs)?)),
            None => Ok(None),
        }
    }

    /// The canonical instance for a freshly read entry: the cached one if
    /// present, otherwise `entry`, which becomes canonical.
    pub(crate) fn adopt(&self, entry: Arc<Entry>) -> Arc<Entry> {
        let caches = self.caches();
        if entry.kind() == EntryKind::Domain {
            if let crate::cache::DomainLookup::Hit(cached) = caches.domains.lookup_id(entry.id()) {
                return cached;
            }
            caches.domains.put(&entry);
            return entry;
        }
        let Some(cache) = caches.for_kind(entry.kind()) else {
            return entry;
        };
        if let Some(cached) = cache.get_by_id(entry.id()) {
            return cached;
        }
        cache.put(&entry);
        entry
    }

    /// Run a search, treating a missing base as an empty result.
    pub(crate) fn search_hits(&self, base: &Dn, filter: Filter) -> Result<Vec<SearchHit>, CoreError> {
        let request = SearchRequest::subtree(base.clone(), filter)
            .with_page_size(self.config().search_page_size);
        match self.dir().search_all(&request) {
            Ok(hits) => {
                trace!(base = %base, filter = %request.filter, hits = hits.len(), "searched");
                Ok(hits)
            }
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Search several roots and return canonical instances, deduplicated
    /// by id. Entries that cannot be materialized are skipped.
    pub(crate) fn search_entries(
        &self,
        roots: &[Dn],
        filter: &Filter,
    ) -> Result<Vec<Arc<Entry>>, CoreError> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for root in roots {
            for hit in self.search_hits(root, filter.clone())? {
                match self.materialize(hit.dn, hit.attrs) {
                    Ok(entry) => {
                        if seen.insert(entry.id().clone()) {
                            found.push(self.adopt(entry));
                        }
                    }
                    Err(e) => debug!(error = %e, "skipping unreadable entry"),
                }
            }
        }
        Ok(found)
    }

    /// Resolve any entry by id: caches first, then one directory search.
    pub(crate) fn find_entry_by_id(&self, id: &EntryId) -> Result<Option<Arc<Entry>>, CoreError> {
        let caches = self.caches();
        let cached = caches
            .accounts
            .get_by_id(id)
            .or_else(|| caches.groups.get_by_id(id))
            .or_else(|| match caches.domains.lookup_id(id) {
                crate::cache::DomainLookup::Hit(entry) => Some(entry),
                _ => None,
            });
        if cached.is_some() {
            return Ok(cached);
        }
        let filter = Filter::eq(schema::ENTRY_ID, id.to_string());
        Ok(self.search_entries(&[Dn::root()], &filter)?.into_iter().next())
    }

    /// The mail object (account, alias, static or dynamic group) named
    /// `address`, without following aliases.
    pub(crate) fn find_by_address(&self, address: &Address) -> Result<Option<Arc<Entry>>, CoreError> {
        let caches = self.caches();
        if let Some(entry) = caches
            .accounts
            .get_by_name(address.as_str())
            .or_else(|| caches.groups.get_by_name(address.as_str()))
        {
            return Ok(Some(entry));
        }

        let layout = self.layout();
        for kind in [EntryKind::Account, EntryKind::DynamicGroup] {
            let dn = layout.location_for(kind, address.local(), Some(address.domain()))?;
            if let Some(entry) = self.load(&dn)? {
                return Ok(Some(self.adopt(entry)));
            }
        }
        Ok(None)
    }

    /// Dynamic group external units listing `address`.
    pub(crate) fn external_units_listing(&self, addresses: &[String]) -> Result<Vec<SearchHit>, CoreError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::and([
            Filter::eq(schema::OBJECT_CLASS, schema::OC_DYNAMIC_GROUP_UNIT),
            Filter::any_of(schema::MAIL_FORWARDING_ADDRESS, addresses.iter().cloned()),
        ]);
        self.search_hits(&Dn::root(), filter)
    }

    /// Whether `address` names any object or is a free external member
    /// of a dynamic group.
    pub(crate) fn address_in_use(&self, address: &Address) -> Result<bool, CoreError> {
        if self.find_by_address(address)?.is_some() {
            return Ok(true);
        }
        Ok(!self
            .external_units_listing(&[address.to_string()])?
            .is_empty())
    }

    // ── Writing entries ─────────────────────────────────────────────

    /// Attributes every new entry starts with.
    pub(crate) fn base_attrs(kind: EntryKind, id: &EntryId) -> Attributes {
        Attributes::new()
            .with(schema::OBJECT_CLASS, kind.object_class())
            .with(schema::ENTRY_ID, id.to_string())
    }

    pub(crate) fn create_entry(
        &self,
        kind: EntryKind,
        dn: &Dn,
        mut attrs: Attributes,
    ) -> Result<(), CoreError> {
        self.inner.hooks.before_create(kind, dn, &mut attrs)?;
        self.dir().create(dn, attrs)?;
        debug!(%kind, dn = %dn, "entry created");
        Ok(())
    }

    /// Create an entry and return its canonical live instance.
    pub(crate) fn create_and_load(
        &self,
        kind: EntryKind,
        dn: &Dn,
        attrs: Attributes,
    ) -> Result<Arc<Entry>, CoreError> {
        self.create_entry(kind, dn, attrs)?;
        let entry = self
            .load(dn)?
            .ok_or_else(|| CoreError::Internal(format!("{dn} vanished after create")))?;
        Ok(self.adopt(entry))
    }

    /// Modify an entry and refresh the instance in place.
    pub(crate) fn modify_entry(&self, entry: &Arc<Entry>, mods: &[Modification]) -> Result<(), CoreError> {
        let dn = entry.dn();
        self.inner.hooks.before_modify(entry.kind(), &dn, mods)?;
        self.dir().modify(&dn, mods)?;
        self.reload(entry, &dn)
    }

    /// Modify an entry known only by location (units, unloaded entries).
    pub(crate) fn modify_dn(&self, kind: EntryKind, dn: &Dn, mods: &[Modification]) -> Result<(), CoreError> {
        self.inner.hooks.before_modify(kind, dn, mods)?;
        self.dir().modify(dn, mods)?;
        Ok(())
    }

    /// Re-read `entry` from `dn` and refresh it in place.
    ///
    /// The caches are then reconciled: the canonical instance is re-keyed,
    /// a stale canonical instance of the same id is evicted.
    pub(crate) fn reload(&self, entry: &Arc<Entry>, dn: &Dn) -> Result<(), CoreError> {
        let Some(attrs) = self.dir().get(dn, Routing::PreferMaster)? else {
            self.uncache(entry);
            return Err(CoreError::not_found(&entry.kind().to_string(), entry.name()));
        };
        let name = self.entry_name(entry.kind(), dn, &attrs)?;
        entry.refresh(name, dn.clone(), attrs);
        self.recache(entry);
        Ok(())
    }

    pub(crate) fn delete_entry(&self, entry: &Entry) -> Result<(), CoreError> {
        self.dir().delete(&entry.dn())?;
        self.uncache(entry);
        debug!(kind = %entry.kind(), name = %entry.name(), "entry deleted");
        Ok(())
    }

    pub(crate) fn recache(&self, entry: &Arc<Entry>) {
        let caches = self.caches();
        if entry.kind() == EntryKind::Domain {
            caches.domains.replace(entry);
        } else if let Some(cache) = caches.for_kind(entry.kind()) {
            cache.replace(entry);
        }
    }

    pub(crate) fn uncache(&self, entry: &Entry) {
        let caches = self.caches();
        if entry.kind() == EntryKind::Domain {
            caches.domains.remove(entry);
        } else if let Some(cache) = caches.for_kind(entry.kind()) {
            cache.remove(entry);
        }
    }

    /// Cached domain lookup by name with negative caching.
    pub(crate) fn domain_entry(&self, name: &str) -> Result<Option<Arc<Entry>>, CoreError> {
        self.domain_entry_by(KeyKind::Name, name)
    }

    pub(crate) fn auth_lock(&self, id: &EntryId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.inner
                .auth_locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    pub(crate) fn release_auth_lock(&self, id: &EntryId) {
        self.inner.auth_locks.remove(id);
    }

    pub(crate) fn verifier(&self) -> &dyn PasswordVerifier {
        self.inner.verifier.as_ref()
    }
}

impl std::fmt::Debug for Provisioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioning")
            .field("layout", &self.inner.layout)
            .field("cache_mode", &self.inner.config.cache_mode)
            .finish_non_exhaustive()
    }
}
