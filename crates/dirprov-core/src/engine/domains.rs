// ── Domains ──

use std::sync::Arc;

use dirprov_api::{Attributes, Dn, Filter, Modification};
use tracing::info;

use super::Provisioning;
use crate::cache::{DomainLookup, KeyKind};
use crate::error::CoreError;
use crate::model::{
    Domain, DomainStatus, DomainType, Entry, EntryId, EntryKind, Nameable, validate_domain_name,
};
use crate::schema;

impl Provisioning {
    /// Create a domain with its account and group containers. Missing
    /// parent `dc` entries are created; an existing plain `dc` entry at the
    /// domain's location (left by a subdomain) is promoted in place.
    pub fn create_domain(
        &self,
        name: &str,
        domain_type: DomainType,
        attrs: Attributes,
    ) -> Result<Domain, CoreError> {
        let name = name.trim().to_lowercase();
        validate_domain_name(&name)?;
        if self.domain_entry(&name)?.is_some() {
            return Err(CoreError::collision("domain", name));
        }
        if domain_type == DomainType::Alias {
            let target = attrs
                .get_one(schema::DOMAIN_ALIAS_TARGET_ID)
                .ok_or_else(|| CoreError::validation("an alias domain needs a target domain id"))?;
            self.get_domain_by_id(&EntryId::from(target))?;
        }

        let layout = self.layout();
        let dn = layout.domain_dn(&name)?;
        self.ensure_dc_parents(&dn)?;

        let id = EntryId::generate();
        let mut domain_attrs = attrs;
        domain_attrs.remove(schema::ENTRY_ID);
        domain_attrs.set(schema::DOMAIN_NAME, [name.as_str()]);
        domain_attrs.set(schema::DOMAIN_TYPE, [domain_type.to_string()]);
        if !domain_attrs.contains(schema::DOMAIN_STATUS) {
            domain_attrs.set(schema::DOMAIN_STATUS, [DomainStatus::Active.to_string()]);
        }

        if self.dir().exists(&dn, dirprov_api::Routing::PreferMaster)? {
            let mut mods = vec![
                Modification::add(
                    schema::OBJECT_CLASS,
                    [schema::OC_DOMAIN, schema::OC_DC_OBJECT],
                ),
                Modification::add(schema::ENTRY_ID, [id.to_string()]),
            ];
            mods.extend(
                domain_attrs
                    .iter()
                    .map(|(attr, values)| Modification::replace(attr, values.iter().cloned())),
            );
            self.modify_dn(EntryKind::Domain, &dn, &mods)?;
        } else {
            let mut full = Self::base_attrs(EntryKind::Domain, &id);
            full.add_values(schema::OBJECT_CLASS, [schema::OC_DC_OBJECT]);
            for (attr, values) in domain_attrs.iter() {
                full.set(attr, values.iter().cloned());
            }
            self.create_entry(EntryKind::Domain, &dn, full)?;
        }

        if domain_type == DomainType::Local {
            self.ensure_container(&layout.account_base(&name)?)?;
            self.ensure_container(&layout.group_base(&name)?)?;
        }

        let entry = self
            .load(&dn)?
            .ok_or_else(|| CoreError::Internal(format!("domain {name} vanished after create")))?;
        self.caches().domains.put(&entry);
        info!(domain = %name, %domain_type, "domain created");
        Domain::from_entry(entry)
    }

    /// Convenience for an alias domain forwarding to `target`.
    pub fn create_alias_domain(&self, name: &str, target: &str) -> Result<Domain, CoreError> {
        let target = self.get_domain_by_name(target)?;
        self.create_domain(
            name,
            DomainType::Alias,
            Attributes::new().with(schema::DOMAIN_ALIAS_TARGET_ID, target.id().to_string()),
        )
    }

    pub fn get_domain_by_name(&self, name: &str) -> Result<Domain, CoreError> {
        self.domain_entry(name)?
            .map(Domain::from_entry)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("domain", name))
    }

    pub fn get_domain_by_virtual_hostname(&self, hostname: &str) -> Result<Domain, CoreError> {
        self.domain_entry_by(KeyKind::VirtualHostname, hostname)?
            .map(Domain::from_entry)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("domain", hostname))
    }

    pub fn get_domain_by_id(&self, id: &EntryId) -> Result<Domain, CoreError> {
        if let DomainLookup::Hit(entry) = self.caches().domains.lookup_id(id) {
            return Domain::from_entry(entry);
        }
        let filter = Filter::and([
            Filter::eq(schema::OBJECT_CLASS, schema::OC_DOMAIN),
            Filter::eq(schema::ENTRY_ID, id.to_string()),
        ]);
        self.search_entries(&[Dn::root()], &filter)?
            .into_iter()
            .next()
            .map(Domain::from_entry)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("domain", id.to_string()))
    }

    /// Every domain, sorted by name.
    pub fn list_domains(&self) -> Result<Vec<Domain>, CoreError> {
        let filter = Filter::eq(schema::OBJECT_CLASS, schema::OC_DOMAIN);
        let mut domains = self
            .search_entries(&[Dn::root()], &filter)?
            .into_iter()
            .map(Domain::from_entry)
            .collect::<Result<Vec<_>, _>>()?;
        domains.sort_by_key(|d| d.name());
        Ok(domains)
    }

    /// Delete an empty domain and its containers.
    pub fn delete_domain(&self, domain: &Domain) -> Result<(), CoreError> {
        let name = domain.name();
        let dn = domain.entry().dn();
        let filter = Filter::or(
            [
                EntryKind::Account,
                EntryKind::Alias,
                EntryKind::StaticGroup,
                EntryKind::DynamicGroup,
                EntryKind::Domain,
            ]
            .map(|k| Filter::eq(schema::OBJECT_CLASS, k.object_class())),
        );
        let occupied = self
            .search_hits(&dn, filter)?
            .into_iter()
            .any(|hit| hit.dn != dn);
        if occupied {
            return Err(CoreError::validation(format!(
                "domain {name} still contains accounts, groups, aliases or subdomains"
            )));
        }

        let layout = self.layout();
        for container in [layout.group_base(&name)?, layout.account_base(&name)?] {
            match self.dir().delete(&container) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.delete_entry(domain.entry())?;
        self.caches().authorization.clear();
        info!(domain = %name, "domain deleted");
        Ok(())
    }

    pub fn set_domain_status(&self, domain: &Domain, status: DomainStatus) -> Result<(), CoreError> {
        self.modify_entry(
            domain.entry(),
            &[Modification::replace(schema::DOMAIN_STATUS, [status.to_string()])],
        )
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Cached domain lookup; remembers absence.
    pub(crate) fn domain_entry_by(
        &self,
        kind: KeyKind,
        key: &str,
    ) -> Result<Option<Arc<Entry>>, CoreError> {
        let key = key.trim().to_lowercase();
        let cache = &self.caches().domains;
        match cache.lookup(kind, &key) {
            DomainLookup::Hit(entry) => return Ok(Some(entry)),
            DomainLookup::Negative => return Ok(None),
            DomainLookup::Miss => {}
        }

        let found = match kind {
            KeyKind::Name => {
                // A plain `dc` parent at the location is not a domain.
                let dn = self.layout().domain_dn(&key)?;
                match self.dir().get(&dn, dirprov_api::Routing::PreferMaster)? {
                    Some(attrs) if attrs.has_object_class(schema::OC_DOMAIN) => {
                        Some(self.materialize(dn, attrs)?)
                    }
                    _ => None,
                }
            }
            KeyKind::VirtualHostname | KeyKind::ForeignPrincipal => {
                let attr = if kind == KeyKind::VirtualHostname {
                    schema::VIRTUAL_HOSTNAME
                } else {
                    schema::FOREIGN_PRINCIPAL
                };
                let filter = Filter::and([
                    Filter::eq(schema::OBJECT_CLASS, schema::OC_DOMAIN),
                    Filter::eq(attr, key.as_str()),
                ]);
                self.search_entries(&[Dn::root()], &filter)?.into_iter().next()
            }
        };

        match found {
            Some(entry) => {
                let entry = self.adopt(entry);
                Ok(Some(entry))
            }
            None => {
                cache.put_negative(kind, &key);
                Ok(None)
            }
        }
    }

    /// The domain an address or object lives in, which must be local
    /// and not mid-rename.
    pub(crate) fn require_local_domain(&self, name: &str) -> Result<Domain, CoreError> {
        let domain = self.get_domain_by_name(name)?;
        if !domain.is_local() {
            return Err(CoreError::validation(format!(
                "domain {name} is an alias domain"
            )));
        }
        if domain.status() == DomainStatus::Shutdown {
            return Err(CoreError::unsupported(
                "provision",
                format!("domain {name} is being renamed"),
            ));
        }
        Ok(domain)
    }

    /// Create every missing `dc` ancestor of `dn`, top-down.
    pub(crate) fn ensure_dc_parents(&self, dn: &Dn) -> Result<(), CoreError> {
        let mut ancestors = Vec::new();
        let mut cursor = dn.parent();
        while let Some(parent) = cursor {
            if parent.is_root() {
                break;
            }
            cursor = parent.parent();
            ancestors.push(parent);
        }
        for parent in ancestors.into_iter().rev() {
            if self.dir().exists(&parent, dirprov_api::Routing::PreferMaster)? {
                continue;
            }
            let attrs = Attributes::new().with(schema::OBJECT_CLASS, schema::OC_DC_OBJECT);
            match self.dir().create(&parent, attrs) {
                Ok(()) => {}
                Err(e) if e.is_already_exists() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Create a plain container entry unless it exists.
    pub(crate) fn ensure_container(&self, dn: &Dn) -> Result<(), CoreError> {
        let attrs = Attributes::new().with(schema::OBJECT_CLASS, schema::OC_CONTAINER);
        match self.dir().create(dn, attrs) {
            Ok(()) => Ok(()),
            Err(e) if e.is_already_exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
