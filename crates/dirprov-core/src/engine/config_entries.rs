// ── Configuration entries ──
//
// Classes of service, servers and UC services. Each lives under a fixed
// container below the configuration root and is named by `cn`.

use std::sync::Arc;

use dirprov_api::{Attributes, Filter};
use tracing::info;

use super::Provisioning;
use super::accounts::{collision_as, merge_user_attrs};
use crate::cache::EntryCache;
use crate::error::CoreError;
use crate::model::{Cos, Entry, EntryId, EntryKind, Nameable, Server};
use crate::schema;

impl Provisioning {
    // ── Classes of service ──────────────────────────────────────────

    pub fn create_cos(&self, name: &str, attrs: Attributes) -> Result<Cos, CoreError> {
        Cos::from_entry(self.create_config_entry(EntryKind::Cos, name, attrs)?)
    }

    pub fn get_cos_by_name(&self, name: &str) -> Result<Cos, CoreError> {
        Cos::from_entry(self.config_entry_by_name(EntryKind::Cos, name)?)
    }

    pub fn get_cos_by_id(&self, id: &EntryId) -> Result<Cos, CoreError> {
        Cos::from_entry(self.config_entry_by_id(EntryKind::Cos, id)?)
    }

    pub fn list_cos(&self) -> Result<Vec<Cos>, CoreError> {
        self.list_config_entries(EntryKind::Cos)?
            .into_iter()
            .map(Cos::from_entry)
            .collect()
    }

    pub fn delete_cos(&self, cos: &Cos) -> Result<(), CoreError> {
        self.delete_entry(cos.entry())?;
        info!(cos = %cos.name(), "cos deleted");
        Ok(())
    }

    /// Rename a class of service. Accounts reference it by id, so nothing
    /// else changes.
    pub fn rename_cos(&self, cos: &Cos, new_name: &str) -> Result<(), CoreError> {
        let new_name = validate_config_name(new_name)?;
        let old_dn = cos.entry().dn();
        let new_dn = self.layout().location_for(EntryKind::Cos, &new_name, None)?;
        if old_dn == new_dn {
            return Ok(());
        }
        self.dir()
            .rename(&old_dn, &new_dn)
            .map_err(|e| collision_as(e.into(), "cos", &new_name))?;
        self.reload(cos.entry(), &new_dn)?;
        info!(from = %old_dn, to = %new_dn, "cos renamed");
        Ok(())
    }

    // ── Servers and UC services ─────────────────────────────────────

    pub fn create_server(&self, name: &str, attrs: Attributes) -> Result<Server, CoreError> {
        Server::from_entry(self.create_config_entry(EntryKind::Server, name, attrs)?)
    }

    pub fn create_uc_service(&self, name: &str, attrs: Attributes) -> Result<Server, CoreError> {
        Server::from_entry(self.create_config_entry(EntryKind::UcService, name, attrs)?)
    }

    pub fn get_server_by_name(&self, name: &str) -> Result<Server, CoreError> {
        Server::from_entry(self.config_entry_by_name(EntryKind::Server, name)?)
    }

    pub fn get_uc_service_by_name(&self, name: &str) -> Result<Server, CoreError> {
        Server::from_entry(self.config_entry_by_name(EntryKind::UcService, name)?)
    }

    pub fn get_server_by_id(&self, id: &EntryId) -> Result<Server, CoreError> {
        Server::from_entry(self.config_entry_by_id(EntryKind::Server, id)?)
    }

    pub fn list_servers(&self) -> Result<Vec<Server>, CoreError> {
        self.list_config_entries(EntryKind::Server)?
            .into_iter()
            .map(Server::from_entry)
            .collect()
    }

    pub fn delete_server(&self, server: &Server) -> Result<(), CoreError> {
        self.delete_entry(server.entry())?;
        info!(server = %server.name(), "server deleted");
        Ok(())
    }

    // ── Shared plumbing ─────────────────────────────────────────────

    fn config_cache(&self, kind: EntryKind) -> Result<&EntryCache, CoreError> {
        self.caches()
            .for_kind(kind)
            .ok_or_else(|| CoreError::Internal(format!("{kind} is not a configuration kind")))
    }

    fn create_config_entry(
        &self,
        kind: EntryKind,
        name: &str,
        attrs: Attributes,
    ) -> Result<Arc<Entry>, CoreError> {
        let name = validate_config_name(name)?;
        let layout = self.layout();
        let dn = layout.location_for(kind, &name, None)?;
        if let Some(container) = dn.parent() {
            self.ensure_container(&layout.config_dn())?;
            self.ensure_container(&container)?;
        }

        let id = EntryId::generate();
        let mut full = Self::base_attrs(kind, &id);
        merge_user_attrs(&mut full, &attrs);
        let entry = self
            .create_and_load(kind, &dn, full)
            .map_err(|e| collision_as(e, &kind.to_string(), &name))?;
        info!(%kind, name = %name, "configuration entry created");
        Ok(entry)
    }

    fn config_entry_by_name(&self, kind: EntryKind, name: &str) -> Result<Arc<Entry>, CoreError> {
        let name = name.trim().to_lowercase();
        // Servers and UC services share a cache; the kind check keeps
        // them apart.
        if let Some(entry) = self
            .config_cache(kind)?
            .get_by_name(&name)
            .filter(|e| e.kind() == kind)
        {
            return Ok(entry);
        }
        let dn = self.layout().location_for(kind, &name, None)?;
        self.load(&dn)?
            .filter(|e| e.kind() == kind)
            .map(|e| self.adopt(e))
            .ok_or_else(|| CoreError::not_found(&kind.to_string(), name))
    }

    fn config_entry_by_id(&self, kind: EntryKind, id: &EntryId) -> Result<Arc<Entry>, CoreError> {
        if let Some(entry) = self.config_cache(kind)?.get_by_id(id).filter(|e| e.kind() == kind) {
            return Ok(entry);
        }
        let filter = Filter::and([
            Filter::eq(schema::OBJECT_CLASS, kind.object_class()),
            Filter::eq(schema::ENTRY_ID, id.to_string()),
        ]);
        let roots = self.layout().search_roots_for(&[kind], None)?;
        self.search_entries(&roots, &filter)?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found(&kind.to_string(), id.to_string()))
    }

    fn list_config_entries(&self, kind: EntryKind) -> Result<Vec<Arc<Entry>>, CoreError> {
        let filter = Filter::eq(schema::OBJECT_CLASS, kind.object_class());
        let roots = self.layout().search_roots_for(&[kind], None)?;
        let mut entries = self.search_entries(&roots, &filter)?;
        entries.sort_by_key(|e| e.name());
        Ok(entries)
    }
}

fn validate_config_name(name: &str) -> Result<String, CoreError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(CoreError::validation("name cannot be empty"));
    }
    if name.contains(['@', ',', '=']) {
        return Err(CoreError::validation(format!(
            "'{name}' contains a reserved character"
        )));
    }
    Ok(name)
}
