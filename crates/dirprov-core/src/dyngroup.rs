// ── Dynamic group composite ──
//
// A dynamic group is three entries: the main entry named by `cn` under
// the domain's group container, and two child units. Internal members
// are accounts or static groups carrying the group's id in `memberOf`;
// the internal unit is a fixed marker. External members are plain
// addresses listed on the external unit.
//
// Custom-filter groups have only the main entry. Their membership is
// whatever their filter selects, so member edits are refused.

use std::sync::Arc;

use dirprov_api::{Attributes, Dn, Filter, Modification, Routing};
use tracing::{debug, info, warn};

use crate::cascade::{CascadeAction, CascadeReport};
use crate::engine::{Provisioning, collision_as, merge_user_attrs};
use crate::error::CoreError;
use crate::model::{
    Address, CacheDataKind, CachedData, Entry, EntryId, EntryKind, Group, GroupMember, Nameable,
};
use crate::naming::Unit;
use crate::schema;

impl Provisioning {
    /// Create a dynamic group at `address`.
    ///
    /// Without `custom_filter` the group is system managed: its member URL
    /// selects entries carrying its id, and both units are created. If a
    /// unit cannot be created, everything created so far is removed again.
    pub fn create_dynamic_group(
        &self,
        address: &str,
        custom_filter: Option<&str>,
        attrs: Attributes,
    ) -> Result<Group, CoreError> {
        let address = Address::parse(address)?;
        self.require_local_domain(address.domain())?;
        if self.address_in_use(&address)? {
            return Err(CoreError::collision("address", address.as_str()));
        }
        let custom = match custom_filter {
            Some(raw) => Some(Filter::parse(raw)?),
            None => None,
        };

        let layout = self.layout();
        let dn = layout.location_for(EntryKind::DynamicGroup, address.local(), Some(address.domain()))?;
        if let Some(container) = dn.parent() {
            self.ensure_container(&container)?;
        }

        let id = EntryId::generate();
        let member_url = custom
            .clone()
            .unwrap_or_else(|| Filter::eq(schema::MEMBER_OF, id.to_string()));
        let mut full = Self::base_attrs(EntryKind::DynamicGroup, &id);
        merge_user_attrs(&mut full, &attrs);
        full.set(schema::MAIL, [address.as_str()]);
        full.set(schema::MEMBER_URL, [member_url.to_string()]);
        full.set(schema::IS_CUSTOM_FILTER, [schema::bool_value(custom.is_some())]);

        let entry = self
            .create_and_load(EntryKind::DynamicGroup, &dn, full)
            .map_err(|e| collision_as(e, "group", address.as_str()))?;

        if custom.is_none() {
            if let Err(e) = self.create_units(&dn) {
                warn!(group = %address, error = %e, "unit creation failed, rolling back");
                self.remove_units(&dn);
                if let Err(cleanup) = self.delete_entry(&entry) {
                    warn!(group = %address, error = %cleanup, "rollback left the group entry behind");
                }
                return Err(e);
            }
        }

        info!(group = %address, custom = custom.is_some(), "dynamic group created");
        Group::from_entry(entry)
    }

    fn create_units(&self, group_dn: &Dn) -> Result<(), CoreError> {
        for unit in [Unit::Internal, Unit::External] {
            let dn = self.layout().unit_location(group_dn, unit);
            let attrs = Self::base_attrs(EntryKind::DynamicGroupUnit, &EntryId::generate());
            self.create_entry(EntryKind::DynamicGroupUnit, &dn, attrs)?;
        }
        Ok(())
    }

    /// Delete both units, tolerating ones that are already gone.
    fn remove_units(&self, group_dn: &Dn) {
        for unit in [Unit::Internal, Unit::External] {
            let dn = self.layout().unit_location(group_dn, unit);
            match self.dir().delete(&dn) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(unit = %dn, error = %e, "could not delete group unit"),
            }
        }
    }

    // ── Members ─────────────────────────────────────────────────────

    /// Add members to a system-managed dynamic group.
    ///
    /// Addresses of accounts and static groups become internal members;
    /// anything else is listed on the external unit. The call is rejected
    /// as a whole when an external address names an existing object, such
    /// as a dangling alias.
    pub(crate) fn add_dynamic_group_members(
        &self,
        group: &Group,
        members: &[String],
    ) -> Result<(), CoreError> {
        require_managed(group, "add members")?;
        let group_id = group.id().to_string();

        let mut internal: Vec<Arc<Entry>> = Vec::new();
        let mut external: Vec<Address> = Vec::new();
        for raw in members {
            let address = Address::parse(raw)?;
            if address.as_str() == group.name() {
                return Err(CoreError::validation(format!(
                    "group {} cannot contain itself",
                    group.name()
                )));
            }
            match self.resolve_subject(&address)? {
                Some(subject) if subject.kind().carries_back_reference() => {
                    if subject.has_value(schema::MEMBER_OF, &group_id) {
                        debug!(member = %address, "already an internal member");
                        continue;
                    }
                    if !internal.iter().any(|e| e.id() == subject.id()) {
                        internal.push(subject);
                    }
                }
                Some(subject) => {
                    return Err(CoreError::validation(format!(
                        "{address} is a {} and cannot join a dynamic group",
                        subject.kind()
                    )));
                }
                None => {
                    if !external.contains(&address) {
                        external.push(address);
                    }
                }
            }
        }

        for address in &external {
            if self.find_by_address(address)?.is_some() {
                return Err(CoreError::collision("address", address.as_str()));
            }
        }

        let nested_group = internal.iter().any(|e| e.kind().is_group());
        for subject in &internal {
            self.modify_entry(subject, &[Modification::add(schema::MEMBER_OF, [group_id.as_str()])])?;
        }
        if !external.is_empty() {
            let unit = self.layout().unit_location(&group.entry().dn(), Unit::External);
            let values: Vec<String> = external.iter().map(ToString::to_string).collect();
            self.modify_dn(
                EntryKind::DynamicGroupUnit,
                &unit,
                &[Modification::add(schema::MAIL_FORWARDING_ADDRESS, values)],
            )?;
        }

        self.after_dynamic_member_change(group, nested_group);
        info!(
            group = %group.name(),
            internal = internal.len(),
            external = external.len(),
            "dynamic group members added"
        );
        Ok(())
    }

    /// Remove members from a system-managed dynamic group.
    ///
    /// Unparseable or unresolvable values are removed from the external
    /// list as given, so corrupted lists can be cleaned up. Values that
    /// are not members are ignored.
    pub(crate) fn remove_dynamic_group_members(
        &self,
        group: &Group,
        members: &[String],
    ) -> Result<(), CoreError> {
        require_managed(group, "remove members")?;
        let group_id = group.id().to_string();

        let mut internal: Vec<Arc<Entry>> = Vec::new();
        let mut external: Vec<String> = Vec::new();
        for raw in members {
            let value = raw.trim().to_lowercase();
            let subject = match Address::parse(&value) {
                Ok(address) => self.resolve_subject(&address)?,
                Err(_) => None,
            };
            match subject {
                Some(subject) if subject.has_value(schema::MEMBER_OF, &group_id) => {
                    if !internal.iter().any(|e| e.id() == subject.id()) {
                        internal.push(subject);
                    }
                }
                _ => {
                    if !external.contains(&value) {
                        external.push(value);
                    }
                }
            }
        }

        let nested_group = internal.iter().any(|e| e.kind().is_group());
        for subject in &internal {
            self.modify_entry(subject, &[Modification::delete(schema::MEMBER_OF, [group_id.as_str()])])?;
        }

        let unit = self.layout().unit_location(&group.entry().dn(), Unit::External);
        let listed: Vec<String> = self
            .dir()
            .get(&unit, Routing::PreferMaster)?
            .map(|attrs| {
                attrs
                    .get_all(schema::MAIL_FORWARDING_ADDRESS)
                    .iter()
                    .filter(|m| external.iter().any(|x| x.eq_ignore_ascii_case(m)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if !listed.is_empty() {
            self.modify_dn(
                EntryKind::DynamicGroupUnit,
                &unit,
                &[Modification::delete(schema::MAIL_FORWARDING_ADDRESS, listed.iter().cloned())],
            )?;
        }

        self.after_dynamic_member_change(group, nested_group);
        info!(
            group = %group.name(),
            internal = internal.len(),
            external = listed.len(),
            "dynamic group members removed"
        );
        Ok(())
    }

    /// Member addresses of a dynamic group, sorted.
    ///
    /// A managed group's members are the entries carrying its id plus the
    /// external list. A custom group's members are the accounts its filter
    /// selects.
    pub(crate) fn dynamic_group_members(&self, group: &Group) -> Result<Vec<String>, CoreError> {
        let entry = group.entry();
        if let Some(CachedData::Members(cached)) = entry.cached(CacheDataKind::DynamicMembers) {
            return Ok(cached.as_ref().clone());
        }

        let mut members: Vec<String> = if group.is_custom() {
            let raw = group.member_url().unwrap_or_default();
            let filter = Filter::and([
                Filter::eq(schema::OBJECT_CLASS, schema::OC_ACCOUNT),
                Filter::parse(&raw)?,
            ]);
            self.search_entries(&[Dn::root()], &filter)?
                .iter()
                .map(|e| e.name())
                .collect()
        } else {
            let filter = Filter::eq(schema::MEMBER_OF, group.id().to_string());
            let mut names: Vec<String> = self
                .search_entries(&[Dn::root()], &filter)?
                .iter()
                .filter(|e| e.kind().carries_back_reference())
                .map(|e| e.name())
                .collect();
            let unit = self.layout().unit_location(&entry.dn(), Unit::External);
            if let Some(attrs) = self.dir().get(&unit, Routing::PreferMaster)? {
                names.extend(
                    attrs
                        .get_all(schema::MAIL_FORWARDING_ADDRESS)
                        .iter()
                        .map(|m| m.to_lowercase()),
                );
            }
            names
        };
        members.sort();
        members.dedup();

        self.remember(
            entry,
            CacheDataKind::DynamicMembers,
            CachedData::Members(Arc::new(members.clone())),
        );
        Ok(members)
    }

    // ── Delete ──────────────────────────────────────────────────────

    /// Delete a dynamic group: units, then the main entry, then the
    /// back-reference on every former internal member.
    pub(crate) fn delete_dynamic_group(&self, group: &Group) -> Result<CascadeReport, CoreError> {
        let mut report = CascadeReport::new();
        self.remove_owned_aliases(group.entry(), &mut report);
        self.strip_from_static_groups(&group.member_addresses(), &mut report);

        let dn = group.entry().dn();
        for unit in [Unit::Internal, Unit::External] {
            let unit_dn = self.layout().unit_location(&dn, unit);
            match self.dir().delete(&unit_dn) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.delete_entry(group.entry())?;

        let group_id = group.id().to_string();
        let filter = Filter::eq(schema::MEMBER_OF, group_id.as_str());
        match self.search_entries(&[Dn::root()], &filter) {
            Ok(holders) => {
                for holder in holders {
                    let result =
                        self.modify_entry(&holder, &[Modification::delete(schema::MEMBER_OF, [group_id.as_str()])]);
                    report.record(CascadeAction::StripBackReference, holder.name(), result);
                }
            }
            Err(e) => report.record(CascadeAction::StripBackReference, group.name(), Err(e)),
        }

        self.caches().invalidate_all_memberships();
        self.caches().authorization.clear();
        info!(group = %group.name(), cascade_failures = report.failed_count(), "dynamic group deleted");
        Ok(report)
    }

    fn after_dynamic_member_change(&self, group: &Group, nested_group: bool) {
        group.entry().invalidate(&[CacheDataKind::DynamicMembers]);
        if nested_group {
            self.caches().invalidate_all_memberships();
        }
        self.caches().authorization.clear();
    }
}

fn require_managed(group: &Group, operation: &str) -> Result<(), CoreError> {
    if group.is_custom() {
        return Err(CoreError::unsupported(
            operation,
            format!("{} is defined by a custom filter", group.name()),
        ));
    }
    Ok(())
}
