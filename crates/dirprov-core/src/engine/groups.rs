// ── Static groups ──
//
// Members of a static group are a flat list of addresses on the group
// entry itself. Dynamic groups share the lookup paths here and delegate
// their member operations to the composite in `dyngroup`.

use std::collections::HashSet;
use std::sync::Arc;

use dirprov_api::{Attributes, Dn, Filter, Modification};
use tracing::{debug, info};

use super::Provisioning;
use super::accounts::{collision_as, merge_user_attrs};
use crate::cascade::{CascadeAction, CascadeReport};
use crate::error::CoreError;
use crate::model::{
    Address, CacheDataKind, Entry, EntryId, EntryKind, Group, GroupMember, Nameable,
};
use crate::schema;

impl Provisioning {
    pub fn create_group(&self, address: &str, attrs: Attributes) -> Result<Group, CoreError> {
        let address = Address::parse(address)?;
        self.require_local_domain(address.domain())?;
        if self.address_in_use(&address)? {
            return Err(CoreError::collision("address", address.as_str()));
        }

        let dn = self
            .layout()
            .location_for(EntryKind::StaticGroup, address.local(), Some(address.domain()))?;
        let id = EntryId::generate();
        let mut full = Self::base_attrs(EntryKind::StaticGroup, &id);
        merge_user_attrs(&mut full, &attrs);
        full.set(schema::MAIL, [address.as_str()]);

        let entry = self
            .create_and_load(EntryKind::StaticGroup, &dn, full)
            .map_err(|e| collision_as(e, "group", address.as_str()))?;
        info!(group = %address, "static group created");
        Group::from_entry(entry)
    }

    // ── Lookups ─────────────────────────────────────────────────────

    /// Static or dynamic group by address, following aliases.
    pub fn get_group_by_name(&self, name: &str) -> Result<Group, CoreError> {
        let address = Address::parse(name)?;
        self.resolve_subject(&address)?
            .filter(|e| e.kind().is_group())
            .map(Group::from_entry)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("group", name))
    }

    pub fn get_group_by_id(&self, id: &EntryId) -> Result<Group, CoreError> {
        self.group_entry_by_id(id)?
            .map(Group::from_entry)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("group", id.to_string()))
    }

    /// Static and dynamic groups of one domain (or all), sorted by name.
    pub fn list_groups(&self, domain: Option<&str>) -> Result<Vec<Group>, CoreError> {
        let roots = self
            .layout()
            .search_roots_for(&[EntryKind::StaticGroup, EntryKind::DynamicGroup], domain)?;
        let mut groups = self
            .search_entries(&roots, &group_filter())?
            .into_iter()
            .map(Group::from_entry)
            .collect::<Result<Vec<_>, _>>()?;
        groups.sort_by_key(|g| g.name());
        Ok(groups)
    }

    /// Member addresses of any group, sorted.
    pub fn group_members(&self, group: &Group) -> Result<Vec<String>, CoreError> {
        if group.is_dynamic() {
            return self.dynamic_group_members(group);
        }
        let mut members = group.static_members();
        members.sort();
        Ok(members)
    }

    pub(crate) fn group_entry_by_id(&self, id: &EntryId) -> Result<Option<Arc<Entry>>, CoreError> {
        if let Some(entry) = self.caches().groups.get_by_id(id) {
            return Ok(Some(entry));
        }
        let filter = Filter::and([group_filter(), Filter::eq(schema::ENTRY_ID, id.to_string())]);
        Ok(self.search_entries(&[Dn::root()], &filter)?.into_iter().next())
    }

    // ── Membership edits ────────────────────────────────────────────

    /// Add members to a static or dynamic group.
    pub fn add_group_members(&self, group: &Group, members: &[String]) -> Result<(), CoreError> {
        if group.is_dynamic() {
            return self.add_dynamic_group_members(group, members);
        }

        let mut to_add = Vec::new();
        for raw in members {
            let address = Address::parse(raw)?;
            if address.as_str() == group.name() {
                return Err(CoreError::validation(format!(
                    "group {} cannot contain itself",
                    group.name()
                )));
            }
            let present = group.entry().has_value(schema::MAIL_FORWARDING_ADDRESS, address.as_str());
            if !present && !to_add.contains(&address) {
                to_add.push(address);
            }
        }
        if to_add.is_empty() {
            debug!(group = %group.name(), "no new members");
            return Ok(());
        }

        let values: Vec<String> = to_add.iter().map(ToString::to_string).collect();
        self.modify_entry(
            group.entry(),
            &[Modification::add(schema::MAIL_FORWARDING_ADDRESS, values)],
        )?;
        self.invalidate_member_subjects(&to_add)?;
        self.caches().authorization.clear();
        info!(group = %group.name(), added = to_add.len(), "group members added");
        Ok(())
    }

    /// Remove members from a static or dynamic group. Every address must
    /// currently be listed on a static group.
    pub fn remove_group_members(&self, group: &Group, members: &[String]) -> Result<(), CoreError> {
        if group.is_dynamic() {
            return self.remove_dynamic_group_members(group, members);
        }

        let listed: HashSet<String> = group
            .static_members()
            .into_iter()
            .map(|m| m.to_lowercase())
            .collect();
        let mut to_remove = Vec::new();
        for raw in members {
            let value = raw.trim().to_lowercase();
            if !listed.contains(&value) {
                return Err(CoreError::not_found("member", format!("{value} in {}", group.name())));
            }
            if !to_remove.contains(&value) {
                to_remove.push(value);
            }
        }
        if to_remove.is_empty() {
            return Ok(());
        }

        self.modify_entry(
            group.entry(),
            &[Modification::delete(schema::MAIL_FORWARDING_ADDRESS, to_remove.iter().cloned())],
        )?;
        let parsed: Vec<Address> = to_remove.iter().filter_map(|m| Address::parse(m).ok()).collect();
        self.invalidate_member_subjects(&parsed)?;
        self.caches().authorization.clear();
        info!(group = %group.name(), removed = to_remove.len(), "group members removed");
        Ok(())
    }

    /// Delete a group. Its aliases go with it and its addresses are
    /// stripped from every static group listing them.
    pub fn delete_group(&self, group: &Group) -> Result<CascadeReport, CoreError> {
        if group.is_dynamic() {
            return self.delete_dynamic_group(group);
        }

        let mut report = CascadeReport::new();
        self.remove_owned_aliases(group.entry(), &mut report);
        self.strip_from_static_groups(&group.member_addresses(), &mut report);
        self.delete_entry(group.entry())?;

        self.caches().invalidate_all_memberships();
        self.caches().authorization.clear();
        info!(group = %group.name(), cascade_failures = report.failed_count(), "group deleted");
        Ok(report)
    }

    // ── Cascade helpers ─────────────────────────────────────────────

    /// Remove `addresses` from every static group listing any of them.
    pub(crate) fn strip_from_static_groups(&self, addresses: &[String], report: &mut CascadeReport) {
        if addresses.is_empty() {
            return;
        }
        let groups = match self.static_groups_listing(addresses) {
            Ok(groups) => groups,
            Err(e) => {
                report.record(CascadeAction::StripGroupMember, addresses.join(","), Err(e));
                return;
            }
        };
        for group in groups {
            let listed: Vec<String> = group
                .attr_values(schema::MAIL_FORWARDING_ADDRESS)
                .into_iter()
                .filter(|m| addresses.iter().any(|a| a.eq_ignore_ascii_case(m)))
                .collect();
            // An empty delete would drop the whole attribute.
            if listed.is_empty() {
                continue;
            }
            let result = self.modify_entry(
                &group,
                &[Modification::delete(schema::MAIL_FORWARDING_ADDRESS, listed)],
            );
            report.record(CascadeAction::StripGroupMember, group.name(), result);
        }
        self.caches().authorization.clear();
    }

    /// Static groups whose member list contains any of `addresses`,
    /// queried in batches.
    pub(crate) fn static_groups_listing(&self, addresses: &[String]) -> Result<Vec<Arc<Entry>>, CoreError> {
        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        let batch = self.config().membership_batch_size.max(1);
        for chunk in addresses.chunks(batch) {
            let filter = Filter::and([
                Filter::eq(schema::OBJECT_CLASS, schema::OC_STATIC_GROUP),
                Filter::any_of(schema::MAIL_FORWARDING_ADDRESS, chunk.iter().cloned()),
            ]);
            for group in self.search_entries(&[Dn::root()], &filter)? {
                if seen.insert(group.id().clone()) {
                    groups.push(group);
                }
            }
        }
        Ok(groups)
    }

    /// Drop cached membership of whatever `addresses` resolve to. When a
    /// group's own containment changed, every cached closure may include
    /// it, so all memberships are dropped instead.
    pub(crate) fn invalidate_member_subjects(&self, addresses: &[Address]) -> Result<(), CoreError> {
        let mut nested_group = false;
        for address in addresses {
            if let Some(subject) = self.resolve_subject(address)? {
                subject.invalidate(&CacheDataKind::MEMBERSHIP);
                nested_group |= subject.kind().is_group();
            }
        }
        if nested_group {
            self.caches().invalidate_all_memberships();
        }
        Ok(())
    }
}

/// Matches static and dynamic group main entries.
pub(crate) fn group_filter() -> Filter {
    Filter::or([
        Filter::eq(schema::OBJECT_CLASS, schema::OC_STATIC_GROUP),
        Filter::eq(schema::OBJECT_CLASS, schema::OC_DYNAMIC_GROUP),
    ])
}
