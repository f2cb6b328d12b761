// ── Rename orchestrator ──
//
// Renames run in a fixed order that stands in for a transaction:
//
//   1. validate the new address and its domain
//   2. move the entry with the store's native rename
//   3. rewrite the primary and alias addresses
//   4. check moved aliases for collisions under the new domain
//   5. write the rewritten addresses
//   6. cascade: fix static group member lists, move alias entries
//   7. invalidate caches
//
// Steps 1 to 5 fail fast with no rollback; once step 2 succeeds the
// caches know the entry only under its new location. Cascade failures
// are collected in the returned report and never fail the rename.

mod domain;

pub use domain::RenamePhase;

use dirprov_api::{Dn, Filter, Modification};
use serde::Serialize;
use tracing::info;

use crate::cascade::{CascadeAction, CascadeReport};
use crate::engine::{Provisioning, collision_as};
use crate::error::CoreError;
use crate::model::{Account, Address, Aliasable, Entry, EntryKind, Group};
use crate::schema;

/// Attributes holding an object's own addresses.
const ADDRESS_ATTRS: [&str; 3] = [schema::MAIL, schema::MAIL_ALIAS, schema::MAIL_DELIVERY_ADDRESS];

/// Outcome of a rename whose critical path succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub kind: EntryKind,
    pub old_name: String,
    pub new_name: String,
    pub old_dn: Dn,
    pub new_dn: Dn,
    /// Entries whose address attributes were rewritten.
    pub rewritten: usize,
    pub cascade: CascadeReport,
}

impl RenameReport {
    fn unchanged(entry: &Entry) -> Self {
        Self {
            kind: entry.kind(),
            old_name: entry.name(),
            new_name: entry.name(),
            old_dn: entry.dn(),
            new_dn: entry.dn(),
            rewritten: 0,
            cascade: CascadeReport::new(),
        }
    }
}

/// Maps an address from the old primary name and domain to the new ones.
#[derive(Debug, Clone)]
pub(crate) struct AddressRewrite {
    old_primary: Option<Address>,
    new_primary: Option<Address>,
    old_domain: String,
    new_domain: String,
}

impl AddressRewrite {
    pub(crate) fn for_object(old: &Address, new: &Address) -> Self {
        Self {
            old_primary: Some(old.clone()),
            new_primary: Some(new.clone()),
            old_domain: old.domain().to_owned(),
            new_domain: new.domain().to_owned(),
        }
    }

    pub(crate) fn for_domain(old_domain: &str, new_domain: &str) -> Self {
        Self {
            old_primary: None,
            new_primary: None,
            old_domain: old_domain.to_owned(),
            new_domain: new_domain.to_owned(),
        }
    }

    pub(crate) fn domain_changed(&self) -> bool {
        self.old_domain != self.new_domain
    }

    /// The old primary becomes the new one; other addresses in the old
    /// domain move to the new domain; everything else is kept verbatim.
    pub(crate) fn apply(&self, value: &str) -> String {
        let Ok(address) = Address::parse(value) else {
            return value.to_owned();
        };
        if let (Some(old), Some(new)) = (&self.old_primary, &self.new_primary) {
            if address == *old {
                return new.to_string();
            }
        }
        if self.domain_changed() && address.domain() == self.old_domain {
            if let Ok(moved) = address.with_domain(&self.new_domain) {
                return moved.to_string();
            }
        }
        value.to_owned()
    }

    /// Replace modifications for every listed attribute whose values
    /// change. Values that collapse onto each other are deduplicated.
    pub(crate) fn modifications(&self, attrs: &dirprov_api::Attributes, names: &[&str]) -> Vec<Modification> {
        let mut mods = Vec::new();
        for attr in names {
            let current = attrs.get_all(attr);
            if current.is_empty() {
                continue;
            }
            let mut rewritten: Vec<String> = Vec::with_capacity(current.len());
            for value in current {
                let next = self.apply(value);
                if !rewritten.iter().any(|v| v.eq_ignore_ascii_case(&next)) {
                    rewritten.push(next);
                }
            }
            if rewritten.as_slice() != current {
                mods.push(Modification::replace(attr, rewritten));
            }
        }
        mods
    }
}

impl Provisioning {
    /// Rename an account to `new_address`, moving aliases in its old
    /// domain along with it.
    pub fn rename_account(&self, account: &Account, new_address: &str) -> Result<RenameReport, CoreError> {
        self.rename_addressable(account, new_address)
    }

    /// Rename a static or dynamic group. Dynamic groups move with their
    /// units.
    pub fn rename_group(&self, group: &Group, new_address: &str) -> Result<RenameReport, CoreError> {
        let report = self.rename_addressable(group, new_address)?;
        // Cached closures name the group.
        self.caches().invalidate_all_memberships();
        Ok(report)
    }

    fn rename_addressable(&self, subject: &impl Aliasable, new_address: &str) -> Result<RenameReport, CoreError> {
        let entry = subject.entry();
        let kind = entry.kind();

        // 1. Validate.
        let old = Address::parse(&entry.name()).map_err(|_| {
            CoreError::unsupported("rename", format!("{} has no address to rename", entry.name()))
        })?;
        let new = Address::parse(new_address)?;
        self.require_local_domain(new.domain())?;
        if old == new {
            return Ok(RenameReport::unchanged(entry));
        }
        if self.address_in_use(&new)? {
            return Err(CoreError::collision("address", new.as_str()));
        }

        // 2. Native move.
        let old_dn = entry.dn();
        let new_dn = self
            .layout()
            .location_for(kind, new.local(), Some(new.domain()))?;
        if old_dn != new_dn {
            if let Some(container) = new_dn.parent() {
                self.ensure_container(&container)?;
            }
            self.dir()
                .rename(&old_dn, &new_dn)
                .map_err(|e| collision_as(e.into(), "address", new.as_str()))?;
            // Re-key now: a failure below must not leave the old name
            // pointing at the moved entry.
            self.reload(entry, &new_dn)?;
        }

        // 3. Rewrite addresses.
        let rewrite = AddressRewrite::for_object(&old, &new);
        let attrs = entry.attrs();
        let mut mods = rewrite.modifications(&attrs, &ADDRESS_ATTRS);
        if !attrs.has_value(schema::MAIL, new.as_str()) && !mods.iter().any(|m| m.attr() == schema::MAIL) {
            mods.push(Modification::add(schema::MAIL, [new.as_str()]));
        }
        let moved_aliases: Vec<(String, String)> = subject
            .alias_addresses()
            .into_iter()
            .map(|a| {
                let next = rewrite.apply(&a);
                (a.to_lowercase(), next)
            })
            .filter(|(from, to)| from != to)
            .collect();

        // 4. Collision check for moved aliases.
        self.check_moved_aliases(entry, new.domain(), &moved_aliases)?;

        // 5. Write.
        if !mods.is_empty() {
            self.modify_dn(kind, &new_dn, &mods)?;
        }
        self.reload(entry, &new_dn)?;

        // 6. Cascade.
        let mut cascade = CascadeReport::new();
        let mut renamed = vec![(old.to_string(), new.to_string())];
        renamed.extend(moved_aliases.iter().cloned());
        self.update_group_member_references(&renamed, &mut cascade);
        for (from, to) in &moved_aliases {
            let result = self.relocate_alias(from, to);
            cascade.record(CascadeAction::RelocateAlias, format!("{from} -> {to}"), result);
        }

        // 7. Invalidate.
        if let Some(cache) = self.caches().for_kind(kind) {
            cache.remove_by_name(old.as_str());
        }
        self.caches().authorization.clear();

        info!(%kind, from = %old, to = %new, cascade_failures = cascade.failed_count(), "renamed");
        Ok(RenameReport {
            kind,
            old_name: old.to_string(),
            new_name: new.to_string(),
            old_dn,
            new_dn,
            rewritten: 1,
            cascade,
        })
    }

    /// Fail when any moved alias address is already taken under the new
    /// domain by something other than `owner`.
    fn check_moved_aliases(
        &self,
        owner: &Entry,
        domain: &str,
        moved: &[(String, String)],
    ) -> Result<(), CoreError> {
        let targets: Vec<String> = moved.iter().map(|(_, to)| to.clone()).collect();
        if targets.is_empty() {
            return Ok(());
        }
        let base = self.layout().domain_dn(domain)?;
        let owner_id = owner.id().to_string();
        for chunk in targets.chunks(self.config().membership_batch_size.max(1)) {
            let filter = Filter::any_of(schema::MAIL, chunk.iter().cloned());
            for hit in self.search_hits(&base, filter)? {
                if hit.attrs.get_one(schema::ENTRY_ID) == Some(owner_id.as_str()) {
                    continue;
                }
                // An alias of the owner in the new domain is fine.
                if hit.attrs.get_one(schema::ALIAS_TARGET_ID) == Some(owner_id.as_str()) {
                    continue;
                }
                let taken = hit
                    .attrs
                    .get_all(schema::MAIL)
                    .iter()
                    .find(|m| chunk.iter().any(|t| t.eq_ignore_ascii_case(m)))
                    .cloned()
                    .unwrap_or_else(|| hit.dn.to_string());
                return Err(CoreError::collision("alias", taken));
            }
        }
        Ok(())
    }

    /// Point static group member lists at the new addresses.
    pub(crate) fn update_group_member_references(&self, renamed: &[(String, String)], report: &mut CascadeReport) {
        let old: Vec<String> = renamed.iter().map(|(from, _)| from.clone()).collect();
        let groups = match self.static_groups_listing(&old) {
            Ok(groups) => groups,
            Err(e) => {
                report.record(CascadeAction::UpdateGroupMember, old.join(","), Err(e));
                return;
            }
        };
        for group in groups {
            let listed = group.attr_values(schema::MAIL_FORWARDING_ADDRESS);
            let mut mods = Vec::new();
            for (from, to) in renamed {
                if listed.iter().any(|m| m.eq_ignore_ascii_case(from)) {
                    mods.push(Modification::delete(schema::MAIL_FORWARDING_ADDRESS, [from.as_str()]));
                    mods.push(Modification::add(schema::MAIL_FORWARDING_ADDRESS, [to.as_str()]));
                }
            }
            if mods.is_empty() {
                continue;
            }
            let result = self.modify_entry(&group, &mods);
            report.record(CascadeAction::UpdateGroupMember, group.name(), result);
        }
    }

    /// Move an alias entry to the location of its new address.
    fn relocate_alias(&self, from: &str, to: &str) -> Result<(), CoreError> {
        let from = Address::parse(from)?;
        let to = Address::parse(to)?;
        let layout = self.layout();
        let from_dn = layout.location_for(EntryKind::Alias, from.local(), Some(from.domain()))?;
        let to_dn = layout.location_for(EntryKind::Alias, to.local(), Some(to.domain()))?;
        self.dir().rename(&from_dn, &to_dn)?;
        self.modify_dn(
            EntryKind::Alias,
            &to_dn,
            &[Modification::replace(schema::MAIL, [to.as_str()])],
        )
    }
}
