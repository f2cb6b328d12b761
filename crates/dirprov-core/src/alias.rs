// ── Alias lifecycle ──
//
// An alias is its own entry at the location its address maps to, holding
// the id of its target. The target lists the address too (in `mailAlias`
// and `mail`). The two sides are written separately, so an alias can be
// found dangling (target gone) or out of sync (target missing the
// address); creation repairs both.
//
// Dangling repair is best-effort: two callers racing on the same address
// can see the same stale entry, and one may remove an alias the other has
// just validated.

use std::sync::Arc;

use dirprov_api::{Dn, Modification};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cascade::{CascadeAction, CascadeReport};
use crate::engine::Provisioning;
use crate::error::CoreError;
use crate::model::{Address, Aliasable, CacheDataKind, Entry, EntryId, EntryKind};
use crate::schema;

/// Observable state of an alias address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AliasState {
    Absent,
    Bound { target: EntryId },
    /// The recorded target does not exist (or none is recorded).
    Dangling { target: Option<EntryId> },
}

enum CollisionOutcome {
    /// A stale alias was removed; try again.
    Retry,
    /// The alias already points at this target.
    Proceed,
}

impl Provisioning {
    /// Bind `address` to `target`.
    ///
    /// Creates the alias entry, repairing a dangling one in the way, then
    /// adds the address to the target and strips it from every dynamic
    /// group's external member list.
    pub fn add_alias(&self, target: &impl Aliasable, address: &str) -> Result<CascadeReport, CoreError> {
        let owner = target.entry();
        if !matches!(
            owner.kind(),
            EntryKind::Account | EntryKind::StaticGroup | EntryKind::DynamicGroup
        ) {
            return Err(CoreError::validation(format!(
                "a {} cannot have aliases",
                owner.kind()
            )));
        }
        let address = Address::parse(address)?;
        self.require_local_domain(address.domain())?;

        let layout = self.layout();
        let group_dn = layout.location_for(EntryKind::DynamicGroup, address.local(), Some(address.domain()))?;
        if self.load(&group_dn)?.is_some() {
            return Err(CoreError::collision("address", address.as_str()));
        }

        let dn = layout.location_for(EntryKind::Alias, address.local(), Some(address.domain()))?;
        let mut retried = false;
        loop {
            let attrs = Self::base_attrs(EntryKind::Alias, &EntryId::generate())
                .with(schema::ALIAS_TARGET_ID, owner.id().to_string())
                .with(schema::MAIL, address.as_str());
            match self.create_entry(EntryKind::Alias, &dn, attrs) {
                Ok(()) => break,
                Err(e) if e.is_collision() => match self.resolve_alias_collision(&dn, &address, target)? {
                    CollisionOutcome::Proceed => break,
                    CollisionOutcome::Retry if !retried => retried = true,
                    CollisionOutcome::Retry => return Err(CoreError::collision("address", address.as_str())),
                },
                Err(e) => return Err(e),
            }
        }

        self.modify_entry(
            owner,
            &[
                Modification::add(schema::MAIL_ALIAS, [address.as_str()]),
                Modification::add(schema::MAIL, [address.as_str()]),
            ],
        )?;

        let mut report = CascadeReport::new();
        self.strip_from_external_units(address.as_str(), &mut report);
        self.invalidate_after_alias_change(Some(owner));
        info!(alias = %address, target = %owner.name(), "alias added");
        Ok(report)
    }

    /// Decide what an occupied alias location means for a create.
    fn resolve_alias_collision(
        &self,
        dn: &Dn,
        address: &Address,
        target: &impl Aliasable,
    ) -> Result<CollisionOutcome, CoreError> {
        let Some(existing) = self.load(dn)? else {
            return Ok(CollisionOutcome::Retry);
        };
        if existing.kind() != EntryKind::Alias {
            return Err(CoreError::collision("address", address.as_str()));
        }
        let recorded = existing.attr(schema::ALIAS_TARGET_ID).map(EntryId::from);
        let live = match &recorded {
            Some(id) => self.find_entry_by_id(id)?,
            None => None,
        };
        let Some(live) = live else {
            warn!(alias = %address, target = ?recorded, "removing dangling alias");
            match self.dir().delete(dn) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            return Ok(CollisionOutcome::Retry);
        };
        if live.id() != target.id() {
            return Err(CoreError::collision("address", address.as_str()));
        }
        if target.entry().has_value(schema::MAIL_ALIAS, address.as_str()) {
            return Err(CoreError::collision("alias", address.as_str()));
        }
        warn!(alias = %address, target = %target.name(), "alias exists but target is out of sync, repairing");
        Ok(CollisionOutcome::Proceed)
    }

    /// Unbind `address`, cleaning up wherever it is still referenced.
    ///
    /// The address is always stripped from `owner` and from every static
    /// group. The alias entry is deleted only when it points at `owner` or
    /// is dangling. When an owner is given and the alias did not point at
    /// it, `NotFound` is returned after that cleanup.
    pub fn remove_alias(
        &self,
        owner: Option<&dyn Aliasable>,
        address: &str,
    ) -> Result<CascadeReport, CoreError> {
        let address = Address::parse(address)?;
        let dn = self
            .layout()
            .location_for(EntryKind::Alias, address.local(), Some(address.domain()))?;
        let existing = match self.load(&dn) {
            Ok(found) => found.filter(|e| e.kind() == EntryKind::Alias),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let recorded = existing
            .as_ref()
            .and_then(|e| e.attr(schema::ALIAS_TARGET_ID))
            .map(EntryId::from);
        let points_to_owner = matches!((&recorded, owner), (Some(id), Some(o)) if id == o.id());
        let live_target = match &recorded {
            Some(_) if points_to_owner => owner.map(|o| Arc::clone(o.entry())),
            Some(id) => self.find_entry_by_id(id)?,
            None => None,
        };
        let target_live = live_target.is_some();
        let dangling = existing.is_some() && !target_live;
        let points_elsewhere = existing.is_some() && target_live && !points_to_owner;
        debug!(alias = %address, points_to_owner, points_elsewhere, dangling, "removing alias");

        let mut report = CascadeReport::new();
        if let Some(owner) = owner {
            let result = self.strip_owner_address(owner, &address);
            report.record(CascadeAction::StripOwnerAddress, owner.name(), result);
        }
        self.strip_from_static_groups(&[address.to_string()], &mut report);

        if points_to_owner || dangling {
            match self.dir().delete(&dn) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            info!(alias = %address, "alias removed");
        }
        self.invalidate_after_alias_change(live_target.as_ref());

        if let (Some(owner), false) = (owner, points_to_owner) {
            return Err(CoreError::not_found(
                "alias",
                format!("{address} on {}", owner.name()),
            ));
        }
        Ok(report)
    }

    /// Current state of an alias address.
    pub fn alias_state(&self, address: &str) -> Result<AliasState, CoreError> {
        let address = Address::parse(address)?;
        let dn = self
            .layout()
            .location_for(EntryKind::Alias, address.local(), Some(address.domain()))?;
        let Some(existing) = self.load(&dn)? else {
            return Ok(AliasState::Absent);
        };
        if existing.kind() != EntryKind::Alias {
            return Err(CoreError::validation(format!(
                "{address} is a {}, not an alias",
                existing.kind()
            )));
        }
        let Some(target) = existing.attr(schema::ALIAS_TARGET_ID).map(EntryId::from) else {
            return Ok(AliasState::Dangling { target: None });
        };
        if self.find_entry_by_id(&target)?.is_some() {
            Ok(AliasState::Bound { target })
        } else {
            Ok(AliasState::Dangling { target: Some(target) })
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn strip_owner_address(&self, owner: &dyn Aliasable, address: &Address) -> Result<(), CoreError> {
        let entry = owner.entry();
        let mut mods = Vec::new();
        if entry.has_value(schema::MAIL_ALIAS, address.as_str()) {
            mods.push(Modification::delete(schema::MAIL_ALIAS, [address.as_str()]));
        }
        // The primary address stays in `mail` even if it was also aliased.
        if entry.has_value(schema::MAIL, address.as_str()) && owner.name() != address.as_str() {
            mods.push(Modification::delete(schema::MAIL, [address.as_str()]));
        }
        if mods.is_empty() {
            return Ok(());
        }
        self.modify_entry(entry, &mods)
    }

    /// Remove `address` from every dynamic group external unit listing it.
    pub(crate) fn strip_from_external_units(&self, address: &str, report: &mut CascadeReport) {
        let hits = match self.external_units_listing(&[address.to_owned()]) {
            Ok(hits) => hits,
            Err(e) => {
                report.record(CascadeAction::StripExternalMember, address, Err(e));
                return;
            }
        };
        for hit in hits {
            let listed: Vec<String> = hit
                .attrs
                .get_all(schema::MAIL_FORWARDING_ADDRESS)
                .iter()
                .filter(|m| m.eq_ignore_ascii_case(address))
                .cloned()
                .collect();
            if listed.is_empty() {
                continue;
            }
            let result = self.modify_dn(
                EntryKind::DynamicGroupUnit,
                &hit.dn,
                &[Modification::delete(schema::MAIL_FORWARDING_ADDRESS, listed)],
            );
            report.record(CascadeAction::StripExternalMember, hit.dn.to_string(), result);
            if let Some(group) = hit.dn.parent().and_then(|dn| self.cached_group_at(&dn)) {
                group.invalidate(&[CacheDataKind::DynamicMembers]);
            }
        }
    }

    /// The cached dynamic group instance at `dn`, if any.
    pub(crate) fn cached_group_at(&self, dn: &Dn) -> Option<Arc<Entry>> {
        let name = self
            .layout()
            .address_from_location(dn, Some(schema::CN))
            .ok()?;
        self.caches().groups.get_by_name(&name)
    }

    /// An alias changes which static groups list the target. A group
    /// target may sit inside other groups, so every closure goes.
    fn invalidate_after_alias_change(&self, target: Option<&Arc<Entry>>) {
        if let Some(target) = target {
            target.invalidate(&CacheDataKind::MEMBERSHIP);
            if target.kind().is_group() {
                self.caches().invalidate_all_memberships();
            }
        }
        self.caches().authorization.clear();
    }
}
