// ── Domain rename ──
//
// A domain rename touches every entry below the domain and every group
// elsewhere that lists one of its addresses. Progress is recorded on the
// domain entry as `domainRenameInfo: <phase>,<old>:<new>` and the domain
// stays in `shutdown` status until the last phase completes, so calling
// the rename again with the same names resumes where it stopped.

use std::sync::Arc;

use dirprov_api::{Dn, Filter, Modification, Routing};
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use super::{ADDRESS_ATTRS, AddressRewrite, RenameReport};
use crate::cascade::{CascadeAction, CascadeReport};
use crate::engine::Provisioning;
use crate::error::CoreError;
use crate::model::{Address, Domain, DomainStatus, Entry, EntryId, EntryKind, validate_domain_name};
use crate::schema;

/// Steps of a domain rename, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, Serialize)]
pub enum RenamePhase {
    /// Move the subtree and rewrite every address inside it.
    RenameEntries,
    /// Fix targets outside the domain of aliases that moved.
    FixForeignAliases,
    /// Fix member lists outside the domain.
    FixForeignGroupMembers,
}

/// Parsed `domainRenameInfo` value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RenameInfo {
    phase: RenamePhase,
    old: String,
    new: String,
}

impl RenameInfo {
    fn parse(raw: &str) -> Result<Self, CoreError> {
        let bad = || CoreError::Internal(format!("malformed {}: '{raw}'", schema::DOMAIN_RENAME_INFO));
        let (phase, names) = raw.split_once(',').ok_or_else(bad)?;
        let (old, new) = names.split_once(':').ok_or_else(bad)?;
        Ok(Self {
            phase: phase.trim().parse().map_err(|_| bad())?,
            old: old.trim().to_lowercase(),
            new: new.trim().to_lowercase(),
        })
    }

    fn render(&self) -> String {
        format!("{},{}:{}", self.phase, self.old, self.new)
    }
}

impl Provisioning {
    /// Rename domain `old` to `new`, or resume an interrupted rename
    /// between the same two names. The domain keeps its id.
    pub fn rename_domain(&self, old: &str, new: &str) -> Result<RenameReport, CoreError> {
        let old = old.trim().to_lowercase();
        let new = new.trim().to_lowercase();
        validate_domain_name(&old)?;
        validate_domain_name(&new)?;
        if old == new {
            return Err(CoreError::validation("old and new domain names are the same"));
        }

        let (entry, mut info) = self.start_or_resume(&old, &new)?;
        let layout = self.layout();
        let old_dn = layout.domain_dn(&old)?;
        let new_dn = layout.domain_dn(&new)?;
        let rewrite = AddressRewrite::for_domain(&old, &new);
        let mut cascade = CascadeReport::new();
        let mut rewritten = 0;

        if info.phase == RenamePhase::RenameEntries {
            rewritten = self.rename_entries(&entry, &old_dn, &new_dn, &rewrite)?;
            info.phase = RenamePhase::FixForeignAliases;
            self.record_phase(&entry, &info)?;
        }
        if info.phase == RenamePhase::FixForeignAliases {
            self.fix_foreign_aliases(&new_dn, &rewrite, &mut cascade)?;
            info.phase = RenamePhase::FixForeignGroupMembers;
            self.record_phase(&entry, &info)?;
        }
        self.fix_foreign_group_members(&new_dn, &rewrite, &mut cascade)?;

        self.modify_entry(
            &entry,
            &[
                Modification::delete_attr(schema::DOMAIN_RENAME_INFO),
                Modification::replace(schema::DOMAIN_STATUS, [DomainStatus::Active.to_string()]),
            ],
        )?;
        let caches = self.caches();
        caches.domains.clear();
        caches.accounts.clear();
        caches.groups.clear();
        caches.authorization.clear();

        info!(from = %old, to = %new, rewritten, cascade_failures = cascade.failed_count(), "domain renamed");
        Ok(RenameReport {
            kind: EntryKind::Domain,
            old_name: old,
            new_name: new,
            old_dn,
            new_dn,
            rewritten,
            cascade,
        })
    }

    /// Find the domain entry, validating a fresh rename or picking up the
    /// stored progress of an interrupted one.
    fn start_or_resume(&self, old: &str, new: &str) -> Result<(Arc<Entry>, RenameInfo), CoreError> {
        let source = match self.domain_entry(old)? {
            Some(entry) => Some(entry),
            // After the move the entry answers to the new location.
            None => self.domain_entry(new)?.filter(|e| {
                e.attr(schema::DOMAIN_RENAME_INFO)
                    .and_then(|raw| RenameInfo::parse(&raw).ok())
                    .is_some_and(|i| i.old == old && i.new == new)
            }),
        };
        let entry = source.ok_or_else(|| CoreError::not_found("domain", old))?;
        let domain = Domain::from_entry(Arc::clone(&entry))?;

        if let Some(raw) = domain.rename_info() {
            let info = RenameInfo::parse(&raw)?;
            if info.old != old || info.new != new {
                return Err(CoreError::unsupported(
                    "rename domain",
                    format!("a rename from {} to {} is in progress", info.old, info.new),
                ));
            }
            warn!(from = %old, to = %new, phase = %info.phase, "resuming interrupted domain rename");
            return Ok((entry, info));
        }

        if !domain.is_local() {
            return Err(CoreError::validation(format!("{old} is an alias domain")));
        }
        if self.domain_entry(new)?.is_some() {
            return Err(CoreError::collision("domain", new));
        }
        let layout = self.layout();
        let old_dn = layout.domain_dn(old)?;
        let new_dn = layout.domain_dn(new)?;
        if new_dn.is_under(&old_dn) {
            return Err(CoreError::validation(format!(
                "{new} lies inside {old} and cannot be its new name"
            )));
        }
        let subdomains = Filter::eq(schema::OBJECT_CLASS, schema::OC_DOMAIN);
        if self
            .search_hits(&old_dn, subdomains)?
            .iter()
            .any(|hit| hit.dn.is_strictly_under(&old_dn))
        {
            return Err(CoreError::validation(format!("{old} has subdomains")));
        }

        let info = RenameInfo {
            phase: RenamePhase::RenameEntries,
            old: old.to_owned(),
            new: new.to_owned(),
        };
        self.modify_entry(
            &entry,
            &[
                Modification::replace(schema::DOMAIN_RENAME_INFO, [info.render()]),
                Modification::replace(schema::DOMAIN_STATUS, [DomainStatus::Shutdown.to_string()]),
            ],
        )?;
        info!(from = %old, to = %new, "domain rename started");
        Ok((entry, info))
    }

    fn record_phase(&self, entry: &Arc<Entry>, info: &RenameInfo) -> Result<(), CoreError> {
        debug!(phase = %info.phase, "domain rename phase");
        self.modify_entry(
            entry,
            &[Modification::replace(schema::DOMAIN_RENAME_INFO, [info.render()])],
        )
    }

    /// Move the domain subtree and rewrite addresses inside it. Returns the
    /// number of entries rewritten.
    fn rename_entries(
        &self,
        entry: &Arc<Entry>,
        old_dn: &Dn,
        new_dn: &Dn,
        rewrite: &AddressRewrite,
    ) -> Result<usize, CoreError> {
        // A resumed rename may find the subtree already moved.
        if self.dir().exists(old_dn, Routing::PreferMaster)? {
            self.ensure_dc_parents(new_dn)?;
            if let Err(e) = self.dir().rename(old_dn, new_dn) {
                let err = CoreError::from(e);
                if err.is_collision() {
                    warn!(to = %new_dn, "target location taken, reactivating source domain");
                    self.modify_entry(
                        entry,
                        &[
                            Modification::delete_attr(schema::DOMAIN_RENAME_INFO),
                            Modification::replace(schema::DOMAIN_STATUS, [DomainStatus::Active.to_string()]),
                        ],
                    )?;
                    return Err(CoreError::collision("domain", rewrite.new_domain.as_str()));
                }
                return Err(err);
            }
        }
        // Entries inside the subtree all moved; cached instances are stale.
        self.caches().accounts.clear();
        self.caches().groups.clear();

        self.modify_dn(
            EntryKind::Domain,
            new_dn,
            &[Modification::replace(schema::DOMAIN_NAME, [rewrite.new_domain.as_str()])],
        )?;
        self.reload(entry, new_dn)?;

        let mut rewritten = 0;
        let everything = Filter::present(schema::OBJECT_CLASS);
        for hit in self.search_hits(new_dn, everything)? {
            let Some(kind) = EntryKind::from_attrs(&hit.attrs) else {
                continue;
            };
            let attrs: &[&str] = match kind {
                EntryKind::Account | EntryKind::Alias | EntryKind::DynamicGroup => &ADDRESS_ATTRS,
                EntryKind::StaticGroup => &[
                    schema::MAIL,
                    schema::MAIL_ALIAS,
                    schema::MAIL_DELIVERY_ADDRESS,
                    schema::MAIL_FORWARDING_ADDRESS,
                ],
                EntryKind::DynamicGroupUnit => &[schema::MAIL_FORWARDING_ADDRESS],
                EntryKind::Domain | EntryKind::Cos | EntryKind::Server | EntryKind::UcService => continue,
            };
            let mods = rewrite.modifications(&hit.attrs, attrs);
            if mods.is_empty() {
                continue;
            }
            self.modify_dn(kind, &hit.dn, &mods)?;
            rewritten += 1;
        }
        Ok(rewritten)
    }

    /// Moved aliases whose target lives in another domain: the target
    /// still lists the old alias address.
    fn fix_foreign_aliases(
        &self,
        new_dn: &Dn,
        rewrite: &AddressRewrite,
        report: &mut CascadeReport,
    ) -> Result<(), CoreError> {
        let aliases = Filter::eq(schema::OBJECT_CLASS, schema::OC_ALIAS);
        for hit in self.search_hits(new_dn, aliases)? {
            let Some(target_id) = hit.attrs.get_one(schema::ALIAS_TARGET_ID).map(EntryId::from) else {
                continue;
            };
            let new_address = match self.layout().address_from_location(&hit.dn, None) {
                Ok(address) => address,
                Err(e) => {
                    report.record(CascadeAction::FixForeignAlias, hit.dn.to_string(), Err(e));
                    continue;
                }
            };
            let result = self.fix_foreign_alias_target(&target_id, &new_address, new_dn, rewrite);
            if !matches!(result, Ok(false)) {
                report.record(CascadeAction::FixForeignAlias, new_address, result.map(|_| ()));
            }
        }
        Ok(())
    }

    /// Returns whether the target needed fixing.
    fn fix_foreign_alias_target(
        &self,
        target_id: &EntryId,
        new_address: &str,
        new_dn: &Dn,
        rewrite: &AddressRewrite,
    ) -> Result<bool, CoreError> {
        let Some(target) = self.find_entry_by_id(target_id)? else {
            return Ok(false);
        };
        if target.dn().is_under(new_dn) {
            return Ok(false);
        }
        let new_address = Address::parse(new_address)?;
        let old_address = new_address.with_domain(&rewrite.old_domain)?;
        let mut mods = Vec::new();
        for attr in [schema::MAIL_ALIAS, schema::MAIL] {
            if target.has_value(attr, old_address.as_str()) {
                mods.push(Modification::delete(attr, [old_address.as_str()]));
                mods.push(Modification::add(attr, [new_address.as_str()]));
            }
        }
        if mods.is_empty() {
            return Ok(false);
        }
        self.modify_entry(&target, &mods)?;
        Ok(true)
    }

    /// Static groups and external units outside the domain that list an
    /// address in the old domain.
    fn fix_foreign_group_members(
        &self,
        new_dn: &Dn,
        rewrite: &AddressRewrite,
        report: &mut CascadeReport,
    ) -> Result<(), CoreError> {
        let listing = Filter::and([
            Filter::or([
                Filter::eq(schema::OBJECT_CLASS, schema::OC_STATIC_GROUP),
                Filter::eq(schema::OBJECT_CLASS, schema::OC_DYNAMIC_GROUP_UNIT),
            ]),
            Filter::present(schema::MAIL_FORWARDING_ADDRESS),
        ]);
        for hit in self.search_hits(&Dn::root(), listing)? {
            if hit.dn.is_under(new_dn) {
                continue;
            }
            let mods = rewrite.modifications(&hit.attrs, &[schema::MAIL_FORWARDING_ADDRESS]);
            if mods.is_empty() {
                continue;
            }
            let kind = EntryKind::from_attrs(&hit.attrs).unwrap_or(EntryKind::StaticGroup);
            let result = self.modify_dn(kind, &hit.dn, &mods);
            report.record(CascadeAction::FixForeignGroupMember, hit.dn.to_string(), result);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rename_info_round_trip() {
        let info = RenameInfo::parse("FixForeignAliases,a.com:b.com").unwrap();
        assert_eq!(info.phase, RenamePhase::FixForeignAliases);
        assert_eq!(info.old, "a.com");
        assert_eq!(info.new, "b.com");
        assert_eq!(info.render(), "FixForeignAliases,a.com:b.com");
    }

    #[test]
    fn rename_info_rejects_garbage() {
        assert!(RenameInfo::parse("nonsense").is_err());
        assert!(RenameInfo::parse("Bogus,a.com:b.com").is_err());
    }

    #[test]
    fn phases_are_ordered() {
        assert!(RenamePhase::RenameEntries < RenamePhase::FixForeignAliases);
        assert!(RenamePhase::FixForeignAliases < RenamePhase::FixForeignGroupMembers);
    }
}
