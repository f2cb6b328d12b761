// ── Group membership resolver ──
//
// Direct containment is found three ways: a reverse search over static
// group member lists, the subject's own dynamic group back-references,
// and a reverse search over dynamic group external units. The closure
// over those edges is cached on the subject entry.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::CacheMode;
use crate::engine::Provisioning;
use crate::error::CoreError;
use crate::model::{
    Account, CacheDataKind, CachedData, Entry, EntryId, EntryKind, GroupMember, GroupMembership,
    MemberOf, Nameable,
};
use crate::schema;

impl Provisioning {
    /// Every group containing `subject`, directly or through nesting.
    ///
    /// With `admin_only` only admin groups are returned. Both variants are
    /// cached on the subject and recomputed after invalidation.
    pub fn group_membership(
        &self,
        subject: &impl GroupMember,
        admin_only: bool,
    ) -> Result<Arc<GroupMembership>, CoreError> {
        let entry = subject.entry();
        let slot = if admin_only {
            CacheDataKind::AdminMembership
        } else {
            CacheDataKind::Membership
        };
        if let Some(CachedData::Membership(cached)) = entry.cached(slot) {
            trace!(subject = %entry.name(), admin_only, "membership cache hit");
            return Ok(cached);
        }

        let full = match entry.cached(CacheDataKind::Membership) {
            Some(CachedData::Membership(cached)) => cached,
            _ => {
                let direct = self.direct_groups(entry)?;
                let closure = transitive_closure(direct, |group| self.direct_groups(group))?;
                let full = Arc::new(GroupMembership::new(closure));
                self.remember(entry, CacheDataKind::Membership, CachedData::Membership(Arc::clone(&full)));
                full
            }
        };
        if !admin_only {
            return Ok(full);
        }
        let admin = Arc::new(full.admin_only());
        self.remember(entry, CacheDataKind::AdminMembership, CachedData::Membership(Arc::clone(&admin)));
        Ok(admin)
    }

    /// Groups containing `subject` directly, without closure.
    pub fn direct_group_membership(&self, subject: &impl GroupMember) -> Result<GroupMembership, CoreError> {
        let direct = self.direct_groups(subject.entry())?;
        Ok(GroupMembership::new(
            direct.iter().map(|g| member_of(g, None)).collect(),
        ))
    }

    /// Whether `account` holds admin rights, either as a delegated
    /// administrator or through an admin group.
    pub fn is_admin(&self, account: &Account) -> Result<bool, CoreError> {
        let cache = &self.caches().authorization;
        if let Some(verdict) = cache.get(account.id()) {
            return Ok(verdict);
        }
        let verdict =
            account.is_delegated_admin() || !self.group_membership(account, true)?.is_empty();
        cache.put(account.id().clone(), verdict);
        Ok(verdict)
    }

    /// Directly containing groups of an entry.
    ///
    /// The ids are cached on the entry. On a hit each id is resolved again
    /// through the group cache, and ids that no longer resolve are dropped.
    pub(crate) fn direct_groups(&self, subject: &Arc<Entry>) -> Result<Vec<Arc<Entry>>, CoreError> {
        if let Some(CachedData::GroupIds(ids)) = subject.cached(CacheDataKind::DirectGroupIds) {
            let mut groups = Vec::with_capacity(ids.len());
            for id in ids.iter() {
                match self.group_entry_by_id(id)? {
                    Some(group) => groups.push(group),
                    None => debug!(subject = %subject.name(), group = %id, "dropping vanished group"),
                }
            }
            if groups.len() != ids.len() {
                self.remember_group_ids(subject, &groups);
            }
            return Ok(groups);
        }

        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        let mut push = |group: Arc<Entry>| {
            if !is_resolvable_group(&group) {
                return;
            }
            if seen.insert(group.id().clone()) {
                groups.push(group);
            }
        };

        let addresses = subject.member_addresses();

        for group in self.static_groups_listing(&addresses)? {
            push(group);
        }

        if subject.kind().carries_back_reference() {
            for id in subject.back_reference_ids() {
                if let Some(group) = self.group_entry_by_id(&id)? {
                    push(group);
                }
            }
        }

        for hit in self.external_units_listing(&addresses)? {
            let Some(group_dn) = hit.dn.parent() else {
                continue;
            };
            if let Some(group) = self.load(&group_dn)? {
                push(self.adopt(group));
            }
        }

        self.remember_group_ids(subject, &groups);
        Ok(groups)
    }

    fn remember_group_ids(&self, subject: &Entry, groups: &[Arc<Entry>]) {
        let ids: Vec<EntryId> = groups.iter().map(|g| g.id().clone()).collect();
        self.remember(subject, CacheDataKind::DirectGroupIds, CachedData::GroupIds(Arc::new(ids)));
    }

    /// Store derived data on an entry unless caching is off.
    pub(crate) fn remember(&self, entry: &Entry, kind: CacheDataKind, data: CachedData) {
        if self.config().cache_mode == CacheMode::Default {
            entry.cache(kind, data);
        }
    }
}

/// Static groups and system-managed dynamic groups. Custom-filter groups
/// have no membership edges to follow.
fn is_resolvable_group(group: &Entry) -> bool {
    match group.kind() {
        EntryKind::StaticGroup => true,
        EntryKind::DynamicGroup => !schema::is_true(group.attr(schema::IS_CUSTOM_FILTER).as_deref()),
        _ => false,
    }
}

fn member_of(group: &Entry, via: Option<EntryId>) -> MemberOf {
    MemberOf {
        id: group.id().clone(),
        name: group.name(),
        is_admin_group: schema::is_true(group.attr(schema::IS_ADMIN_GROUP).as_deref()),
        is_dynamic: group.kind() == EntryKind::DynamicGroup,
        via,
    }
}

/// Expand directly containing groups into the full containment set.
///
/// Each group is reported once. Direct groups have no `via`; every other
/// group records the direct group through which it was first reached.
pub(crate) fn transitive_closure<F>(
    direct: Vec<Arc<Entry>>,
    mut parents_of: F,
) -> Result<Vec<MemberOf>, CoreError>
where
    F: FnMut(&Arc<Entry>) -> Result<Vec<Arc<Entry>>, CoreError>,
{
    let mut visited: HashSet<EntryId> = HashSet::new();
    let mut result = Vec::new();
    let mut stack: Vec<(Arc<Entry>, EntryId)> = Vec::new();

    for group in direct {
        if visited.insert(group.id().clone()) {
            result.push(member_of(&group, None));
            let root = group.id().clone();
            stack.push((group, root));
        }
    }
    // Direct groups were recorded above; popping them only expands.
    let mut expanded: HashSet<EntryId> = HashSet::new();

    while let Some((group, root)) = stack.pop() {
        if !expanded.insert(group.id().clone()) {
            continue;
        }
        for parent in parents_of(&group)? {
            if visited.insert(parent.id().clone()) {
                result.push(member_of(&parent, Some(root.clone())));
            }
            if !expanded.contains(parent.id()) {
                stack.push((parent, root.clone()));
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use dirprov_api::{Attributes, Dn};

    use super::*;

    fn group(name: &str) -> Arc<Entry> {
        Arc::new(Entry::new(
            EntryId::generate(),
            EntryKind::StaticGroup,
            name.into(),
            Dn::root(),
            Attributes::new(),
        ))
    }

    #[test]
    fn closure_terminates_on_cycles() {
        let g1 = group("g1@a.com");
        let g2 = group("g2@a.com");
        let g3 = group("g3@a.com");
        let parents: HashMap<EntryId, Vec<Arc<Entry>>> = HashMap::from([
            (g1.id().clone(), vec![Arc::clone(&g2)]),
            (g2.id().clone(), vec![Arc::clone(&g3)]),
            (g3.id().clone(), vec![Arc::clone(&g1)]),
        ]);

        let result = transitive_closure(vec![Arc::clone(&g1)], |g| {
            Ok(parents.get(g.id()).cloned().unwrap_or_default())
        })
        .unwrap();

        let mut names: Vec<_> = result.iter().map(|m| m.name.clone()).collect();
        names.sort();
        assert_eq!(names, ["g1@a.com", "g2@a.com", "g3@a.com"]);
        assert_eq!(result.iter().filter(|m| m.via.is_none()).count(), 1);
        assert!(
            result
                .iter()
                .filter(|m| m.via.is_some())
                .all(|m| m.via.as_ref() == Some(g1.id()))
        );
    }

    #[test]
    fn direct_groups_never_get_a_via() {
        // g1 is direct and also reachable through g2.
        let g1 = group("g1@a.com");
        let g2 = group("g2@a.com");
        let parents: HashMap<EntryId, Vec<Arc<Entry>>> =
            HashMap::from([(g2.id().clone(), vec![Arc::clone(&g1)])]);

        let result = transitive_closure(vec![Arc::clone(&g2), Arc::clone(&g1)], |g| {
            Ok(parents.get(g.id()).cloned().unwrap_or_default())
        })
        .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(MemberOf::is_direct));
    }

    #[test]
    fn closure_propagates_lookup_errors() {
        let g1 = group("g1@a.com");
        let err = transitive_closure(vec![g1], |_| Err(CoreError::Internal("boom".into())));
        assert!(err.is_err());
    }
}
