use serde::{Deserialize, Serialize};

use super::ids::EntryId;

/// One group in a subject's membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberOf {
    pub id: EntryId,
    pub name: String,
    pub is_admin_group: bool,
    pub is_dynamic: bool,
    /// For indirectly reached groups: the directly containing group through
    /// which this one was first discovered. `None` for direct membership.
    pub via: Option<EntryId>,
}

impl MemberOf {
    pub fn is_direct(&self) -> bool {
        self.via.is_none()
    }
}

/// Every group containing a subject, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    groups: Vec<MemberOf>,
}

impl GroupMembership {
    pub fn new(mut groups: Vec<MemberOf>) -> Self {
        groups.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Self { groups }
    }

    pub fn groups(&self) -> &[MemberOf] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_ids(&self) -> Vec<EntryId> {
        self.groups.iter().map(|g| g.id.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name.clone()).collect()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.groups.iter().any(|g| &g.id == id)
    }

    pub fn get(&self, id: &EntryId) -> Option<&MemberOf> {
        self.groups.iter().find(|g| &g.id == id)
    }

    /// Only the admin-relevant groups.
    pub fn admin_only(&self) -> Self {
        Self {
            groups: self
                .groups
                .iter()
                .filter(|g| g.is_admin_group)
                .cloned()
                .collect(),
        }
    }

    /// Only groups containing the subject directly.
    pub fn direct_only(&self) -> Self {
        Self {
            groups: self.groups.iter().filter(|g| g.is_direct()).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, admin: bool, via: Option<EntryId>) -> MemberOf {
        MemberOf {
            id: EntryId::generate(),
            name: name.into(),
            is_admin_group: admin,
            is_dynamic: false,
            via,
        }
    }

    #[test]
    fn sorted_and_filtered() {
        let root = member("b@x.com", false, None);
        let nested = member("a@x.com", true, Some(root.id.clone()));
        let membership = GroupMembership::new(vec![root.clone(), nested.clone()]);

        assert_eq!(membership.names(), ["a@x.com", "b@x.com"]);
        assert_eq!(membership.admin_only().group_ids(), [nested.id.clone()]);
        assert_eq!(membership.direct_only().group_ids(), [root.id.clone()]);
        assert!(membership.contains(&nested.id));
        assert_eq!(membership.get(&nested.id).and_then(|m| m.via.clone()), Some(root.id));
    }
}
