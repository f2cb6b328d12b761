// ── Capabilities ──
//
// Algorithms ask for the smallest capability they need instead of
// branching on concrete object types: renames need `Nameable`, alias
// handling needs `Aliasable`, membership resolution needs `GroupMember`.

use std::sync::Arc;

use super::entry::Entry;
use super::ids::EntryId;
use crate::schema;

/// Anything with an id and a canonical name.
pub trait Nameable {
    fn entry(&self) -> &Arc<Entry>;

    // Inherent calls: `Arc<Entry>` implements this trait too, so plain
    // method syntax would resolve back here.
    fn id(&self) -> &EntryId {
        Entry::id(self.entry())
    }

    fn name(&self) -> String {
        Entry::name(self.entry())
    }
}

/// Objects that can own alias addresses.
pub trait Aliasable: Nameable {
    fn alias_addresses(&self) -> Vec<String> {
        Entry::attr_values(self.entry(), schema::MAIL_ALIAS)
    }
}

/// Objects that can be members of groups.
pub trait GroupMember: Aliasable {
    /// Every address the subject can be listed under in a static group:
    /// its primary name followed by its aliases, lowercased and deduplicated.
    fn member_addresses(&self) -> Vec<String> {
        let mut addrs = vec![self.name().to_lowercase()];
        for alias in self.alias_addresses() {
            let alias = alias.to_lowercase();
            if !addrs.contains(&alias) {
                addrs.push(alias);
            }
        }
        addrs
    }

    /// Dynamic groups named by this subject's back-reference attribute.
    fn back_reference_ids(&self) -> Vec<EntryId> {
        Entry::attr_values(self.entry(), schema::MEMBER_OF)
            .into_iter()
            .map(EntryId::from)
            .collect()
    }
}
