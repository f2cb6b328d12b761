// ── Domain model ──
//
// Entries, identities and the typed views the engine hands out.

pub mod capability;
pub mod entry;
pub mod ids;
pub mod membership;
pub mod objects;

pub use capability::{Aliasable, GroupMember, Nameable};
pub use entry::{CacheDataKind, CachedData, Entry, EntryKind, EntryView};
pub use ids::{Address, EntryId, validate_domain_name};
pub use membership::{GroupMembership, MemberOf};
pub use objects::{Account, AccountStatus, Cos, Domain, DomainStatus, DomainType, Group, Server};
