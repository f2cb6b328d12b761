// ── Directory entry ──
//
// One live object read from the directory. The id and kind never change;
// name, location and attributes are refreshed in place after mutations so
// every holder of the same `Arc<Entry>` sees the update. Derived values
// (membership, member lists) live in a small typed side-table whose
// lifetime is the instance's and which is cleared on every refresh.

use std::collections::HashMap;
use std::sync::Arc;

use dirprov_api::{Attributes, Dn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::EntryId;
use super::membership::GroupMembership;
use crate::schema;

// ── EntryKind ───────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Account,
    Alias,
    StaticGroup,
    DynamicGroup,
    DynamicGroupUnit,
    Domain,
    Cos,
    Server,
    UcService,
}

impl EntryKind {
    /// The object class that marks entries of this kind.
    pub fn object_class(self) -> &'static str {
        match self {
            Self::Account => schema::OC_ACCOUNT,
            Self::Alias => schema::OC_ALIAS,
            Self::StaticGroup => schema::OC_STATIC_GROUP,
            Self::DynamicGroup => schema::OC_DYNAMIC_GROUP,
            Self::DynamicGroupUnit => schema::OC_DYNAMIC_GROUP_UNIT,
            Self::Domain => schema::OC_DOMAIN,
            Self::Cos => schema::OC_COS,
            Self::Server => schema::OC_SERVER,
            Self::UcService => schema::OC_UC_SERVICE,
        }
    }

    pub fn from_attrs(attrs: &Attributes) -> Option<Self> {
        [
            Self::Account,
            Self::Alias,
            Self::StaticGroup,
            Self::DynamicGroup,
            Self::DynamicGroupUnit,
            Self::Domain,
            Self::Cos,
            Self::Server,
            Self::UcService,
        ]
        .into_iter()
        .find(|kind| attrs.has_object_class(kind.object_class()))
    }

    pub fn is_group(self) -> bool {
        matches!(self, Self::StaticGroup | Self::DynamicGroup)
    }

    /// Kinds named by an email-style address under a domain.
    pub fn is_addressable(self) -> bool {
        matches!(
            self,
            Self::Account | Self::Alias | Self::StaticGroup | Self::DynamicGroup
        )
    }

    /// Kinds that can carry the dynamic group back-reference.
    pub fn carries_back_reference(self) -> bool {
        matches!(self, Self::Account | Self::StaticGroup)
    }
}

// ── Cached derived data ─────────────────────────────────────────────

/// Closed set of values the engine caches on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheDataKind {
    /// Full transitive group membership.
    Membership,
    /// Admin-group subset of the membership.
    AdminMembership,
    /// Ids of directly containing groups.
    DirectGroupIds,
    /// Member list of a dynamic group.
    DynamicMembers,
}

impl CacheDataKind {
    /// Everything derived from who contains this entry.
    pub const MEMBERSHIP: [Self; 3] = [
        Self::Membership,
        Self::AdminMembership,
        Self::DirectGroupIds,
    ];
}

#[derive(Debug, Clone)]
pub enum CachedData {
    Membership(Arc<GroupMembership>),
    GroupIds(Arc<Vec<EntryId>>),
    Members(Arc<Vec<String>>),
}

// ── Entry ───────────────────────────────────────────────────────────

#[derive(Debug)]
struct EntryState {
    name: String,
    dn: Dn,
    attrs: Attributes,
}

/// A live directory object.
#[derive(Debug)]
pub struct Entry {
    id: EntryId,
    kind: EntryKind,
    state: RwLock<EntryState>,
    cached: Mutex<HashMap<CacheDataKind, CachedData>>,
}

impl Entry {
    pub fn new(id: EntryId, kind: EntryKind, name: String, dn: Dn, attrs: Attributes) -> Self {
        Self {
            id,
            kind,
            state: RwLock::new(EntryState { name, dn, attrs }),
            cached: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Canonical name: the address for mail objects, the plain name otherwise.
    pub fn name(&self) -> String {
        self.state.read().name.clone()
    }

    pub fn dn(&self) -> Dn {
        self.state.read().dn.clone()
    }

    pub fn attrs(&self) -> Attributes {
        self.state.read().attrs.clone()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.state.read().attrs.get_one(name).map(str::to_owned)
    }

    pub fn attr_values(&self, name: &str) -> Vec<String> {
        self.state.read().attrs.get_all(name).to_vec()
    }

    pub fn has_value(&self, attr: &str, value: &str) -> bool {
        self.state.read().attrs.has_value(attr, value)
    }

    /// Replace name, location and attributes in place and drop every
    /// derived value cached on this instance.
    pub fn refresh(&self, name: String, dn: Dn, attrs: Attributes) {
        *self.state.write() = EntryState { name, dn, attrs };
        self.cached.lock().clear();
    }

    // ── Side-table ──────────────────────────────────────────────────

    pub fn cached(&self, kind: CacheDataKind) -> Option<CachedData> {
        self.cached.lock().get(&kind).cloned()
    }

    pub fn cache(&self, kind: CacheDataKind, data: CachedData) {
        self.cached.lock().insert(kind, data);
    }

    pub fn invalidate(&self, kinds: &[CacheDataKind]) {
        let mut cached = self.cached.lock();
        for kind in kinds {
            cached.remove(kind);
        }
    }

    pub fn invalidate_all(&self) {
        self.cached.lock().clear();
    }

    /// Serializable point-in-time copy.
    pub fn view(&self) -> EntryView {
        let state = self.state.read();
        EntryView {
            id: self.id.clone(),
            kind: self.kind,
            name: state.name.clone(),
            dn: state.dn.clone(),
            attributes: state.attrs.clone(),
        }
    }
}

/// Plain-data snapshot of an [`Entry`] for output and inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub id: EntryId,
    pub kind: EntryKind,
    pub name: String,
    pub dn: Dn,
    pub attributes: Attributes,
}
