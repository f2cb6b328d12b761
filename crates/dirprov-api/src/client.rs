// ── Directory client contract ──
//
// Everything the provisioning core needs from a directory store. Calls
// are synchronous and blocking; routing is a hint the implementation may
// ignore. Implementations never retry on their own.

use serde::{Deserialize, Serialize};

use crate::attrs::{Attributes, Modification};
use crate::dn::Dn;
use crate::error::Error;
use crate::filter::Filter;

/// Default number of hits delivered per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Where a call should be served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    /// Read-your-writes: go to the writable master.
    PreferMaster,
    /// Any replica is acceptable.
    #[default]
    PreferReplica,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Only the base entry itself.
    Base,
    /// Direct children of the base.
    One,
    /// The base and everything below it.
    #[default]
    Subtree,
}

/// Parameters for a paged search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub base: Dn,
    pub scope: Scope,
    pub filter: Filter,
    /// Attributes to return; empty means all.
    pub attrs: Vec<String>,
    pub routing: Routing,
    pub page_size: usize,
}

impl SearchRequest {
    pub fn subtree(base: Dn, filter: Filter) -> Self {
        Self {
            base,
            scope: Scope::Subtree,
            filter,
            attrs: Vec::new(),
            routing: Routing::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = attrs.into_iter().map(Into::into).collect();
        self
    }
}

/// One entry delivered by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub dn: Dn,
    pub attrs: Attributes,
}

/// Visitor verdict after each hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

/// Blocking access to a hierarchical directory store.
pub trait DirectoryClient: Send + Sync {
    /// Create an entry. Fails with `AlreadyExists` on a name collision and
    /// `NoSuchEntry` when the parent is missing.
    fn create(&self, dn: &Dn, attrs: Attributes) -> Result<(), Error>;

    fn modify(&self, dn: &Dn, mods: &[Modification]) -> Result<(), Error>;

    /// Delete a leaf entry.
    fn delete(&self, dn: &Dn) -> Result<(), Error>;

    /// Move an entry (and its subtree) to a new location. The naming
    /// attribute is updated to the new leftmost value.
    fn rename(&self, from: &Dn, to: &Dn) -> Result<(), Error>;

    /// Fetch an entry's attributes; `Ok(None)` when it does not exist.
    fn get(&self, dn: &Dn, routing: Routing) -> Result<Option<Attributes>, Error>;

    /// Paged search. The visitor sees hits one at a time and may stop early.
    fn search(
        &self,
        request: &SearchRequest,
        visitor: &mut dyn FnMut(SearchHit) -> Visit,
    ) -> Result<(), Error>;

    /// Collect every hit of a search.
    fn search_all(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, Error> {
        let mut hits = Vec::new();
        self.search(request, &mut |hit| {
            hits.push(hit);
            Visit::Continue
        })?;
        Ok(hits)
    }

    /// Whether an entry exists at `dn`.
    fn exists(&self, dn: &Dn, routing: Routing) -> Result<bool, Error> {
        Ok(self.get(dn, routing)?.is_some())
    }
}
