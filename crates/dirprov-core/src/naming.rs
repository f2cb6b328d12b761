// ── DIT naming ──
//
// Pure functions from (kind, key, domain) to a directory location and
// back. Every create, rename and search computes its location here;
// nothing in the engine builds a DN by hand.

use dirprov_api::Dn;

use crate::config::DitConfig;
use crate::error::CoreError;
use crate::model::{EntryKind, validate_domain_name};
use crate::schema;

/// Which half of a dynamic group's member storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Selects accounts whose back-reference names the group.
    Internal,
    /// Flat list of addresses with no account behind them.
    External,
}

impl Unit {
    pub fn rdn_value(self) -> &'static str {
        match self {
            Self::Internal => schema::INTERNAL_UNIT,
            Self::External => schema::EXTERNAL_UNIT,
        }
    }
}

/// Location templates for every entity kind.
#[derive(Debug, Clone)]
pub struct DitLayout {
    config: DitConfig,
}

impl Default for DitLayout {
    fn default() -> Self {
        Self::new(DitConfig::default())
    }
}

impl DitLayout {
    pub fn new(config: DitConfig) -> Self {
        Self { config }
    }

    /// The naming attribute entries of `kind` are created with.
    pub fn naming_attr(kind: EntryKind) -> &'static str {
        match kind {
            EntryKind::Account | EntryKind::Alias | EntryKind::StaticGroup => schema::UID,
            EntryKind::Domain => schema::DC,
            EntryKind::DynamicGroup
            | EntryKind::DynamicGroupUnit
            | EntryKind::Cos
            | EntryKind::Server
            | EntryKind::UcService => schema::CN,
        }
    }

    // ── Fixed bases ─────────────────────────────────────────────────

    /// `a.b.com` -> `dc=a,dc=b,dc=com`.
    pub fn domain_dn(&self, domain: &str) -> Result<Dn, CoreError> {
        let domain = domain.trim().to_lowercase();
        validate_domain_name(&domain)?;
        Ok(domain
            .split('.')
            .rev()
            .fold(Dn::root(), |dn, label| dn.child(schema::DC, label)))
    }

    pub fn account_base(&self, domain: &str) -> Result<Dn, CoreError> {
        Ok(self
            .domain_dn(domain)?
            .child(schema::OU, self.config.people_container.as_str()))
    }

    pub fn group_base(&self, domain: &str) -> Result<Dn, CoreError> {
        Ok(self
            .domain_dn(domain)?
            .child(schema::CN, self.config.groups_container.as_str()))
    }

    pub fn config_dn(&self) -> Dn {
        Dn::rdn(schema::CN, self.config.config_root.as_str())
    }

    pub fn cos_base(&self) -> Dn {
        self.config_dn().child(schema::CN, schema::COS_CONTAINER)
    }

    pub fn server_base(&self) -> Dn {
        self.config_dn().child(schema::CN, schema::SERVER_CONTAINER)
    }

    pub fn uc_service_base(&self) -> Dn {
        self.config_dn().child(schema::CN, schema::UC_SERVICE_CONTAINER)
    }

    /// Home of domainless (global admin) accounts.
    pub fn admin_base(&self) -> Dn {
        self.config_dn().child(schema::CN, schema::ADMIN_CONTAINER)
    }

    // ── Locations ───────────────────────────────────────────────────

    /// Deterministic location of an entry.
    ///
    /// Mail objects need a domain, except accounts: a domainless account
    /// is an administrator living under the configuration root. Domains
    /// ignore the context and are located by their own name.
    pub fn location_for(
        &self,
        kind: EntryKind,
        local_key: &str,
        domain: Option<&str>,
    ) -> Result<Dn, CoreError> {
        let key = local_key.trim();
        if key.is_empty() {
            return Err(CoreError::validation(format!("empty {kind} name")));
        }

        match (kind, domain) {
            (EntryKind::Account, None) => Ok(self.admin_base().child(schema::UID, key)),
            (EntryKind::Account | EntryKind::Alias | EntryKind::StaticGroup, Some(domain)) => {
                Ok(self.account_base(domain)?.child(schema::UID, key))
            }
            (EntryKind::DynamicGroup, Some(domain)) => {
                Ok(self.group_base(domain)?.child(schema::CN, key))
            }
            (EntryKind::Alias | EntryKind::StaticGroup | EntryKind::DynamicGroup, None) => Err(
                CoreError::validation(format!("{kind} '{key}' needs a domain")),
            ),
            (EntryKind::DynamicGroupUnit, _) => Err(CoreError::Internal(
                "dynamic group units are located relative to their group".into(),
            )),
            (EntryKind::Domain, _) => self.domain_dn(key),
            (EntryKind::Cos, _) => Ok(self.cos_base().child(schema::CN, key)),
            (EntryKind::Server, _) => Ok(self.server_base().child(schema::CN, key)),
            (EntryKind::UcService, _) => Ok(self.uc_service_base().child(schema::CN, key)),
        }
    }

    pub fn unit_location(&self, group_dn: &Dn, unit: Unit) -> Dn {
        group_dn.child(schema::CN, unit.rdn_value())
    }

    /// Parse an address back out of a location.
    ///
    /// The leftmost component must use the primary naming attribute, or
    /// `alt_naming_attr` when given (dynamic groups are named by `cn`).
    /// Every `dc` component contributes a label of the domain.
    pub fn address_from_location(
        &self,
        dn: &Dn,
        alt_naming_attr: Option<&str>,
    ) -> Result<String, CoreError> {
        let Some(first) = dn.first() else {
            return Err(CoreError::validation("the directory root has no address"));
        };
        let naming_ok = first.is(schema::UID) || alt_naming_attr.is_some_and(|alt| first.is(alt));
        if !naming_ok {
            return Err(CoreError::validation(format!(
                "{dn}: leftmost component is not a naming attribute"
            )));
        }

        let labels: Vec<&str> = dn
            .rdns()
            .iter()
            .filter(|rdn| rdn.is(schema::DC))
            .map(dirprov_api::Rdn::value)
            .collect();
        if labels.is_empty() {
            return Ok(first.value().to_owned());
        }
        Ok(format!("{}@{}", first.value(), labels.join(".")).to_lowercase())
    }

    // ── Search roots ────────────────────────────────────────────────

    /// Minimal set of roots covering every requested kind.
    ///
    /// A candidate is dropped when an already selected root is its
    /// ancestor; selected roots below a new candidate are replaced by it.
    pub fn search_roots_for(
        &self,
        kinds: &[EntryKind],
        domain: Option<&str>,
    ) -> Result<Vec<Dn>, CoreError> {
        let mut roots: Vec<Dn> = Vec::new();
        for kind in kinds {
            for candidate in self.roots_for_kind(*kind, domain)? {
                if roots.iter().any(|selected| candidate.is_under(selected)) {
                    continue;
                }
                roots.retain(|selected| !selected.is_under(&candidate));
                roots.push(candidate);
            }
        }
        Ok(roots)
    }

    fn roots_for_kind(&self, kind: EntryKind, domain: Option<&str>) -> Result<Vec<Dn>, CoreError> {
        Ok(match (kind, domain) {
            (EntryKind::Account, Some(d)) => vec![self.account_base(d)?],
            (EntryKind::Account, None) => vec![Dn::root()],
            (EntryKind::Alias | EntryKind::StaticGroup, Some(d)) => vec![self.account_base(d)?],
            (EntryKind::DynamicGroup | EntryKind::DynamicGroupUnit, Some(d)) => {
                vec![self.group_base(d)?]
            }
            (EntryKind::Domain, Some(d)) => vec![self.domain_dn(d)?],
            (
                EntryKind::Alias
                | EntryKind::StaticGroup
                | EntryKind::DynamicGroup
                | EntryKind::DynamicGroupUnit
                | EntryKind::Domain,
                None,
            ) => vec![Dn::root()],
            (EntryKind::Cos, _) => vec![self.cos_base()],
            (EntryKind::Server, _) => vec![self.server_base()],
            (EntryKind::UcService, _) => vec![self.uc_service_base()],
        })
    }
}
