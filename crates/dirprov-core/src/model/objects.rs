// ── Typed object views ──
//
// Thin wrappers around a shared `Arc<Entry>` that expose the attributes
// each object kind actually has. Construction checks the entry's kind
// tag once; accessors never type-test again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::capability::{Aliasable, GroupMember, Nameable};
use super::entry::{Entry, EntryKind, EntryView};
use super::ids::EntryId;
use crate::error::CoreError;
use crate::schema;

// ── Status enums ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Pending,
    Maintenance,
    Locked,
    /// Set automatically after too many failed logins.
    Lockout,
    Closed,
}

impl AccountStatus {
    pub fn allows_login(self) -> bool {
        self == Self::Active
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    #[default]
    Local,
    /// Forwards to another domain; cannot hold renamed objects.
    Alias,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    #[default]
    Active,
    Maintenance,
    Locked,
    Closed,
    Suspended,
    /// Mid-rename; no provisioning allowed.
    Shutdown,
}

fn expect_kind(entry: &Entry, kinds: &[EntryKind]) -> Result<(), CoreError> {
    if kinds.contains(&entry.kind()) {
        Ok(())
    } else {
        Err(CoreError::Internal(format!(
            "{} is a {}, expected one of {kinds:?}",
            entry.name(),
            entry.kind()
        )))
    }
}

// ── Account ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Account(Arc<Entry>);

impl Account {
    pub fn from_entry(entry: Arc<Entry>) -> Result<Self, CoreError> {
        expect_kind(&entry, &[EntryKind::Account])?;
        Ok(Self(entry))
    }

    pub fn status(&self) -> AccountStatus {
        self.0
            .attr(schema::ACCOUNT_STATUS)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn cos_id(&self) -> Option<EntryId> {
        self.0.attr(schema::COS_ID).map(EntryId::from)
    }

    pub fn failed_login_count(&self) -> u32 {
        self.0
            .attr(schema::FAILED_LOGIN_COUNT)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_delegated_admin(&self) -> bool {
        schema::is_true(self.0.attr(schema::IS_DELEGATED_ADMIN).as_deref())
    }

    pub fn view(&self) -> EntryView {
        self.0.view()
    }

    pub fn into_entry(self) -> Arc<Entry> {
        self.0
    }
}

// ── Group ───────────────────────────────────────────────────────────

/// A static or dynamic group.
#[derive(Debug, Clone)]
pub struct Group(Arc<Entry>);

impl Group {
    pub fn from_entry(entry: Arc<Entry>) -> Result<Self, CoreError> {
        expect_kind(&entry, &[EntryKind::StaticGroup, EntryKind::DynamicGroup])?;
        Ok(Self(entry))
    }

    pub fn is_dynamic(&self) -> bool {
        self.0.kind() == EntryKind::DynamicGroup
    }

    /// Dynamic group defined by an administrator-supplied filter.
    pub fn is_custom(&self) -> bool {
        self.is_dynamic() && schema::is_true(self.0.attr(schema::IS_CUSTOM_FILTER).as_deref())
    }

    pub fn is_admin_group(&self) -> bool {
        schema::is_true(self.0.attr(schema::IS_ADMIN_GROUP).as_deref())
    }

    pub fn member_url(&self) -> Option<String> {
        self.0.attr(schema::MEMBER_URL)
    }

    /// Flat member list of a static group (empty for dynamic groups).
    pub fn static_members(&self) -> Vec<String> {
        if self.is_dynamic() {
            return Vec::new();
        }
        self.0.attr_values(schema::MAIL_FORWARDING_ADDRESS)
    }

    pub fn view(&self) -> EntryView {
        self.0.view()
    }

    pub fn into_entry(self) -> Arc<Entry> {
        self.0
    }
}

// ── Domain ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Domain(Arc<Entry>);

impl Domain {
    pub fn from_entry(entry: Arc<Entry>) -> Result<Self, CoreError> {
        expect_kind(&entry, &[EntryKind::Domain])?;
        Ok(Self(entry))
    }

    pub fn domain_type(&self) -> DomainType {
        self.0
            .attr(schema::DOMAIN_TYPE)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn is_local(&self) -> bool {
        self.domain_type() == DomainType::Local
    }

    pub fn status(&self) -> DomainStatus {
        self.0
            .attr(schema::DOMAIN_STATUS)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Target of an alias domain.
    pub fn alias_target_id(&self) -> Option<EntryId> {
        self.0.attr(schema::DOMAIN_ALIAS_TARGET_ID).map(EntryId::from)
    }

    pub fn virtual_hostnames(&self) -> Vec<String> {
        self.0.attr_values(schema::VIRTUAL_HOSTNAME)
    }

    /// Raw progress marker of an interrupted rename, if any.
    pub fn rename_info(&self) -> Option<String> {
        self.0.attr(schema::DOMAIN_RENAME_INFO)
    }

    pub fn view(&self) -> EntryView {
        self.0.view()
    }

    pub fn into_entry(self) -> Arc<Entry> {
        self.0
    }
}

// ── Configuration objects ───────────────────────────────────────────

/// Class of service.
#[derive(Debug, Clone)]
pub struct Cos(Arc<Entry>);

impl Cos {
    pub fn from_entry(entry: Arc<Entry>) -> Result<Self, CoreError> {
        expect_kind(&entry, &[EntryKind::Cos])?;
        Ok(Self(entry))
    }

    pub fn view(&self) -> EntryView {
        self.0.view()
    }
}

/// A server or UC service registration.
#[derive(Debug, Clone)]
pub struct Server(Arc<Entry>);

impl Server {
    pub fn from_entry(entry: Arc<Entry>) -> Result<Self, CoreError> {
        expect_kind(&entry, &[EntryKind::Server, EntryKind::UcService])?;
        Ok(Self(entry))
    }

    pub fn is_uc_service(&self) -> bool {
        self.0.kind() == EntryKind::UcService
    }

    pub fn view(&self) -> EntryView {
        self.0.view()
    }
}

// ── Capability impls ────────────────────────────────────────────────

impl Nameable for Arc<Entry> {
    fn entry(&self) -> &Arc<Entry> {
        self
    }
}

impl Aliasable for Arc<Entry> {}
impl GroupMember for Arc<Entry> {}

impl Nameable for Account {
    fn entry(&self) -> &Arc<Entry> {
        &self.0
    }
}

impl Aliasable for Account {}
impl GroupMember for Account {}

impl Nameable for Group {
    fn entry(&self) -> &Arc<Entry> {
        &self.0
    }
}

impl Aliasable for Group {}
impl GroupMember for Group {}

impl Nameable for Domain {
    fn entry(&self) -> &Arc<Entry> {
        &self.0
    }
}

impl Nameable for Cos {
    fn entry(&self) -> &Arc<Entry> {
        &self.0
    }
}

impl Nameable for Server {
    fn entry(&self) -> &Arc<Entry> {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dirprov_api::{Attributes, Dn};

    fn entry(kind: EntryKind, name: &str, attrs: Attributes) -> Arc<Entry> {
        Arc::new(Entry::new(
            EntryId::generate(),
            kind,
            name.into(),
            Dn::root(),
            attrs,
        ))
    }

    #[test]
    fn wrappers_check_kind() {
        let acct = entry(EntryKind::Account, "a@x.com", Attributes::new());
        assert!(Account::from_entry(acct.clone()).is_ok());
        assert!(Group::from_entry(acct).is_err());
    }

    #[test]
    fn account_defaults() {
        let acct = Account::from_entry(entry(
            EntryKind::Account,
            "a@x.com",
            Attributes::new()
                .with(schema::FAILED_LOGIN_COUNT, "3")
                .with(schema::ACCOUNT_STATUS, "LOCKOUT"),
        ))
        .unwrap();
        assert_eq!(acct.status(), AccountStatus::Lockout);
        assert_eq!(acct.failed_login_count(), 3);
        assert!(!acct.status().allows_login());
    }

    #[test]
    fn capability_accessors_reach_the_entry() {
        let raw = entry(
            EntryKind::Account,
            "a@x.com",
            Attributes::new().with(schema::MAIL_ALIAS, "b@x.com"),
        );
        let id = Entry::id(&raw).clone();
        let acct = Account::from_entry(raw.clone()).unwrap();

        assert_eq!(acct.id(), &id);
        assert_eq!(acct.name(), "a@x.com");
        assert_eq!(acct.alias_addresses(), ["b@x.com"]);
        // The shared handle answers through the same trait.
        assert_eq!(Nameable::id(&raw), &id);
        assert_eq!(Nameable::name(&raw), "a@x.com");
        assert!(acct.back_reference_ids().is_empty());
    }

    #[test]
    fn member_addresses_dedupe() {
        let acct = Account::from_entry(entry(
            EntryKind::Account,
            "a@x.com",
            Attributes::new().with_values(schema::MAIL_ALIAS, ["B@x.com", "a@X.com", "b@x.com"]),
        ))
        .unwrap();
        assert_eq!(acct.member_addresses(), ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn custom_groups_are_dynamic_only() {
        let stat = Group::from_entry(entry(
            EntryKind::StaticGroup,
            "g@x.com",
            Attributes::new().with(schema::IS_CUSTOM_FILTER, "TRUE"),
        ))
        .unwrap();
        assert!(!stat.is_custom());

        let dynamic = Group::from_entry(entry(
            EntryKind::DynamicGroup,
            "d@x.com",
            Attributes::new().with(schema::IS_CUSTOM_FILTER, "TRUE"),
        ))
        .unwrap();
        assert!(dynamic.is_custom());
    }
}
