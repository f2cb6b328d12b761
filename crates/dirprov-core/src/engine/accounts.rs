// ── Accounts ──

use std::sync::Arc;

use dirprov_api::{Attributes, Filter, Modification};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use super::Provisioning;
use crate::cascade::{CascadeAction, CascadeReport};
use crate::error::CoreError;
use crate::model::{
    Account, AccountStatus, Address, Aliasable, CacheDataKind, Entry, EntryId, EntryKind,
    GroupMember, Nameable,
};
use crate::schema;

/// Attributes callers may not set directly on create.
const MANAGED_ATTRS: [&str; 4] = [
    schema::OBJECT_CLASS,
    schema::ENTRY_ID,
    schema::MAIL_ALIAS,
    schema::MEMBER_OF,
];

impl Provisioning {
    /// Create an account at `address`.
    ///
    /// The address must be free everywhere: no account, alias or group
    /// may be named by it and no dynamic group may list it as an external
    /// member.
    pub fn create_account(
        &self,
        address: &str,
        password: Option<&SecretString>,
        attrs: Attributes,
    ) -> Result<Account, CoreError> {
        let address = Address::parse(address)?;
        self.require_local_domain(address.domain())?;
        if self.address_in_use(&address)? {
            return Err(CoreError::collision("address", address.as_str()));
        }

        let dn = self
            .layout()
            .location_for(EntryKind::Account, address.local(), Some(address.domain()))?;
        let id = EntryId::generate();
        let mut full = Self::base_attrs(EntryKind::Account, &id);
        merge_user_attrs(&mut full, &attrs);
        full.set(schema::MAIL, [address.as_str()]);
        if !full.contains(schema::ACCOUNT_STATUS) {
            full.set(schema::ACCOUNT_STATUS, [AccountStatus::Active.to_string()]);
        }
        if let Some(password) = password {
            full.set(schema::USER_PASSWORD, [password.expose_secret()]);
        }

        let entry = self
            .create_and_load(EntryKind::Account, &dn, full)
            .map_err(|e| collision_as(e, "account", address.as_str()))?;
        info!(account = %address, id = %id, "account created");
        Account::from_entry(entry)
    }

    /// Create a domainless administrator under the configuration root.
    pub fn create_admin_account(
        &self,
        name: &str,
        password: Option<&SecretString>,
        attrs: Attributes,
    ) -> Result<Account, CoreError> {
        let name = name.trim().to_lowercase();
        if name.contains('@') {
            return Err(CoreError::validation(format!(
                "admin account name '{name}' cannot contain '@'"
            )));
        }
        let layout = self.layout();
        let dn = layout.location_for(EntryKind::Account, &name, None)?;
        self.ensure_container(&layout.config_dn())?;
        self.ensure_container(&layout.admin_base())?;

        let id = EntryId::generate();
        let mut full = Self::base_attrs(EntryKind::Account, &id);
        merge_user_attrs(&mut full, &attrs);
        full.set(schema::ACCOUNT_STATUS, [AccountStatus::Active.to_string()]);
        full.set(schema::IS_DELEGATED_ADMIN, [schema::TRUE]);
        if let Some(password) = password {
            full.set(schema::USER_PASSWORD, [password.expose_secret()]);
        }
        let entry = self
            .create_and_load(EntryKind::Account, &dn, full)
            .map_err(|e| collision_as(e, "account", &name))?;
        info!(account = %name, "admin account created");
        Account::from_entry(entry)
    }

    // ── Lookups ─────────────────────────────────────────────────────

    /// Look up an account by address, following aliases. Names without
    /// '@' are domainless administrators.
    pub fn get_account_by_name(&self, name: &str) -> Result<Account, CoreError> {
        self.find_account(name)?
            .ok_or_else(|| CoreError::not_found("account", name))
    }

    pub fn get_account_by_id(&self, id: &EntryId) -> Result<Account, CoreError> {
        self.find_entry_by_id(id)?
            .filter(|e| e.kind() == EntryKind::Account)
            .map(Account::from_entry)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("account", id.to_string()))
    }

    pub fn get_account_by_foreign_principal(&self, principal: &str) -> Result<Account, CoreError> {
        if let Some(entry) = self.caches().accounts.get_by_foreign_principal(principal) {
            return Account::from_entry(entry);
        }
        let filter = Filter::and([
            Filter::eq(schema::OBJECT_CLASS, schema::OC_ACCOUNT),
            Filter::eq(schema::FOREIGN_PRINCIPAL, principal),
        ]);
        self.search_entries(&[dirprov_api::Dn::root()], &filter)?
            .into_iter()
            .next()
            .map(Account::from_entry)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("account", principal))
    }

    /// Accounts of one domain (or all), sorted by name.
    pub fn list_accounts(&self, domain: Option<&str>) -> Result<Vec<Account>, CoreError> {
        let roots = self.layout().search_roots_for(&[EntryKind::Account], domain)?;
        let filter = Filter::eq(schema::OBJECT_CLASS, schema::OC_ACCOUNT);
        let mut accounts = self
            .search_entries(&roots, &filter)?
            .into_iter()
            .map(Account::from_entry)
            .collect::<Result<Vec<_>, _>>()?;
        accounts.sort_by_key(|a| a.name());
        Ok(accounts)
    }

    pub(crate) fn find_account(&self, name: &str) -> Result<Option<Account>, CoreError> {
        let entry = if name.contains('@') {
            let address = Address::parse(name)?;
            self.resolve_subject(&address)?
        } else {
            let name = name.trim().to_lowercase();
            match self.caches().accounts.get_by_name(&name) {
                Some(entry) => Some(entry),
                None => {
                    let dn = self.layout().location_for(EntryKind::Account, &name, None)?;
                    self.load(&dn)?.map(|e| self.adopt(e))
                }
            }
        };
        entry
            .filter(|e| e.kind() == EntryKind::Account)
            .map(Account::from_entry)
            .transpose()
    }

    /// The object `address` names, with an alias replaced by its live
    /// target. A dangling alias resolves to nothing.
    pub(crate) fn resolve_subject(&self, address: &Address) -> Result<Option<Arc<Entry>>, CoreError> {
        let Some(entry) = self.find_by_address(address)? else {
            return Ok(None);
        };
        if entry.kind() != EntryKind::Alias {
            return Ok(Some(entry));
        }
        let Some(target) = entry.attr(schema::ALIAS_TARGET_ID) else {
            return Ok(None);
        };
        self.find_entry_by_id(&EntryId::from(target))
    }

    // ── Mutations ───────────────────────────────────────────────────

    pub fn modify_account(&self, account: &Account, mods: &[Modification]) -> Result<(), CoreError> {
        if let Some(m) = mods.iter().find(|m| {
            MANAGED_ATTRS
                .iter()
                .chain([&schema::MAIL])
                .any(|a| m.attr().eq_ignore_ascii_case(a))
        }) {
            return Err(CoreError::validation(format!(
                "{} is managed by the engine; use the alias or rename operations",
                m.attr()
            )));
        }
        self.modify_entry(account.entry(), mods)?;
        if mods
            .iter()
            .any(|m| m.attr().eq_ignore_ascii_case(schema::IS_DELEGATED_ADMIN))
        {
            self.caches().authorization.clear();
        }
        Ok(())
    }

    pub fn set_account_status(&self, account: &Account, status: AccountStatus) -> Result<(), CoreError> {
        let mut mods = vec![Modification::replace(schema::ACCOUNT_STATUS, [status.to_string()])];
        if status == AccountStatus::Active && account.failed_login_count() > 0 {
            mods.push(Modification::delete_attr(schema::FAILED_LOGIN_COUNT));
        }
        self.modify_entry(account.entry(), &mods)?;
        info!(account = %account.name(), %status, "account status changed");
        Ok(())
    }

    /// Delete an account with its aliases and static group memberships.
    ///
    /// Dynamic group back-references live on the account itself and go
    /// with it; only the affected groups' member lists are invalidated.
    pub fn delete_account(&self, account: &Account) -> Result<CascadeReport, CoreError> {
        let mut report = CascadeReport::new();
        self.remove_owned_aliases(account.entry(), &mut report);
        self.strip_from_static_groups(&account.member_addresses(), &mut report);

        self.delete_entry(account.entry())?;
        self.release_auth_lock(account.id());
        for group_id in account.back_reference_ids() {
            if let Some(group) = self.caches().groups.get_by_id(&group_id) {
                group.invalidate(&[CacheDataKind::DynamicMembers]);
            }
        }
        self.caches().authorization.clear();
        info!(account = %account.name(), cascade_failures = report.failed_count(), "account deleted");
        Ok(report)
    }

    /// Delete every alias entry that still points at `owner`.
    pub(crate) fn remove_owned_aliases(&self, owner: &Arc<Entry>, report: &mut CascadeReport) {
        for alias in owner.alias_addresses() {
            let result = self.delete_alias_entry_if_owned(&alias, owner.id());
            report.record(CascadeAction::RemoveAlias, alias, result);
        }
    }

    fn delete_alias_entry_if_owned(&self, alias: &str, owner: &EntryId) -> Result<(), CoreError> {
        let address = Address::parse(alias)?;
        let dn = self
            .layout()
            .location_for(EntryKind::Alias, address.local(), Some(address.domain()))?;
        let Some(entry) = self.load(&dn)? else {
            return Ok(());
        };
        let owned = entry.kind() == EntryKind::Alias
            && entry
                .attr(schema::ALIAS_TARGET_ID)
                .is_some_and(|t| EntryId::from(t) == *owner);
        if owned {
            self.dir().delete(&dn)?;
        }
        Ok(())
    }
}

/// Copy caller-supplied attributes, skipping the ones the engine owns.
pub(crate) fn merge_user_attrs(into: &mut Attributes, from: &Attributes) {
    for (attr, values) in from.iter() {
        if MANAGED_ATTRS.iter().any(|m| attr.eq_ignore_ascii_case(m)) {
            continue;
        }
        into.set(attr, values.iter().cloned());
    }
}

/// Name a store-level collision after the object the caller asked for.
pub(crate) fn collision_as(err: CoreError, entity_type: &str, name: &str) -> CoreError {
    if err.is_collision() {
        CoreError::collision(entity_type, name)
    } else {
        err
    }
}
