//! Account command handlers.

use serde::Serialize;
use tabled::Tabled;

use dirprov_core::{
    Account, AccountStatus, Aliasable, EntryId, GroupMembership, MemberOf, Nameable, Provisioning,
};

use crate::cli::{AccountArgs, AccountCommand, AccountStatusArg, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Summaries & table rows ──────────────────────────────────────────

#[derive(Serialize)]
struct AccountSummary {
    id: EntryId,
    name: String,
    status: AccountStatus,
    aliases: Vec<String>,
    delegated_admin: bool,
}

impl From<&Account> for AccountSummary {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id().clone(),
            name: a.name(),
            status: a.status(),
            aliases: a.alias_addresses(),
            delegated_admin: a.is_delegated_admin(),
        }
    }
}

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Aliases")]
    aliases: String,
    #[tabled(rename = "ID")]
    id: String,
}

fn account_row(a: &AccountSummary, color: bool) -> AccountRow {
    AccountRow {
        name: a.name.clone(),
        status: output::paint_status(&a.status.to_string(), color),
        aliases: a.aliases.join(", "),
        id: a.id.to_string(),
    }
}

#[derive(Tabled)]
struct MembershipRow {
    #[tabled(rename = "Group")]
    name: String,
    #[tabled(rename = "Type")]
    group_type: &'static str,
    #[tabled(rename = "Admin")]
    admin: &'static str,
    #[tabled(rename = "Via")]
    via: String,
}

fn membership_row(m: &MemberOf, all: &GroupMembership) -> MembershipRow {
    MembershipRow {
        name: m.name.clone(),
        group_type: if m.is_dynamic { "dynamic" } else { "static" },
        admin: if m.is_admin_group { "yes" } else { "" },
        via: m
            .via
            .as_ref()
            .map(|id| all.get(id).map_or_else(|| id.to_string(), |g| g.name.clone()))
            .unwrap_or_default(),
    }
}

fn to_status(arg: AccountStatusArg) -> AccountStatus {
    match arg {
        AccountStatusArg::Active => AccountStatus::Active,
        AccountStatusArg::Pending => AccountStatus::Pending,
        AccountStatusArg::Maintenance => AccountStatus::Maintenance,
        AccountStatusArg::Locked => AccountStatus::Locked,
        AccountStatusArg::Closed => AccountStatus::Closed,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(prov: &Provisioning, args: AccountArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AccountCommand::Create {
            address,
            password,
            attrs,
        } => {
            let attrs = util::parse_attrs(&attrs)?;
            let password = util::read_password(&password)?;
            let account = if address.contains('@') {
                prov.create_account(&address, password.as_ref(), attrs)?
            } else {
                prov.create_admin_account(&address, password.as_ref(), attrs)?
            };
            if !global.quiet {
                eprintln!("Account {} created", account.name());
            }
            Ok(())
        }

        AccountCommand::Get { address } => {
            let view = output::redacted(prov.get_account_by_name(&address)?.view());
            let out = output::render_single(global.format(), &view, output::entry_detail, |v| {
                v.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountCommand::List { domain } => {
            let color = output::should_color(global.color_mode());
            let accounts: Vec<AccountSummary> = prov
                .list_accounts(domain.as_deref())?
                .iter()
                .map(AccountSummary::from)
                .collect();
            let out = output::render_list(
                global.format(),
                &accounts,
                |a| account_row(a, color),
                |a| a.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountCommand::Delete { address } => {
            let account = prov.get_account_by_name(&address)?;
            if !util::confirm(
                &format!("Delete account '{}' with its aliases?", account.name()),
                global.yes,
            )? {
                return Ok(());
            }
            let report = prov.delete_account(&account)?;
            output::warn_cascade(&report, global.quiet);
            if !global.quiet {
                eprintln!("Account {} deleted", account.name());
            }
            Ok(())
        }

        AccountCommand::Rename {
            address,
            new_address,
        } => {
            let account = prov.get_account_by_name(&address)?;
            let report = prov.rename_account(&account, &new_address)?;
            output::warn_cascade(&report.cascade, global.quiet);
            let out = output::render_single(global.format(), &report, output::rename_detail, |r| {
                r.new_name.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountCommand::Status { address, status } => {
            let account = prov.get_account_by_name(&address)?;
            let status = to_status(status);
            prov.set_account_status(&account, status)?;
            if !global.quiet {
                eprintln!("Account {} is now {status}", account.name());
            }
            Ok(())
        }

        AccountCommand::Memberships {
            address,
            admin_only,
            direct,
        } => {
            let account = prov.get_account_by_name(&address)?;
            // Names for the "via" column come from the full closure.
            let all = prov.group_membership(&account, false)?;
            let shown = if direct {
                prov.direct_group_membership(&account)?
            } else if admin_only {
                prov.group_membership(&account, true)?.as_ref().clone()
            } else {
                all.as_ref().clone()
            };
            let out = output::render_list(
                global.format(),
                shown.groups(),
                |m| membership_row(m, &all),
                |m| m.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountCommand::Authenticate { address, password } => {
            let password = match util::read_password(&password)? {
                Some(secret) => secret,
                None => util::prompt_password()?,
            };
            let account = prov.authenticate(&address, &password)?;
            if !global.quiet {
                eprintln!("Authenticated as {}", account.name());
            }
            Ok(())
        }
    }
}
