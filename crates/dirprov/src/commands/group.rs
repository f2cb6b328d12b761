//! Group command handlers.

use serde::Serialize;
use tabled::Tabled;

use dirprov_core::{EntryId, Group, Nameable, Provisioning, schema};

use crate::cli::{GlobalOpts, GroupArgs, GroupCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Summary & table rows ────────────────────────────────────────────

#[derive(Serialize)]
struct GroupSummary {
    id: EntryId,
    name: String,
    dynamic: bool,
    custom_filter: bool,
    admin_group: bool,
}

impl From<&Group> for GroupSummary {
    fn from(g: &Group) -> Self {
        Self {
            id: g.id().clone(),
            name: g.name(),
            dynamic: g.is_dynamic(),
            custom_filter: g.is_custom(),
            admin_group: g.is_admin_group(),
        }
    }
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    group_type: &'static str,
    #[tabled(rename = "Admin")]
    admin: &'static str,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&GroupSummary> for GroupRow {
    fn from(g: &GroupSummary) -> Self {
        let group_type = match (g.dynamic, g.custom_filter) {
            (false, _) => "static",
            (true, false) => "dynamic",
            (true, true) => "custom",
        };
        Self {
            name: g.name.clone(),
            group_type,
            admin: if g.admin_group { "yes" } else { "" },
            id: g.id.to_string(),
        }
    }
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "Member")]
    address: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(prov: &Provisioning, args: GroupArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        GroupCommand::Create {
            address,
            dynamic,
            filter,
            admin,
            attrs,
        } => {
            let mut attrs = util::parse_attrs(&attrs)?;
            if admin {
                attrs.set(schema::IS_ADMIN_GROUP, [schema::TRUE]);
            }
            let group = if dynamic {
                prov.create_dynamic_group(&address, filter.as_deref(), attrs)?
            } else {
                prov.create_group(&address, attrs)?
            };
            if !global.quiet {
                eprintln!("Group {} created", group.name());
            }
            Ok(())
        }

        GroupCommand::Get { address } => {
            let view = prov.get_group_by_name(&address)?.view();
            let out = output::render_single(global.format(), &view, output::entry_detail, |v| {
                v.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupCommand::List { domain } => {
            let groups: Vec<GroupSummary> = prov
                .list_groups(domain.as_deref())?
                .iter()
                .map(GroupSummary::from)
                .collect();
            let out = output::render_list(global.format(), &groups, |g| GroupRow::from(g), |g| {
                g.name.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupCommand::Delete { address } => {
            let group = prov.get_group_by_name(&address)?;
            if !util::confirm(&format!("Delete group '{}'?", group.name()), global.yes)? {
                return Ok(());
            }
            let report = prov.delete_group(&group)?;
            output::warn_cascade(&report, global.quiet);
            if !global.quiet {
                eprintln!("Group {} deleted", group.name());
            }
            Ok(())
        }

        GroupCommand::Rename {
            address,
            new_address,
        } => {
            let group = prov.get_group_by_name(&address)?;
            let report = prov.rename_group(&group, &new_address)?;
            output::warn_cascade(&report.cascade, global.quiet);
            let out = output::render_single(global.format(), &report, output::rename_detail, |r| {
                r.new_name.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupCommand::AddMembers { group, members } => {
            let target = prov.get_group_by_name(&group)?;
            prov.add_group_members(&target, &members)?;
            if !global.quiet {
                eprintln!("Added {} member(s) to {}", members.len(), target.name());
            }
            Ok(())
        }

        GroupCommand::RemoveMembers { group, members } => {
            let target = prov.get_group_by_name(&group)?;
            prov.remove_group_members(&target, &members)?;
            if !global.quiet {
                eprintln!("Removed {} member(s) from {}", members.len(), target.name());
            }
            Ok(())
        }

        GroupCommand::Members { group } => {
            let target = prov.get_group_by_name(&group)?;
            let members = prov.group_members(&target)?;
            let out = output::render_list(
                global.format(),
                &members,
                |m| MemberRow { address: m.clone() },
                String::clone,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
