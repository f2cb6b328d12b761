//! Domain command handlers.

use serde::Serialize;
use tabled::Tabled;

use dirprov_core::{Domain, DomainStatus, DomainType, EntryId, Nameable, Provisioning, schema};

use crate::cli::{DomainArgs, DomainCommand, DomainStatusArg, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Summary & table row ─────────────────────────────────────────────

#[derive(Serialize)]
struct DomainSummary {
    id: EntryId,
    name: String,
    domain_type: DomainType,
    status: DomainStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias_target: Option<EntryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rename_in_progress: Option<String>,
}

impl From<&Domain> for DomainSummary {
    fn from(d: &Domain) -> Self {
        Self {
            id: d.id().clone(),
            name: d.name(),
            domain_type: d.domain_type(),
            status: d.status(),
            alias_target: d.alias_target_id(),
            rename_in_progress: d.rename_info(),
        }
    }
}

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    domain_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "ID")]
    id: String,
}

fn row(d: &DomainSummary, color: bool) -> DomainRow {
    DomainRow {
        name: d.name.clone(),
        domain_type: d.domain_type.to_string(),
        status: output::paint_status(&d.status.to_string(), color),
        id: d.id.to_string(),
    }
}

fn to_status(arg: DomainStatusArg) -> DomainStatus {
    match arg {
        DomainStatusArg::Active => DomainStatus::Active,
        DomainStatusArg::Maintenance => DomainStatus::Maintenance,
        DomainStatusArg::Locked => DomainStatus::Locked,
        DomainStatusArg::Closed => DomainStatus::Closed,
        DomainStatusArg::Suspended => DomainStatus::Suspended,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(prov: &Provisioning, args: DomainArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DomainCommand::Create {
            name,
            alias_of,
            attrs,
        } => {
            let mut attrs = util::parse_attrs(&attrs)?;
            let domain = match alias_of {
                Some(target) => {
                    let target = prov.get_domain_by_name(&target)?;
                    attrs.set(schema::DOMAIN_ALIAS_TARGET_ID, [target.id().to_string()]);
                    prov.create_domain(&name, DomainType::Alias, attrs)?
                }
                None => prov.create_domain(&name, DomainType::Local, attrs)?,
            };
            if !global.quiet {
                eprintln!("Domain {} created", domain.name());
            }
            Ok(())
        }

        DomainCommand::Get { name } => {
            let view = prov.get_domain_by_name(&name)?.view();
            let out = output::render_single(global.format(), &view, output::entry_detail, |v| {
                v.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DomainCommand::List => {
            let color = output::should_color(global.color_mode());
            let domains: Vec<DomainSummary> =
                prov.list_domains()?.iter().map(DomainSummary::from).collect();
            let out = output::render_list(
                global.format(),
                &domains,
                |d| row(d, color),
                |d| d.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DomainCommand::Delete { name } => {
            let domain = prov.get_domain_by_name(&name)?;
            if !util::confirm(&format!("Delete domain '{name}'?"), global.yes)? {
                return Ok(());
            }
            prov.delete_domain(&domain)?;
            if !global.quiet {
                eprintln!("Domain {name} deleted");
            }
            Ok(())
        }

        DomainCommand::Rename { name, new_name } => {
            if !util::confirm(
                &format!("Rename domain '{name}' to '{new_name}' with everything in it?"),
                global.yes,
            )? {
                return Ok(());
            }
            let report = prov.rename_domain(&name, &new_name)?;
            output::warn_cascade(&report.cascade, global.quiet);
            let out = output::render_single(global.format(), &report, output::rename_detail, |r| {
                r.new_name.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DomainCommand::Status { name, status } => {
            let domain = prov.get_domain_by_name(&name)?;
            let status = to_status(status);
            prov.set_domain_status(&domain, status)?;
            if !global.quiet {
                eprintln!("Domain {name} is now {status}");
            }
            Ok(())
        }
    }
}
