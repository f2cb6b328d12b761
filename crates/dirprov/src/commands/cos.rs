//! Class-of-service command handlers.

use tabled::Tabled;

use dirprov_core::{Cos, EntryView, Nameable, Provisioning};

use crate::cli::{CosArgs, CosCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct CosRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Attributes")]
    attributes: usize,
    #[tabled(rename = "ID")]
    id: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(prov: &Provisioning, args: CosArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        CosCommand::Create { name, attrs } => {
            let cos = prov.create_cos(&name, util::parse_attrs(&attrs)?)?;
            if !global.quiet {
                eprintln!("Class of service {} created", cos.name());
            }
            Ok(())
        }

        CosCommand::Get { name } => {
            let view = prov.get_cos_by_name(&name)?.view();
            let out = output::render_single(global.format(), &view, output::entry_detail, |v| {
                v.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CosCommand::List => {
            let views: Vec<EntryView> = prov.list_cos()?.iter().map(Cos::view).collect();
            let out = output::render_list(
                global.format(),
                &views,
                |v| CosRow {
                    name: v.name.clone(),
                    attributes: v.attributes.len(),
                    id: v.id.to_string(),
                },
                |v| v.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CosCommand::Rename { name, new_name } => {
            let cos = prov.get_cos_by_name(&name)?;
            prov.rename_cos(&cos, &new_name)?;
            if !global.quiet {
                eprintln!("Class of service {name} renamed to {new_name}");
            }
            Ok(())
        }

        CosCommand::Delete { name } => {
            let cos = prov.get_cos_by_name(&name)?;
            if !util::confirm(&format!("Delete class of service '{name}'?"), global.yes)? {
                return Ok(());
            }
            prov.delete_cos(&cos)?;
            if !global.quiet {
                eprintln!("Class of service {name} deleted");
            }
            Ok(())
        }
    }
}
