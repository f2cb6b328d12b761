//! Server and UC service command handlers.

use tabled::Tabled;

use dirprov_core::{EntryKind, EntryView, Nameable, Provisioning, Server};

use crate::cli::{GlobalOpts, ServerArgs, ServerCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ServerRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    server_type: &'static str,
    #[tabled(rename = "ID")]
    id: String,
}

fn lookup(prov: &Provisioning, name: &str, uc: bool) -> Result<Server, CliError> {
    let server = if uc {
        prov.get_uc_service_by_name(name)?
    } else {
        prov.get_server_by_name(name)?
    };
    Ok(server)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(prov: &Provisioning, args: ServerArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ServerCommand::Create { name, uc, attrs } => {
            let attrs = util::parse_attrs(&attrs)?;
            let server = if uc {
                prov.create_uc_service(&name, attrs)?
            } else {
                prov.create_server(&name, attrs)?
            };
            if !global.quiet {
                let what = if server.is_uc_service() { "UC service" } else { "Server" };
                eprintln!("{what} {} created", server.name());
            }
            Ok(())
        }

        ServerCommand::Get { name, uc } => {
            let view = lookup(prov, &name, uc)?.view();
            let out = output::render_single(global.format(), &view, output::entry_detail, |v| {
                v.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::List => {
            let views: Vec<EntryView> = prov.list_servers()?.iter().map(Server::view).collect();
            let out = output::render_list(
                global.format(),
                &views,
                |v| ServerRow {
                    name: v.name.clone(),
                    server_type: if v.kind == EntryKind::UcService {
                        "uc service"
                    } else {
                        "server"
                    },
                    id: v.id.to_string(),
                },
                |v| v.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServerCommand::Delete { name, uc } => {
            let server = lookup(prov, &name, uc)?;
            if !util::confirm(&format!("Delete '{name}'?"), global.yes)? {
                return Ok(());
            }
            prov.delete_server(&server)?;
            if !global.quiet {
                eprintln!("{name} deleted");
            }
            Ok(())
        }
    }
}
