//! Alias command handlers.

use dirprov_core::{AliasState, Aliasable, Provisioning};

use crate::cli::{AliasArgs, AliasCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util::{self, AliasTarget};

fn state_detail(state: &AliasState) -> String {
    match state {
        AliasState::Absent => "absent".into(),
        AliasState::Bound { target } => format!("bound to {target}"),
        AliasState::Dangling { target: Some(target) } => {
            format!("dangling (points to missing {target})")
        }
        AliasState::Dangling { target: None } => "dangling (no target recorded)".into(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(prov: &Provisioning, args: AliasArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AliasCommand::Add { target, alias } => {
            let target = util::resolve_alias_target(prov, &target)?;
            let report = match &target {
                AliasTarget::Account(account) => prov.add_alias(account, &alias)?,
                AliasTarget::Group(group) => prov.add_alias(group, &alias)?,
            };
            output::warn_cascade(&report, global.quiet);
            if !global.quiet {
                eprintln!("Alias {alias} added to {}", target.name());
            }
            Ok(())
        }

        AliasCommand::Remove { alias, from } => {
            let owner = from
                .as_deref()
                .map(|name| util::resolve_alias_target(prov, name))
                .transpose()?;
            let owner_ref: Option<&dyn Aliasable> = match &owner {
                Some(AliasTarget::Account(account)) => Some(account),
                Some(AliasTarget::Group(group)) => Some(group),
                None => None,
            };
            let report = prov.remove_alias(owner_ref, &alias)?;
            output::warn_cascade(&report, global.quiet);
            if !global.quiet {
                eprintln!("Alias {alias} removed");
            }
            Ok(())
        }

        AliasCommand::State { alias } => {
            let state = prov.alias_state(&alias)?;
            let out = output::render_single(global.format(), &state, state_detail, |s| {
                match s {
                    AliasState::Absent => "absent",
                    AliasState::Bound { .. } => "bound",
                    AliasState::Dangling { .. } => "dangling",
                }
                .to_owned()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
