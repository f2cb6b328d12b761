//! Command dispatch: bridges CLI args -> engine operations -> output formatting.

pub mod account;
pub mod alias;
pub mod cache;
pub mod config_cmd;
pub mod cos;
pub mod domain;
pub mod group;
pub mod search;
pub mod server;
pub mod util;

use dirprov_core::Provisioning;

use crate::cli::{
    AccountCommand, AliasCommand, CosCommand, Command, DomainCommand, GlobalOpts, GroupCommand,
    ServerCommand,
};
use crate::error::CliError;

/// Dispatch a state-bound command to the appropriate handler.
pub fn dispatch(cmd: Command, prov: &Provisioning, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Domain(args) => domain::handle(prov, args, global),
        Command::Account(args) => account::handle(prov, args, global),
        Command::Alias(args) => alias::handle(prov, args, global),
        Command::Group(args) => group::handle(prov, args, global),
        Command::Cos(args) => cos::handle(prov, args, global),
        Command::Server(args) => server::handle(prov, args, global),
        Command::Search(args) => search::handle(prov, &args, global),
        Command::Cache(args) => cache::handle(prov, args, global),
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}

/// Whether a command can change directory contents, so the state file
/// must be written back afterwards. Authentication counts: it records
/// failed attempts and can lock an account out.
pub fn mutates(cmd: &Command) -> bool {
    match cmd {
        Command::Domain(args) => !matches!(
            args.command,
            DomainCommand::Get { .. } | DomainCommand::List
        ),
        Command::Account(args) => !matches!(
            args.command,
            AccountCommand::Get { .. }
                | AccountCommand::List { .. }
                | AccountCommand::Memberships { .. }
        ),
        Command::Alias(args) => !matches!(args.command, AliasCommand::State { .. }),
        Command::Group(args) => !matches!(
            args.command,
            GroupCommand::Get { .. } | GroupCommand::List { .. } | GroupCommand::Members { .. }
        ),
        Command::Cos(args) => !matches!(args.command, CosCommand::Get { .. } | CosCommand::List),
        Command::Server(args) => !matches!(
            args.command,
            ServerCommand::Get { .. } | ServerCommand::List
        ),
        Command::Search(_) | Command::Cache(_) | Command::Config(_) | Command::Completions(_) => {
            false
        }
    }
}
