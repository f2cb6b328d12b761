//! Shared helpers for command handlers.

use std::io::{BufRead, IsTerminal};

use secrecy::SecretString;

use dirprov_api::Attributes;
use dirprov_core::{Account, CoreError, Group, Provisioning};

use crate::cli::{AttrArgs, PasswordArgs};
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the operation is refused.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    Ok(confirmed)
}

/// Parse repeated `--attr NAME=VALUE` flags. Repeating a name adds values.
pub fn parse_attrs(args: &AttrArgs) -> Result<Attributes, CliError> {
    let mut attrs = Attributes::new();
    for raw in &args.attrs {
        let Some((name, value)) = raw.split_once('=') else {
            return Err(CliError::Validation {
                field: "attr".into(),
                reason: format!("expected NAME=VALUE, got '{raw}'"),
            });
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::Validation {
                field: "attr".into(),
                reason: format!("empty attribute name in '{raw}'"),
            });
        }
        attrs.add_values(name, [value]);
    }
    Ok(attrs)
}

/// Obtain a password according to the password flags, if any was asked for.
pub fn read_password(args: &PasswordArgs) -> Result<Option<SecretString>, CliError> {
    if args.prompt_password {
        return prompt_password().map(Some);
    }
    if args.password_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        let pass = line.trim_end_matches(['\r', '\n']).to_owned();
        return Ok(Some(SecretString::from(pass)));
    }
    Ok(None)
}

/// Ask for a password on the terminal without echoing it.
pub fn prompt_password() -> Result<SecretString, CliError> {
    let pass = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    Ok(SecretString::from(pass))
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Something alias addresses can be bound to.
pub enum AliasTarget {
    Account(Account),
    Group(Group),
}

impl AliasTarget {
    pub fn name(&self) -> String {
        match self {
            Self::Account(a) => a.view().name,
            Self::Group(g) => g.view().name,
        }
    }
}

/// Resolve an address to the account or group it names (aliases followed).
pub fn resolve_alias_target(prov: &Provisioning, address: &str) -> Result<AliasTarget, CliError> {
    match prov.get_account_by_name(address) {
        Ok(account) => return Ok(AliasTarget::Account(account)),
        Err(e) if !e.is_not_found() => return Err(e.into()),
        Err(_) => {}
    }
    match prov.get_group_by_name(address) {
        Ok(group) => Ok(AliasTarget::Group(group)),
        Err(e) if e.is_not_found() => Err(CoreError::not_found("account", address).into()),
        Err(e) => Err(e.into()),
    }
}
