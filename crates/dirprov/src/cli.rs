//! Clap derive structures for the `dirprov` CLI.
//!
//! Command tree and global flags of the `dirprov` binary.
//! Only clap and clap_complete may be used here: `build.rs` includes this
//! file directly to render man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dirprov -- provision accounts, groups, aliases and domains
#[derive(Debug, Parser)]
#[command(
    name = "dirprov",
    version,
    about = "Provision accounts, groups and domains in a directory",
    long_about = "Manage the mail objects of a hierarchical directory: domains, accounts,\n\
        aliases, static and dynamic groups, classes of service and servers.\n\n\
        The directory is kept in a JSON state file that every command loads\n\
        and, when it changes something, writes back.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Directory state file (JSON snapshot)
    #[arg(long, env = "DIRPROV_STATE", global = true)]
    pub state: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "DIRPROV_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "DIRPROV_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Assume yes for destructive operations
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

impl GlobalOpts {
    pub fn format(&self) -> &OutputFormat {
        self.output.as_ref().unwrap_or(&OutputFormat::Table)
    }

    pub fn color_mode(&self) -> &ColorMode {
        self.color.as_ref().unwrap_or(&ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Rounded table for reading
    Table,
    /// Pretty-printed JSON
    Json,
    /// JSON on a single line
    JsonCompact,
    /// YAML
    Yaml,
    /// One name or id per line
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage domains
    #[command(alias = "dom")]
    Domain(DomainArgs),

    /// Manage accounts
    #[command(alias = "acct", alias = "a")]
    Account(AccountArgs),

    /// Manage alias addresses
    Alias(AliasArgs),

    /// Manage static and dynamic groups
    #[command(alias = "g")]
    Group(GroupArgs),

    /// Manage classes of service
    Cos(CosArgs),

    /// Manage server entries
    Server(ServerArgs),

    /// Search the directory
    Search(SearchArgs),

    /// Inspect and flush the entity caches
    Cache(CacheArgs),

    /// Show CLI configuration
    Config(ConfigArgs),

    /// Print a shell completion script
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Extra attributes for create commands.
#[derive(Debug, Args)]
pub struct AttrArgs {
    /// Attribute to set, as NAME=VALUE (repeatable)
    #[arg(long = "attr", value_name = "NAME=VALUE")]
    pub attrs: Vec<String>,
}

/// How to obtain a password.
#[derive(Debug, Args)]
pub struct PasswordArgs {
    /// Prompt for a password on the terminal
    #[arg(long, conflicts_with = "password_stdin")]
    pub prompt_password: bool,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

// ── Domains ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DomainArgs {
    #[command(subcommand)]
    pub command: DomainCommand,
}

#[derive(Debug, Subcommand)]
pub enum DomainCommand {
    /// Create a domain
    Create {
        /// Domain name (e.g. example.com)
        name: String,

        /// Make this an alias domain forwarding to TARGET
        #[arg(long, value_name = "TARGET")]
        alias_of: Option<String>,

        #[command(flatten)]
        attrs: AttrArgs,
    },

    /// Show one domain
    Get { name: String },

    /// List all domains
    #[command(alias = "ls")]
    List,

    /// Delete an empty domain
    #[command(alias = "rm")]
    Delete { name: String },

    /// Rename a domain and everything in it (resumes an interrupted rename)
    Rename { name: String, new_name: String },

    /// Change a domain's status
    Status { name: String, status: DomainStatusArg },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DomainStatusArg {
    Active,
    Maintenance,
    Locked,
    Closed,
    Suspended,
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Create an account (an address, or a bare name for an administrator)
    Create {
        address: String,

        #[command(flatten)]
        password: PasswordArgs,

        #[command(flatten)]
        attrs: AttrArgs,
    },

    /// Show one account (aliases resolve to their target)
    Get { address: String },

    /// List accounts
    #[command(alias = "ls")]
    List {
        /// Only accounts of this domain
        #[arg(long, short = 'd')]
        domain: Option<String>,
    },

    /// Delete an account with its aliases and group memberships
    #[command(alias = "rm")]
    Delete { address: String },

    /// Rename an account, moving it between domains if needed
    Rename { address: String, new_address: String },

    /// Change an account's status
    Status {
        address: String,
        status: AccountStatusArg,
    },

    /// Show the groups an account belongs to
    Memberships {
        address: String,

        /// Only admin groups
        #[arg(long)]
        admin_only: bool,

        /// Only directly containing groups
        #[arg(long, conflicts_with = "admin_only")]
        direct: bool,
    },

    /// Check a password, counting failures toward lockout
    #[command(alias = "auth")]
    Authenticate {
        address: String,

        #[command(flatten)]
        password: PasswordArgs,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AccountStatusArg {
    Active,
    Pending,
    Maintenance,
    Locked,
    Closed,
}

// ── Aliases ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AliasArgs {
    #[command(subcommand)]
    pub command: AliasCommand,
}

#[derive(Debug, Subcommand)]
pub enum AliasCommand {
    /// Bind an alias address to an account or group
    Add {
        /// Account or group receiving the alias
        target: String,
        /// Alias address
        alias: String,
    },

    /// Unbind an alias address
    #[command(alias = "rm")]
    Remove {
        /// Alias address
        alias: String,

        /// Account or group the alias should belong to
        #[arg(long)]
        from: Option<String>,
    },

    /// Show whether an alias is bound, dangling or absent
    State { alias: String },
}

// ── Groups ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupCommand {
    /// Create a static or dynamic group
    Create {
        address: String,

        /// Create a dynamic group
        #[arg(long)]
        dynamic: bool,

        /// Member filter for a custom dynamic group
        #[arg(long, requires = "dynamic")]
        filter: Option<String>,

        /// Mark the group as an admin group
        #[arg(long)]
        admin: bool,

        #[command(flatten)]
        attrs: AttrArgs,
    },

    /// Show one group
    Get { address: String },

    /// List groups
    #[command(alias = "ls")]
    List {
        /// Only groups of this domain
        #[arg(long, short = 'd')]
        domain: Option<String>,
    },

    /// Delete a group
    #[command(alias = "rm")]
    Delete { address: String },

    /// Rename a group
    Rename { address: String, new_address: String },

    /// Add members
    AddMembers {
        group: String,
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Remove members
    RemoveMembers {
        group: String,
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// List member addresses
    Members { group: String },
}

// ── Classes of service and servers ───────────────────────────────────

#[derive(Debug, Args)]
pub struct CosArgs {
    #[command(subcommand)]
    pub command: CosCommand,
}

#[derive(Debug, Subcommand)]
pub enum CosCommand {
    /// Create a class of service
    Create {
        name: String,

        #[command(flatten)]
        attrs: AttrArgs,
    },

    /// Show one class of service
    Get { name: String },

    /// List classes of service
    #[command(alias = "ls")]
    List,

    /// Rename a class of service
    Rename { name: String, new_name: String },

    /// Delete a class of service
    #[command(alias = "rm")]
    Delete { name: String },
}

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Create a server entry
    Create {
        name: String,

        /// Register a unified-communications service instead
        #[arg(long)]
        uc: bool,

        #[command(flatten)]
        attrs: AttrArgs,
    },

    /// Show one server
    Get {
        name: String,

        /// Look up a unified-communications service
        #[arg(long)]
        uc: bool,
    },

    /// List servers and services
    #[command(alias = "ls")]
    List,

    /// Delete a server entry
    #[command(alias = "rm")]
    Delete {
        name: String,

        #[arg(long)]
        uc: bool,
    },
}

// ── Search ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Kinds of entry to return (repeatable; default: accounts, aliases and groups)
    #[arg(long = "kind", short = 'k', value_enum)]
    pub kinds: Vec<KindArg>,

    /// Restrict to one domain
    #[arg(long, short = 'd')]
    pub domain: Option<String>,

    /// Search filter, e.g. "(&(ou=sales)(accountStatus=active))"
    #[arg(long, short = 'f')]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Account,
    Alias,
    StaticGroup,
    DynamicGroup,
    Domain,
    Cos,
    Server,
    UcService,
}

// ── Cache ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show cache sizes and hit rates
    Stats,

    /// Flush one cache, or only the listed names/ids in it
    Flush {
        cache: CacheTypeArg,
        keys: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CacheTypeArg {
    Account,
    Group,
    Domain,
    Cos,
    Server,
    Authorization,
    All,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write the default configuration to the config path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
