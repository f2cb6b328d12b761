mod cli;
mod commands;
mod error;
mod output;
mod state;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use dirprov_config::Config;

use crate::cli::{Cli, ColorMode, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::state::Session;

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { mut global, command } = cli;
    let cfg = load_config(&global)?;
    apply_defaults(&mut global, &cfg)?;

    match command {
        // Config commands never touch the state file
        Command::Config(args) => commands::config_cmd::handle(args, &cfg, &global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "dirprov", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let engine_config = dirprov_config::to_engine_config(&cfg)?;
            let path = dirprov_config::resolve_state_path(global.state.as_deref(), &cfg);
            let session = Session::open(&path, engine_config)?;

            tracing::debug!(command = ?cmd, state = %path.display(), "dispatching command");
            let mutates = commands::mutates(&cmd);
            let result = commands::dispatch(cmd, session.engine(), &global);
            // A failed multi-step command may still have changed entries
            // (an interrupted domain rename must be resumable).
            if mutates {
                session.save()?;
            }
            result
        }
    }
}

fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg = match &global.config {
        Some(path) => dirprov_config::load_config_from(path)?,
        None => dirprov_config::load_config()?,
    };
    Ok(cfg)
}

/// Fill presentation flags the user did not pass from the config file.
fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    if global.output.is_none() {
        let format = OutputFormat::from_str(&cfg.defaults.output, true).map_err(|reason| {
            CliError::Validation {
                field: "defaults.output".into(),
                reason,
            }
        })?;
        global.output = Some(format);
    }
    if global.color.is_none() {
        let mode = ColorMode::from_str(&cfg.defaults.color, true).map_err(|reason| {
            CliError::Validation {
                field: "defaults.color".into(),
                reason,
            }
        })?;
        global.color = Some(mode);
    }
    Ok(())
}
