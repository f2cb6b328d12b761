//! Cache inspection and flushing.
//!
//! Caches live as long as one engine, which for the CLI is one
//! invocation; these commands mostly matter when combined with
//! `-v` tracing to see what a command read.

use tabled::Tabled;

use dirprov_core::{CacheStats, CacheType, Provisioning};

use crate::cli::{CacheArgs, CacheCommand, CacheTypeArg, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Cache")]
    name: String,
    #[tabled(rename = "Size")]
    size: u64,
    #[tabled(rename = "Hits")]
    hits: u64,
    #[tabled(rename = "Misses")]
    misses: u64,
    #[tabled(rename = "Hit rate")]
    hit_rate: String,
}

impl From<&CacheStats> for StatsRow {
    fn from(s: &CacheStats) -> Self {
        Self {
            name: s.name.clone(),
            size: s.size,
            hits: s.hits,
            misses: s.misses,
            hit_rate: format!("{:.1}%", s.hit_rate * 100.0),
        }
    }
}

fn to_cache_type(arg: CacheTypeArg) -> CacheType {
    match arg {
        CacheTypeArg::Account => CacheType::Account,
        CacheTypeArg::Group => CacheType::Group,
        CacheTypeArg::Domain => CacheType::Domain,
        CacheTypeArg::Cos => CacheType::Cos,
        CacheTypeArg::Server => CacheType::Server,
        CacheTypeArg::Authorization => CacheType::Authorization,
        CacheTypeArg::All => CacheType::All,
    }
}

pub fn handle(prov: &Provisioning, args: CacheArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        CacheCommand::Stats => {
            let stats = prov.cache_stats();
            let out = output::render_list(
                global.format(),
                &stats,
                |s| StatsRow::from(s),
                |s| s.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CacheCommand::Flush { cache, keys } => {
            let cache_type = to_cache_type(cache);
            prov.flush_cache(cache_type, &keys);
            if !global.quiet {
                if keys.is_empty() {
                    eprintln!("Flushed {cache_type} cache");
                } else {
                    eprintln!("Flushed {} key(s) from {cache_type} cache", keys.len());
                }
            }
            Ok(())
        }
    }
}
