//! Directory search handler.

use tabled::Tabled;

use dirprov_api::Filter;
use dirprov_core::{CoreError, EntryKind, EntryView, Provisioning};

use crate::cli::{GlobalOpts, KindArg, SearchArgs};
use crate::error::CliError;
use crate::output;

/// Kinds searched when none are given.
const DEFAULT_KINDS: [EntryKind; 4] = [
    EntryKind::Account,
    EntryKind::Alias,
    EntryKind::StaticGroup,
    EntryKind::DynamicGroup,
];

#[derive(Tabled)]
struct HitRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "DN")]
    dn: String,
}

fn to_kind(arg: KindArg) -> EntryKind {
    match arg {
        KindArg::Account => EntryKind::Account,
        KindArg::Alias => EntryKind::Alias,
        KindArg::StaticGroup => EntryKind::StaticGroup,
        KindArg::DynamicGroup => EntryKind::DynamicGroup,
        KindArg::Domain => EntryKind::Domain,
        KindArg::Cos => EntryKind::Cos,
        KindArg::Server => EntryKind::Server,
        KindArg::UcService => EntryKind::UcService,
    }
}

pub fn handle(prov: &Provisioning, args: &SearchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let kinds: Vec<EntryKind> = if args.kinds.is_empty() {
        DEFAULT_KINDS.to_vec()
    } else {
        args.kinds.iter().copied().map(to_kind).collect()
    };
    let filter = args
        .filter
        .as_deref()
        .map(Filter::parse)
        .transpose()
        .map_err(CoreError::from)?;

    let views: Vec<EntryView> = prov
        .search(&kinds, args.domain.as_deref(), filter.as_ref())?
        .iter()
        .map(|entry| entry.view())
        .collect();
    tracing::debug!(hits = views.len(), "search finished");

    let out = output::render_list(
        global.format(),
        &views,
        |v| HitRow {
            kind: v.kind.to_string(),
            name: v.name.clone(),
            dn: v.dn.to_string(),
        },
        |v| v.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
