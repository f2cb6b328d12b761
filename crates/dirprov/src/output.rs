//! Rendering of directory objects for the terminal.
//!
//! `--output` picks the shape: rounded tables for people, JSON or YAML for
//! scripts, and bare names or ids (one per line) for shell pipelines.
//! Password hashes never reach any of them.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use dirprov_api::Attributes;
use dirprov_core::{CascadeReport, EntryView, RenameReport, StepOutcome, schema};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Whether status words get colored, honouring `NO_COLOR` in auto mode.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Color a status word: green when usable, yellow when restricted, red
/// when closed or locked out.
pub fn paint_status(status: &str, color: bool) -> String {
    if !color {
        return status.to_owned();
    }
    match status {
        "active" => status.green().to_string(),
        "pending" | "maintenance" | "suspended" => status.yellow().to_string(),
        "locked" | "lockout" | "closed" | "shutdown" => status.red().to_string(),
        _ => status.to_owned(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a listing. Tables go through `to_row`, structured formats
/// serialize `data` itself and plain output prints `id_fn` per item.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render one object. The table form is the key/value listing built by
/// `detail_fn`.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Write rendered output to stdout unless `-q` was given.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Shared detail views ──────────────────────────────────────────────

/// Key/value listing of an entry: identity first, then every attribute.
pub fn entry_detail(view: &EntryView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {}", "name", view.name);
    let _ = writeln!(out, "{:<24} {}", "id", view.id);
    let _ = writeln!(out, "{:<24} {}", "kind", view.kind);
    let _ = writeln!(out, "{:<24} {}", "dn", view.dn);
    write_attributes(&mut out, &view.attributes);
    out.trim_end().to_owned()
}

/// Drop credential attributes before an entry is shown anywhere.
pub fn redacted(mut view: EntryView) -> EntryView {
    view.attributes.remove(schema::USER_PASSWORD);
    view
}

fn write_attributes(out: &mut String, attrs: &Attributes) {
    let mut pairs: Vec<_> = attrs
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(schema::USER_PASSWORD))
        .collect();
    pairs.sort_by_key(|(name, _)| name.to_lowercase());
    for (name, values) in pairs {
        for value in values {
            let _ = writeln!(out, "{name:<24} {value}");
        }
    }
}

/// Summary of a finished rename.
pub fn rename_detail(report: &RenameReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {}", "kind", report.kind);
    let _ = writeln!(out, "{:<24} {} -> {}", "name", report.old_name, report.new_name);
    let _ = writeln!(out, "{:<24} {} -> {}", "dn", report.old_dn, report.new_dn);
    let _ = writeln!(out, "{:<24} {}", "entries rewritten", report.rewritten);
    let _ = writeln!(
        out,
        "{:<24} {} ok, {} failed",
        "follow-up steps",
        report.cascade.len() - report.cascade.failed_count(),
        report.cascade.failed_count()
    );
    out.trim_end().to_owned()
}

/// Report best-effort steps that failed. Nothing is printed for a
/// clean cascade.
pub fn warn_cascade(report: &CascadeReport, quiet: bool) {
    if quiet || report.is_clean() {
        return;
    }
    eprintln!(
        "warning: {} follow-up step(s) failed; the main change was applied",
        report.failed_count()
    );
    for step in report.failed() {
        if let StepOutcome::Failed { reason } = &step.outcome {
            eprintln!("  {} {}: {reason}", step.action, step.target);
        }
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    if compact {
        serde_json::to_string(data).map_err(CliError::render)
    } else {
        serde_json::to_string_pretty(data).map_err(CliError::render)
    }
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(CliError::render)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Item {
        name: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "one".into() },
            Item { name: "two".into() },
        ]
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        let out = render_list(
            &OutputFormat::Plain,
            &items(),
            |i| Item { name: i.name.clone() },
            |i| i.name.clone(),
        )
        .unwrap();
        assert_eq!(out, "one\ntwo");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            &OutputFormat::JsonCompact,
            &items(),
            |i| Item { name: i.name.clone() },
            |i| i.name.clone(),
        )
        .unwrap();
        assert_eq!(out, r#"[{"name":"one"},{"name":"two"}]"#);
    }

    #[test]
    fn uncolored_status_is_unchanged() {
        assert_eq!(paint_status("lockout", false), "lockout");
    }
}
