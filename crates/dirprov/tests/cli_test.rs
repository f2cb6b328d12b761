//! Integration tests for the `dirprov` CLI binary.
//!
//! Every test works on a state file in its own temporary directory, with
//! configuration lookups pointed away from the user's real files.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn state(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    /// Build a [`Command`] for the `dirprov` binary with env isolation.
    ///
    /// Clears all `DIRPROV_*` env vars and points config and data
    /// directories into the sandbox.
    fn cmd(&self) -> assert_cmd::Command {
        let root = self.dir.path();
        let mut cmd = cargo_bin_cmd!("dirprov");
        cmd.env("HOME", root)
            .env("XDG_CONFIG_HOME", root.join("config"))
            .env("XDG_DATA_HOME", root.join("data"))
            .env("DIRPROV_CONFIG", root.join("config.toml"))
            .env("DIRPROV_STATE", self.state())
            .env_remove("DIRPROV_OUTPUT")
            .env_remove("DIRPROV_CACHE_MODE")
            .env_remove("DIRPROV_LOCKOUT__ENABLED")
            .env_remove("DIRPROV_LOCKOUT__MAX_FAILURES")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) {
        self.cmd().args(args).assert().success();
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cmd().args(args).args(["-o", "json"]).output().unwrap();
        assert!(output.status.success(), "{}", combined_output(&output));
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn plain(&self, args: &[&str]) -> Vec<String> {
        let output = self.cmd().args(args).args(["-o", "plain"]).output().unwrap();
        assert!(output.status.success(), "{}", combined_output(&output));
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn with_domain(self, name: &str) -> Self {
        self.run(&["domain", "create", name]);
        self
    }
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn exit_code(cmd: &mut assert_cmd::Command) -> Option<i32> {
    cmd.output().unwrap().status.code()
}

fn file_contains(path: &Path, needle: &str) -> bool {
    std::fs::read_to_string(path).unwrap().contains(needle)
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let sandbox = Sandbox::new();
    let output = sandbox.cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    Sandbox::new().cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("domain")
            .and(predicate::str::contains("account"))
            .and(predicate::str::contains("alias"))
            .and(predicate::str::contains("group")),
    );
}

#[test]
fn test_version_flag() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dirprov"));
}

#[test]
fn test_invalid_subcommand() {
    Sandbox::new()
        .cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_for_each_shell() {
    let sandbox = Sandbox::new();
    for shell in ["bash", "zsh", "fish"] {
        sandbox
            .cmd()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("dirprov"));
    }
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_override() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let sandbox = Sandbox::new();
    sandbox.run(&["config", "init"]);
    assert!(sandbox.dir.path().join("config.toml").exists());
    assert_eq!(exit_code(sandbox.cmd().args(["config", "init"])), Some(2));
    sandbox.run(&["config", "init", "--force"]);
}

#[test]
fn test_invalid_config_value_is_rejected() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.dir.path().join("config.toml"), "cache_mode = \"sometimes\"\n").unwrap();
    let output = sandbox.cmd().args(["domain", "list"]).output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("cache_mode"));
}

// ── Domains and accounts ────────────────────────────────────────────

#[test]
fn test_created_account_persists_in_state_file() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com", "--attr", "ou=sales"]);
    assert!(file_contains(&sandbox.state(), "alice"));

    let account = sandbox.json(&["account", "get", "alice@example.com"]);
    assert_eq!(account["name"], "alice@example.com");
    assert_eq!(account["kind"], "account");
    assert_eq!(account["dn"], "uid=alice,ou=people,dc=example,dc=com");
}

#[test]
fn test_missing_account_exits_not_found() {
    let sandbox = Sandbox::new().with_domain("example.com");
    let output = sandbox
        .cmd()
        .args(["account", "get", "nobody@example.com"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("not found"));
}

#[test]
fn test_account_in_unknown_domain_exits_not_found() {
    let sandbox = Sandbox::new();
    assert_eq!(
        exit_code(sandbox.cmd().args(["account", "create", "bob@nowhere.org"])),
        Some(4)
    );
}

#[test]
fn test_duplicate_address_exits_conflict() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);
    assert_eq!(
        exit_code(sandbox.cmd().args(["account", "create", "alice@example.com"])),
        Some(6)
    );
    assert_eq!(
        exit_code(sandbox.cmd().args(["group", "create", "alice@example.com"])),
        Some(6)
    );
}

#[test]
fn test_malformed_address_is_a_usage_error() {
    let sandbox = Sandbox::new().with_domain("example.com");
    assert_eq!(
        exit_code(sandbox.cmd().args(["group", "create", "a@b@example.com"])),
        Some(2)
    );
}

#[test]
fn test_account_list_filters_by_domain() {
    let sandbox = Sandbox::new().with_domain("a.com").with_domain("b.com");
    sandbox.run(&["account", "create", "x@a.com"]);
    sandbox.run(&["account", "create", "y@b.com"]);

    assert_eq!(sandbox.plain(&["account", "list", "--domain", "a.com"]), ["x@a.com"]);
    assert_eq!(sandbox.plain(&["account", "list"]).len(), 2);
}

#[test]
fn test_delete_without_terminal_requires_yes() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);

    assert_eq!(
        exit_code(sandbox.cmd().args(["account", "delete", "alice@example.com"])),
        Some(2)
    );
    sandbox.run(&["account", "delete", "alice@example.com", "--yes"]);
    assert_eq!(
        exit_code(sandbox.cmd().args(["account", "get", "alice@example.com"])),
        Some(4)
    );
}

#[test]
fn test_non_empty_domain_cannot_be_deleted() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);
    assert_eq!(
        exit_code(sandbox.cmd().args(["domain", "delete", "example.com", "-y"])),
        Some(2)
    );
    sandbox.run(&["account", "delete", "alice@example.com", "-y"]);
    sandbox.run(&["domain", "delete", "example.com", "-y"]);
    assert!(sandbox.plain(&["domain", "list"]).is_empty());
}

// ── Aliases ─────────────────────────────────────────────────────────

#[test]
fn test_alias_resolves_to_its_account() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);
    sandbox.run(&["alias", "add", "alice@example.com", "al@example.com"]);

    let account = sandbox.json(&["account", "get", "al@example.com"]);
    assert_eq!(account["name"], "alice@example.com");

    let state = sandbox.json(&["alias", "state", "al@example.com"]);
    assert_eq!(state["state"], "bound");
    assert_eq!(state["target"], account["id"]);

    sandbox.run(&["alias", "remove", "al@example.com"]);
    assert_eq!(sandbox.plain(&["alias", "state", "al@example.com"]), ["absent"]);
}

#[test]
fn test_alias_onto_taken_address_conflicts() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);
    sandbox.run(&["account", "create", "bob@example.com"]);
    assert_eq!(
        exit_code(sandbox.cmd().args(["alias", "add", "alice@example.com", "bob@example.com"])),
        Some(6)
    );
}

// ── Groups and membership ───────────────────────────────────────────

#[test]
fn test_nested_membership_is_reported() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);
    sandbox.run(&["group", "create", "team@example.com"]);
    sandbox.run(&["group", "create", "all@example.com", "--admin"]);
    sandbox.run(&["group", "add-members", "team@example.com", "alice@example.com"]);
    sandbox.run(&["group", "add-members", "all@example.com", "team@example.com"]);

    assert_eq!(
        sandbox.plain(&["group", "members", "team@example.com"]),
        ["alice@example.com"]
    );

    let groups = sandbox.json(&["account", "memberships", "alice@example.com"]);
    let names: Vec<&str> = groups
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["all@example.com", "team@example.com"]);

    assert_eq!(
        sandbox.plain(&["account", "memberships", "alice@example.com", "--direct"]),
        ["team@example.com"]
    );
    assert_eq!(
        sandbox.plain(&["account", "memberships", "alice@example.com", "--admin-only"]),
        ["all@example.com"]
    );
}

#[test]
fn test_dynamic_group_lists_added_members() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);
    sandbox.run(&["group", "create", "staff@example.com", "--dynamic"]);
    sandbox.run(&[
        "group",
        "add-members",
        "staff@example.com",
        "alice@example.com",
        "partner@other.org",
    ]);

    let mut members = sandbox.plain(&["group", "members", "staff@example.com"]);
    members.sort();
    assert_eq!(members, ["alice@example.com", "partner@other.org"]);
}

// ── Renames ─────────────────────────────────────────────────────────

#[test]
fn test_account_rename_keeps_group_membership() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);
    sandbox.run(&["group", "create", "team@example.com"]);
    sandbox.run(&["group", "add-members", "team@example.com", "alice@example.com"]);

    let report = sandbox.json(&["account", "rename", "alice@example.com", "alicia@example.com"]);
    assert_eq!(report["new_name"], "alicia@example.com");

    assert_eq!(
        sandbox.plain(&["group", "members", "team@example.com"]),
        ["alicia@example.com"]
    );
}

#[test]
fn test_domain_rename_moves_everything() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com"]);
    sandbox.run(&["group", "create", "team@example.com"]);
    sandbox.run(&["group", "add-members", "team@example.com", "alice@example.com"]);

    sandbox.run(&["domain", "rename", "example.com", "example.org", "-y"]);

    assert_eq!(sandbox.plain(&["domain", "list"]), ["example.org"]);
    assert_eq!(sandbox.plain(&["account", "list"]), ["alice@example.org"]);
    assert_eq!(
        sandbox.plain(&["group", "members", "team@example.org"]),
        ["alice@example.org"]
    );
}

// ── Authentication ──────────────────────────────────────────────────

#[test]
fn test_authentication_and_lockout() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox
        .cmd()
        .args(["account", "create", "alice@example.com", "--password-stdin"])
        .write_stdin("s3cret\n")
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["account", "authenticate", "alice@example.com", "--password-stdin"])
        .write_stdin("s3cret\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Authenticated as alice@example.com"));

    for _ in 0..2 {
        let code = exit_code(
            sandbox
                .cmd()
                .env("DIRPROV_LOCKOUT__MAX_FAILURES", "2")
                .args(["account", "auth", "alice@example.com", "--password-stdin"])
                .write_stdin("wrong\n"),
        );
        assert_eq!(code, Some(3));
    }

    // Locked out: even the right password is refused now.
    let output = sandbox
        .cmd()
        .args(["account", "auth", "alice@example.com", "--password-stdin"])
        .write_stdin("s3cret\n")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("lockout"));

    let account = sandbox.json(&["account", "get", "alice@example.com"]);
    assert_eq!(account["attributes"]["accountstatus"][0], "lockout");
    assert!(account["attributes"].get("userpassword").is_none());
}

// ── Search and caches ───────────────────────────────────────────────

#[test]
fn test_search_with_filter() {
    let sandbox = Sandbox::new().with_domain("example.com");
    sandbox.run(&["account", "create", "alice@example.com", "--attr", "ou=sales"]);
    sandbox.run(&["account", "create", "bob@example.com", "--attr", "ou=ops"]);

    assert_eq!(
        sandbox.plain(&["search", "--kind", "account", "--filter", "(ou=sales)"]),
        ["alice@example.com"]
    );
    assert_eq!(
        exit_code(sandbox.cmd().args(["search", "--filter", "(ou=sales"])),
        Some(2)
    );
}

#[test]
fn test_cache_stats_lists_every_cache() {
    let sandbox = Sandbox::new();
    let stats = sandbox.json(&["cache", "stats"]);
    assert_eq!(stats.as_array().unwrap().len(), 6);
    sandbox.run(&["cache", "flush", "all"]);
}
