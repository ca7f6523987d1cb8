// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Black-box CLI tests driving the `jobmesh` binary with `assert_cmd`,
//! covering the command surface that does not need a live dispatcher
//! (`--help`, `config`, `completions`). Commands that talk to a running
//! dispatcher (`submit`, `status`, `cancel`, `workers`, `serve`,
//! `worker`) are exercised at the handler/HTTP level in
//! `core/tests/dispatch_scenarios.rs` instead.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn jobmesh() -> Command {
    Command::cargo_bin("jobmesh").unwrap()
}

#[test]
fn help_lists_every_top_level_command() {
    jobmesh()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("worker"))
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("cancel"))
        .stdout(predicate::str::contains("workers"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn no_subcommand_prints_help_and_fails() {
    jobmesh().assert().failure();
}

#[test]
fn submit_help_lists_resource_flags() {
    jobmesh()
        .args(["submit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--cpu"))
        .stdout(predicate::str::contains("--ram-mb"))
        .stdout(predicate::str::contains("--timeout-ms"))
        .stdout(predicate::str::contains("--max-retries"));
}

/// `config init` / `config show` have no `--config` override; they always
/// resolve through `dirs::config_dir()`. Point `HOME` (and `XDG_CONFIG_HOME`,
/// which `dirs` prefers when set) at a scratch directory so these don't
/// touch the real user's config.
#[test]
fn config_init_writes_a_file_and_show_round_trips_it() {
    let dir = TempDir::new().unwrap();
    let xdg_config = dir.path().join(".config");
    std::fs::create_dir_all(&xdg_config).unwrap();

    jobmesh()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", &xdg_config)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration written to"));

    let config_path = xdg_config.join("jobmesh").join("config.toml");

    jobmesh()
        .args(["config", "validate", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration is valid"));

    jobmesh()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", &xdg_config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dispatcher]"))
        .stdout(predicate::str::contains("[scheduler]"))
        .stdout(predicate::str::contains("[worker]"))
        .stdout(predicate::str::contains("[sandbox]"))
        .stdout(predicate::str::contains("[security]"));
}

#[test]
fn config_validate_rejects_a_malformed_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("bad.toml");
    std::fs::write(&config_path, "[scheduler]\nmax_cpu_usage_pct = 250.0\n").unwrap();

    jobmesh()
        .args(["config", "validate", "--config"])
        .arg(&config_path)
        .assert()
        .failure();
}

#[test]
fn completions_generates_a_nonempty_script_per_shell() {
    for shell in ["bash", "zsh", "fish"] {
        jobmesh()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("jobmesh"));
    }
}
