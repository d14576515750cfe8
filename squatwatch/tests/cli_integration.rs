// squatwatch/tests/cli_integration.rs
//
// Everything here runs offline: scans use --dry-run with manual targets and
// --no-llm, and HOME/XDG point at an empty temp dir so no user config leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A squatwatch command isolated from the user's config and environment.
fn squatwatch(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("squatwatch").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("GITHUB_STEP_SUMMARY");
    for var in [
        "SW_TLD",
        "SW_STRATEGIES",
        "SW_CONCURRENCY",
        "SW_RPS",
        "SW_MAX_RETRIES",
        "SW_DEADLINE",
        "SW_LLM",
        "SW_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("list-presets"));
}

#[test]
fn test_scan_help_shows_flags() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .args(["scan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--no-llm"))
        .stdout(predicate::str::contains("--max-per-brand"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_list_presets() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .arg("list-presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available TLD Presets:"))
        .stdout(predicate::str::contains("startup"))
        .stdout(predicate::str::contains("(8)"));
}

#[test]
fn test_dry_run_lists_candidates() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .args([
            "scan",
            "--target",
            "paypal",
            "--tld",
            "com",
            "--strategy",
            "omission",
            "--no-llm",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run: 1 target"))
        .stdout(predicate::str::contains("paypl.com"))
        .stdout(predicate::str::contains("omission"))
        .stdout(predicate::str::contains("paypal.com").not());
}

#[test]
fn test_dry_run_json() {
    let home = TempDir::new().unwrap();
    let output = squatwatch(&home)
        .args([
            "scan",
            "--target",
            "stripe",
            "--tld",
            "com,io",
            "--strategy",
            "transposition",
            "--no-llm",
            "--dry-run",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["targets"].as_array().unwrap().len(), 1);
    let candidates = plan["candidates"].as_array().unwrap();
    assert!(!candidates.is_empty());
    assert!(candidates
        .iter()
        .all(|c| c["strategy"] == "transposition"));
    assert!(candidates
        .iter()
        .any(|c| c["domain"] == "tsripe.io"));
}

#[test]
fn test_config_file_is_applied() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");
    fs::write(
        &config,
        r#"
[generation]
strategies = ["omission"]
tlds = ["net"]
"#,
    )
    .unwrap();

    squatwatch(&home)
        .args(["scan", "--target", "paypal", "--no-llm", "--dry-run", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("paypl.net"))
        .stdout(predicate::str::contains("paypl.com").not());
}

#[test]
fn test_cli_flags_override_config_file() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("squatwatch.toml"),
        "[generation]\nstrategies = [\"omission\"]\ntlds = [\"net\"]\n",
    )
    .unwrap();

    squatwatch(&home)
        .args([
            "scan", "--target", "paypal", "--tld", "org", "--no-llm", "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("paypl.org"))
        .stdout(predicate::str::contains("paypl.net").not());
}

#[test]
fn test_bad_config_exits_nonzero() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("broken.toml");
    fs::write(&config, "[verification]\ndeadline = \"soon\"\n").unwrap();

    squatwatch(&home)
        .args(["scan", "--target", "paypal", "--no-llm", "--dry-run", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_missing_config_exits_nonzero() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .args([
            "scan",
            "--target",
            "paypal",
            "--dry-run",
            "--config",
            "does-not-exist.toml",
        ])
        .assert()
        .failure();
}

#[test]
fn test_tld_and_preset_conflict() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .args([
            "scan", "--target", "paypal", "--tld", "com", "--preset", "startup", "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--preset"));
}

#[test]
fn test_unknown_strategy_is_rejected() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .args([
            "scan",
            "--target",
            "paypal",
            "--strategy",
            "bitflip",
            "--no-llm",
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown strategy"));
}

#[test]
fn test_unknown_preset_is_rejected() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .args([
            "scan",
            "--target",
            "paypal",
            "--preset",
            "galactic",
            "--no-llm",
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("galactic"));
}

#[test]
fn test_concurrency_out_of_range() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .args(["scan", "--target", "paypal", "--concurrency", "500", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 100"));
}

#[test]
fn test_env_strategies_apply() {
    let home = TempDir::new().unwrap();
    squatwatch(&home)
        .env("SW_STRATEGIES", "doubling")
        .env("SW_TLD", "io")
        .args(["scan", "--target", "stripe", "--no-llm", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sstripe.io"))
        .stdout(predicate::str::contains("doubling"));
}
