//! CLI integration tests for artbot-post

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

const CATALOG: &str = r#"[
    {
        "name": "Shock",
        "image_uris": { "art_crop": "https://cards.example/art/shock.jpg" },
        "set_name": "Magic 2010",
        "flavor_text": "Lightning tethered.",
        "artist": "Jon Foster"
    }
]"#;

/// Write a catalog and a config using a SQLite ledger; returns (dir, config, ledger)
fn setup_test_env(catalog: &str) -> (TempDir, String, String) {
    let temp_dir = TempDir::new().unwrap();

    let catalog_path = temp_dir.path().join("cards.json");
    fs::write(&catalog_path, catalog).unwrap();

    let ledger_path = temp_dir.path().join("data").join("ledger.db");
    let config_path = temp_dir.path().join("config.toml");

    let config_content = format!(
        r#"
[catalog]
source = "file"
path = "{}"

[ledger]
backend = "sqlite"
path = "{}"

[credentials]
source = "env"
"#,
        escape_path_for_toml(&catalog_path),
        escape_path_for_toml(&ledger_path)
    );
    fs::write(&config_path, config_content).unwrap();

    (
        temp_dir,
        config_path.to_string_lossy().to_string(),
        ledger_path.to_string_lossy().to_string(),
    )
}

#[test]
fn test_help_flag_output() {
    let mut cmd = Command::cargo_bin("artbot-post").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("avoiding recently posted ones"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("EXIT CODES"));
}

#[test]
fn test_short_help_uses_about() {
    let mut cmd = Command::cargo_bin("artbot-post").unwrap();

    cmd.arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Post a random card's art to Bluesky"))
        .stdout(predicate::str::contains("EXIT CODES").not());
}

#[test]
fn test_dry_run_prints_selected_card() {
    let (_temp_dir, config_path, _ledger_path) = setup_test_env(CATALOG);

    let mut cmd = Command::cargo_bin("artbot-post").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Shock (Magic 2010)"))
        .stdout(predicate::str::contains("Artist: Jon Foster"))
        .stdout(predicate::str::contains("#magicthegathering #mtg"));
}

#[test]
fn test_dry_run_json_report() {
    let (_temp_dir, config_path, _ledger_path) = setup_test_env(CATALOG);

    let mut cmd = Command::cargo_bin("artbot-post").unwrap();
    let output = cmd
        .env("ARTBOT_CONFIG", &config_path)
        .args(["--dry-run", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["name"], "Shock");
    assert_eq!(report["set"], "Magic 2010");
    assert_eq!(report["post_uri"], serde_json::Value::Null);
    assert_eq!(report["resamples"], 0);
    assert_eq!(report["duplicate"], false);
    assert_eq!(report["ledger_degraded"], false);
}

#[tokio::test]
async fn test_dry_run_leaves_ledger_empty() {
    let (_temp_dir, config_path, ledger_path) = setup_test_env(CATALOG);

    for _ in 0..2 {
        Command::cargo_bin("artbot-post")
            .unwrap()
            .args(["--config", &config_path, "--dry-run", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"duplicate\": false"));
    }

    let pool = sqlx::SqlitePool::connect(&format!("sqlite://{}", ledger_path))
        .await
        .unwrap();
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ledger_entries")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_missing_config_file_exits_1() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    Command::cargo_bin("artbot-post")
        .unwrap()
        .arg("--config")
        .arg(&missing)
        .arg("--dry-run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_unpostable_catalog_exits_3() {
    let (_temp_dir, config_path, _ledger_path) = setup_test_env(
        r#"[{"name": "Shock", "set_name": "Magic 2010", "artist": "Jon Foster"}]"#,
    );

    Command::cargo_bin("artbot-post")
        .unwrap()
        .args(["--config", &config_path, "--dry-run"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("can be posted"));
}

#[test]
fn test_malformed_catalog_exits_1() {
    let (_temp_dir, config_path, _ledger_path) = setup_test_env("{ not json");

    Command::cargo_bin("artbot-post")
        .unwrap()
        .args(["--config", &config_path, "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse catalog"));
}

#[test]
fn test_missing_credentials_exit_2() {
    let (_temp_dir, config_path, _ledger_path) = setup_test_env(CATALOG);

    Command::cargo_bin("artbot-post")
        .unwrap()
        .args(["--config", &config_path])
        .env_remove("BSKY_USER")
        .env_remove("BSKY_PASSWORD")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("BSKY_USER"));
}

#[test]
fn test_invalid_format_is_rejected() {
    Command::cargo_bin("artbot-post")
        .unwrap()
        .args(["--format", "csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
