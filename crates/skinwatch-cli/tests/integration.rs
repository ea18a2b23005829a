#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ITEMS_JSON: &str = r#"{
    "Genji": [ { "code": "G1", "name": "Sentai", "is_active": false } ],
    "Ana": [ { "code": "A1", "name": "Captain", "is_active": true } ]
}"#;

fn skinwatch(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("skinwatch").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("SKINWATCH_CONFIG")
        .env_remove("BNET_COOKIE")
        .env_remove("NOTIFICATION_CHANNEL_ID")
        .env_remove("DISCORD_TOKEN")
        .env_remove("SKINWATCH_DB")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, body: &str) {
    std::fs::write(dir.path().join("skinwatch.yaml"), body).unwrap();
}

fn seed(dir: &TempDir) {
    std::fs::write(dir.path().join("items.json"), ITEMS_JSON).unwrap();
    skinwatch(dir)
        .args(["migrate", "items.json"])
        .assert()
        .success();
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// skinwatch config
// ---------------------------------------------------------------------------

#[test]
fn config_show_redacts_secrets() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "credential: real-cookie\n");

    skinwatch(&dir)
        .args(["config", "show"])
        .env("DISCORD_TOKEN", "real-token")
        .env("NOTIFICATION_CHANNEL_ID", "42")
        .assert()
        .success()
        .stdout(predicate::str::contains("real-cookie").not())
        .stdout(predicate::str::contains("real-token").not())
        .stdout(predicate::str::contains("'42'").or(predicate::str::contains("\"42\"")));
}

#[test]
fn config_show_without_file_prints_defaults() {
    let dir = TempDir::new().unwrap();
    skinwatch(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://eu.battle.net/shop/en/checkout/buy",
        ))
        .stdout(predicate::str::contains("type: daily"));
}

#[test]
fn config_validate_flags_missing_credential() {
    let dir = TempDir::new().unwrap();
    skinwatch(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("BNET_COOKIE"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_validate_passes_with_everything_set() {
    let dir = TempDir::new().unwrap();
    skinwatch(&dir)
        .args(["config", "validate"])
        .env("BNET_COOKIE", "session=abc")
        .env("NOTIFICATION_CHANNEL_ID", "1")
        .env("DISCORD_TOKEN", "t")
        .assert()
        .success()
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "schedule: [not, a, map]\n");
    skinwatch(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ---------------------------------------------------------------------------
// skinwatch migrate
// ---------------------------------------------------------------------------

#[test]
fn migrate_imports_and_is_rerunnable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("items.json"), ITEMS_JSON).unwrap();

    let first = skinwatch(&dir)
        .args(["--json", "migrate", "items.json"])
        .output()
        .unwrap();
    assert!(first.status.success());
    let report = stdout_json(&first);
    assert_eq!(report["heroes_inserted"], 2);
    assert_eq!(report["skins_inserted"], 2);
    assert!(dir.path().join("data/skins.db").exists());

    let second = skinwatch(&dir)
        .args(["--json", "migrate", "items.json"])
        .output()
        .unwrap();
    assert!(second.status.success());
    let report = stdout_json(&second);
    assert_eq!(report["heroes_inserted"], 0);
    assert_eq!(report["skins_inserted"], 0);
    assert_eq!(report["skins_skipped"], 2);
}

#[test]
fn migrate_into_json_store_is_refused() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("items.json"), ITEMS_JSON).unwrap();
    write_config(&dir, "store:\n  type: json\n  path: items.json\n");

    skinwatch(&dir)
        .args(["migrate", "items.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sqlite"));
}

#[test]
fn migrate_missing_source_fails() {
    let dir = TempDir::new().unwrap();
    skinwatch(&dir)
        .args(["migrate", "absent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
}

// ---------------------------------------------------------------------------
// skinwatch check
// ---------------------------------------------------------------------------

#[test]
fn check_without_credential_aborts() {
    let dir = TempDir::new().unwrap();
    seed(&dir);

    let output = skinwatch(&dir).args(["--json", "check"]).output().unwrap();

    assert!(!output.status.success());
    let outcome = stdout_json(&output);
    assert_eq!(outcome["aborted"], true);
    assert_eq!(outcome["abort_reason"]["kind"], "configuration_missing");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cycle aborted"));
}

#[test]
fn check_reconciles_flags_against_the_storefront() {
    let mut server = mockito::Server::new();
    // A1 is stored active but gone; G1 is stored inactive but back on sale.
    let gone = server
        .mock("GET", "/checkout/buy/A1")
        .match_header("cookie", "session=abc")
        .with_status(404)
        .expect(2)
        .create();
    let back = server
        .mock("GET", "/checkout/buy/G1")
        .with_status(200)
        .expect(2)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        &format!(
            "base_url: {}/checkout/buy\nrequest_delay_ms: 0\n",
            server.url()
        ),
    );
    seed(&dir);

    let first = skinwatch(&dir)
        .args(["--json", "check"])
        .env("BNET_COOKIE", "session=abc")
        .output()
        .unwrap();
    assert!(first.status.success());
    let outcome = stdout_json(&first);
    assert_eq!(outcome["total_records"], 2);
    assert_eq!(outcome["updated_count"], 2);
    assert_eq!(outcome["aborted"], false);

    let second = skinwatch(&dir)
        .args(["--json", "check"])
        .env("BNET_COOKIE", "session=abc")
        .output()
        .unwrap();
    let outcome = stdout_json(&second);
    assert_eq!(outcome["updated_count"], 0);
    assert_eq!(outcome["unchanged_count"], 2);

    gone.assert();
    back.assert();
}

#[test]
fn check_with_zero_redirect_budget_is_refused() {
    let mut server = mockito::Server::new();
    let never = server
        .mock("GET", "/checkout/buy/A1")
        .with_status(404)
        .expect(0)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        &format!(
            "base_url: {}/checkout/buy\nmax_redirects: 0\n",
            server.url()
        ),
    );
    seed(&dir);

    skinwatch(&dir)
        .args(["check"])
        .env("BNET_COOKIE", "session=abc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_redirects"));

    // Refused before any request could be sent.
    never.assert();
}

// ---------------------------------------------------------------------------
// skinwatch probe
// ---------------------------------------------------------------------------

#[test]
fn probe_classifies_without_writing() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/checkout/buy/A1")
        .with_status(404)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &format!("base_url: {}/checkout/buy\n", server.url()));
    seed(&dir);

    let output = skinwatch(&dir)
        .args(["--json", "probe", "A1"])
        .env("BNET_COOKIE", "session=abc")
        .output()
        .unwrap();
    assert!(output.status.success());
    let reports = stdout_json(&output);
    assert_eq!(reports[0]["verdict"], "inactive");
    assert_eq!(reports[0]["rule"], "not-found");
    assert_eq!(reports[0]["stored"]["active"], true);

    // Still active: probe without --apply never writes.
    skinwatch(&dir)
        .args(["probe", "A1"])
        .env("BNET_COOKIE", "session=abc")
        .assert()
        .success()
        .stdout(predicate::str::contains("inactive"))
        .stdout(predicate::str::contains("true"));
}

#[test]
fn probe_apply_writes_the_verdict() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/checkout/buy/A1")
        .with_status(404)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &format!("base_url: {}/checkout/buy\n", server.url()));
    seed(&dir);

    let output = skinwatch(&dir)
        .args(["--json", "probe", "A1", "--apply"])
        .env("BNET_COOKIE", "session=abc")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)[0]["action"], "updated");

    let output = skinwatch(&dir)
        .args(["--json", "probe", "A1"])
        .env("BNET_COOKIE", "session=abc")
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)[0]["stored"]["active"], false);
}

#[test]
fn probe_without_credential_fails() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    skinwatch(&dir)
        .args(["probe", "A1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BNET_COOKIE"));
}
