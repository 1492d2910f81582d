use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/marathon.json")
}

#[allow(deprecated)]
fn runsheet() -> Command {
    let mut cmd = Command::cargo_bin("runsheet").expect("runsheet binary");
    cmd.env_remove("RUST_LOG");
    // Keep a stray runsheet.toml in the caller's directory out of the picture.
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd
}

// ── export ──────────────────────────────────────────────────────────

#[test]
fn export_csv_to_stdout() {
    runsheet()
        .arg("export")
        .arg(fixture())
        .args(["--format", "CSV"])
        .assert()
        .success()
        .stdout(contains("Scheduled,Estimate,Game,Runner\r\n"))
        .stdout(contains("2024-01-01T10:15:00+00:00,PT30M,Opening,Hosts\r\n"))
        .stdout(contains("2024-01-01T10:45:00+00:00,PT1H,Celeste,Alice\r\n"))
        .stdout(contains("mic check").not());
}

#[test]
fn export_flags_override_defaults() {
    runsheet()
        .arg("export")
        .arg(fixture())
        .args(["--format", "csv", "--include-hidden", "--active-only"])
        .assert()
        .success()
        .stdout(contains("Scheduled,Estimate,Game,Runner,Notes\r\n"))
        .stdout(contains(",mic check\r\n"))
        .stdout(contains("PT0S").not());
}

#[test]
fn export_json_is_a_schedule_document() {
    let assert = runsheet()
        .arg("export")
        .arg(fixture())
        .args(["--format", "json"])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(value["schedule"]["end"], "2024-01-01T11:45:00+00:00");
    assert_eq!(value["schedule"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(value["schedule"]["event"]["slug"], "wm");
}

#[test]
fn export_into_directory_uses_conventional_filename() {
    let dir = tempfile::tempdir().unwrap();
    runsheet()
        .arg("export")
        .arg(fixture())
        .args(["--format", "ical", "--output"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(dir.path().join("wm-day-1.ics")).unwrap();
    assert!(written.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(written.contains("DTSTART:20240101T101500Z\r\n"));
    assert!(written.contains("STATUS:CANCELLED\r\n"));
}

#[test]
fn export_to_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.xml");
    runsheet()
        .arg("export")
        .arg(fixture())
        .args(["--format", "xml", "--output"])
        .arg(&target)
        .assert()
        .success();

    let written = std::fs::read_to_string(target).unwrap();
    assert!(written.contains("<export version=\"1\""));
    assert!(written.contains("<value>Celeste</value>"));
}

#[test]
fn unsupported_format_fails_without_output() {
    runsheet()
        .arg("export")
        .arg(fixture())
        .args(["--format", "yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("Unsupported format"))
        .stderr(contains("yaml"));
}

#[test]
fn missing_snapshot_reports_path() {
    runsheet()
        .args(["export", "does-not-exist.json", "--format", "json"])
        .assert()
        .failure()
        .stderr(contains("does-not-exist.json"));
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn config_file_sets_default_format_and_options() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("runsheet.toml");
    std::fs::write(
        &config,
        "[export]\ndefault_format = \"csv\"\ninclude_inactive = false\n",
    )
    .unwrap();

    runsheet()
        .arg("export")
        .arg(fixture())
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(contains("Scheduled,Estimate"))
        .stdout(contains("PT0S").not());
}

#[test]
fn explicit_missing_config_fails() {
    runsheet()
        .arg("export")
        .arg(fixture())
        .args(["--config", "/nonexistent/runsheet.toml"])
        .assert()
        .failure()
        .stderr(contains("config"));
}

// ── times ───────────────────────────────────────────────────────────

#[test]
fn times_lists_starts_and_end() {
    runsheet()
        .arg("times")
        .arg(fixture())
        .assert()
        .success()
        .stdout(contains("2024-01-01 10:15:00 +00:00"))
        .stdout(contains("Bonus (skipped)"))
        .stdout(contains("end  2024-01-01 11:45:00 +00:00"));
}

#[test]
fn times_in_another_zone() {
    runsheet()
        .arg("times")
        .arg(fixture())
        .args(["--tz", "America/New_York", "--active-only"])
        .assert()
        .success()
        .stdout(contains("2024-01-01 05:15:00 -05:00"))
        .stdout(contains("Bonus").not());
}

#[test]
fn times_rejects_unknown_zone() {
    runsheet()
        .arg("times")
        .arg(fixture())
        .args(["--tz", "Nowhere/City"])
        .assert()
        .failure()
        .stderr(contains("Invalid timezone"));
}

// ── formats ─────────────────────────────────────────────────────────

#[test]
fn formats_lists_every_token() {
    runsheet()
        .arg("formats")
        .assert()
        .success()
        .stdout(contains("json"))
        .stdout(contains("text/calendar; charset=utf-8"))
        .stdout(contains(".ics"))
        .stdout(contains("text/csv; charset=utf-8"));
}
