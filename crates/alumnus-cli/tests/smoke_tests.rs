//! Smoke tests for the alumnus CLI
//!
//! None of these open a browser: they cover help output, configuration,
//! template listing and message previews from a CSV sheet.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the alumnus binary, isolated from any local config
fn alumnus(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("alumnus").expect("alumnus binary should exist");
    cmd.current_dir(dir.path()).env_remove("ALUMNUS_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn sheet(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("mezunlar.csv");
    fs::write(
        &path,
        "Ad Soyad,LinkedIn URL,Mezuniyet Yılı,Şirket,Pozisyon,Durum\n\
         Ayşe Yılmaz,linkedin.com/in/ayse,2015,Aselsan,Mühendis,\n\
         Mehmet Demir,https://www.linkedin.com/in/mehmet,2012,,,Bekliyor\n\
         Zeynep Kaya,linkedin.com/in/zeynep,2010,,,Gönderildi\n",
    )
    .unwrap();
    path
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    alumnus(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    alumnus(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("check-login"));
}

#[test]
fn test_no_args_fails() {
    let dir = TempDir::new().unwrap();
    alumnus(&dir).assert().failure();
}

#[test]
fn test_run_help() {
    let dir = TempDir::new().unwrap();
    alumnus(&dir)
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-contacts"))
        .stdout(predicate::str::contains("--delay"));
}

// ============================================================================
// Templates and Config
// ============================================================================

#[test]
fn test_templates_lists_built_ins() {
    let dir = TempDir::new().unwrap();
    alumnus(&dir)
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("tr_formal"))
        .stdout(predicate::str::contains("quick"));
}

#[test]
fn test_config_default_is_yaml() {
    let dir = TempDir::new().unwrap();
    alumnus(&dir)
        .args(["config", "--default"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_contacts: 25"))
        .stdout(predicate::str::contains("LinkedIn URL"));
}

#[test]
fn test_config_file_is_read() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("ozel.yaml");
    fs::write(&config, "campaign:\n  max_contacts: 7\n").unwrap();
    alumnus(&dir)
        .args(["--config", config.to_str().unwrap(), "config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_contacts: 7"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bozuk.yaml");
    fs::write(&config, "campaign:\n  max_contacts: 0\n").unwrap();
    alumnus(&dir)
        .args(["--config", config.to_str().unwrap(), "config", "--show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_contacts"));
}

// ============================================================================
// Preview
// ============================================================================

#[test]
fn test_preview_renders_pending_only() {
    let dir = TempDir::new().unwrap();
    let sheet = sheet(&dir);
    alumnus(&dir)
        .args(["preview", "--template", "quick", "--sheet", sheet.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ayşe"))
        .stdout(predicate::str::contains("Mehmet"))
        .stdout(predicate::str::contains("Zeynep").not());
}

#[test]
fn test_preview_limit() {
    let dir = TempDir::new().unwrap();
    let sheet = sheet(&dir);
    alumnus(&dir)
        .args(["preview", "--limit", "1", "--sheet", sheet.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("and 1 more pending"));
}

#[test]
fn test_preview_unknown_template_fails() {
    let dir = TempDir::new().unwrap();
    let sheet = sheet(&dir);
    alumnus(&dir)
        .args(["preview", "--template", "nope", "--sheet", sheet.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown template"));
}

#[test]
fn test_preview_missing_sheet_fails() {
    let dir = TempDir::new().unwrap();
    alumnus(&dir)
        .args(["preview", "--sheet", "yok.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}
