//! End-to-end runs of the binary against a recorded snapshot.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn snapshot_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/snapshot.json")
}

/// The binary, run from an empty directory with no credentials in the environment.
fn payout_export(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("payout-export").unwrap();
    cmd.current_dir(workdir.path())
        .env_remove("STRIPE_API_KEY")
        .env_remove("OUTPUT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_export_single_payout() {
    let workdir = TempDir::new().unwrap();
    let output = workdir.path().join("out");

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args(["export", "--payout", "po_123", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("po_123"))
        .stdout(predicate::str::contains("1 exported (0 with warnings), 0 failed"));

    let bundle = output.join("payout_20240215_po_123");
    assert!(bundle.join("summary.csv").exists());
    assert!(bundle.join("transactions.csv").exists());
    assert!(bundle.join("invoices.csv").exists());
    assert!(bundle.join("fees.csv").exists());
    assert!(bundle.join("report.json").exists());
    assert!(bundle.join("summary.xlsx").exists());
    assert!(bundle.join("report.pdf").exists());
    assert!(output.join("payout_20240215_po_123.zip").exists());
}

#[test]
fn test_export_range_reports_warnings() {
    let workdir = TempDir::new().unwrap();
    let output = workdir.path().join("out");

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args([
            "--locale", "en", "export", "--from", "2024-02-01", "--to", "2024-02-29",
            "--no-invoices", "--no-archive", "--output",
        ])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported with warnings"))
        .stdout(predicate::str::contains("2 exported (1 with warnings), 0 failed"));

    assert!(output.join("payout_20240215_po_123").is_dir());
    assert!(output.join("payout_20240218_po_456").is_dir());
    assert!(!output.join("payout_20240215_po_123.zip").exists());
}

#[test]
fn test_empty_range_is_not_an_error() {
    let workdir = TempDir::new().unwrap();

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args(["summary", "--from", "2024-01-01", "--to", "2024-01-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No payouts found"));
}

#[test]
fn test_summary_prints_totals() {
    let workdir = TempDir::new().unwrap();

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args(["--locale", "en", "summary", "--payout", "po_123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4.70"))
        .stdout(predicate::str::contains("4.40"))
        .stdout(predicate::str::contains("Payment: 1, Refund: 1, Fee: 1"));
}

#[test]
fn test_payouts_lists_in_settlement_order() {
    let workdir = TempDir::new().unwrap();

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args(["payouts", "--from", "2024-02-01", "--to", "2024-02-29"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("(?s)po_123.*po_456").unwrap())
        .stdout(predicate::str::contains("2 payout(s)"));
}

#[test]
fn test_summary_rejects_unknown_format() {
    let workdir = TempDir::new().unwrap();

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args(["summary", "--payout", "po_123", "--format", "csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported format 'csv'"));
}

#[test]
fn test_french_summary_uses_french_kind_names() {
    let workdir = TempDir::new().unwrap();

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args(["summary", "--payout", "po_123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paiement: 1, Remboursement: 1, Frais: 1"));
}

#[test]
fn test_invalid_payout_id_fails() {
    let workdir = TempDir::new().unwrap();

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args(["export", "--payout", "ch_123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scope"));
}

#[test]
fn test_reversed_range_fails() {
    let workdir = TempDir::new().unwrap();

    payout_export(&workdir)
        .arg("--snapshot")
        .arg(snapshot_path())
        .args(["summary", "--from", "2024-02-29", "--to", "2024-02-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scope"));
}

#[test]
fn test_missing_api_key_fails() {
    let workdir = TempDir::new().unwrap();

    payout_export(&workdir)
        .args(["export", "--payout", "po_123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key"));
}
