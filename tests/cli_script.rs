use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use regex::Regex;

/// Writes a config that keeps the run inside `home` and skips sample data.
fn prepared_home() -> assert_fs::TempDir {
    let home = assert_fs::TempDir::new().unwrap();
    let config = serde_json::json!({
        "seed_sample_data": false,
        "legacy_data_dir": home.path().join("no-legacy"),
        "ui_color_enabled": false,
    });
    home.child("config/config.json")
        .write_str(&config.to_string())
        .unwrap();
    home
}

fn cli(home: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tax_tracker_cli").unwrap();
    cmd.env("TAX_TRACKER_HOME", home.path())
        .env("TAX_TRACKER_CLI_SCRIPT", "1")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn script_mode_records_invoices_and_rates() {
    let home = prepared_home();
    let input = "\
# comments and blank lines are skipped

invoice add date=2024-05-02 company=\"Acme Ltd\" no=A-1 subtotal=1000 vat=18
invoice add date=2024-05-09 company=Globex no=G-7 subtotal=100 currency=usd type=sale
fx set month=2024-05 usd=30 eur=33
invoice list month=2024-05
dashboard
exit
";
    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Invoice 1 added"))
        .stdout(contains("FX rate 1 for 2024-05 added"))
        .stdout(contains("Acme Ltd"))
        .stdout(contains("Totals by currency"))
        .stdout(contains("Net VAT"));

    home.child("data/invoices.json")
        .assert(contains("\"company\": \"Globex\"").and(contains("\"invoice_type\": \"sale\"")));
    home.child("data/fxrates.json").assert(contains("\"usd_to_try\": 30.0"));
}

#[test]
fn script_mode_reports_errors_and_keeps_going() {
    let home = prepared_home();
    let input = "invoice remove 42\ninvoce list\nfx set month=2024-13 usd=1 eur=1\nversion\n";
    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stderr(contains("invoice remove 42: Invoice 42 not found"))
        .stderr(contains("fx set month=2024-13 usd=1 eur=1: "))
        .stdout(contains("Did you mean `invoice`?"))
        .stdout(contains("Tax Tracker"));
}

#[test]
fn first_run_seeds_sample_data() {
    let home = assert_fs::TempDir::new().unwrap();
    home.child("config/config.json")
        .write_str(
            &serde_json::json!({ "legacy_data_dir": home.path().join("no-legacy") }).to_string(),
        )
        .unwrap();
    cli(&home)
        .write_stdin("invoice list\n")
        .assert()
        .success()
        .stdout(contains("Sample Company Ltd."));
}

#[test]
fn backups_are_listed_with_timestamped_names() {
    let home = prepared_home();
    let input = "\
invoice add date=2024-05-02 company=Acme no=A-1 subtotal=10
invoice add date=2024-05-03 company=Acme no=A-2 subtotal=20
backup list file=invoices
";
    let output = cli(&home).write_stdin(input).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let pattern = Regex::new(r"invoices_\d{8}_\d{6}_\d{3}\.json").unwrap();
    assert!(pattern.is_match(&stdout), "no backup listed in:\n{stdout}");
}
