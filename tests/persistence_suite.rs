mod common;

use std::fs;

use assert_fs::prelude::*;
use common::{date, draft, isolated_store};
use tax_tracker::{
    core::BookManager,
    currency::CurrencyCode,
    domain::{FxRateDraft, InvoiceType, YearMonth},
    storage::{JsonStore, RecordFile, RecordStore, StorePaths},
    utils::fs::tmp_path,
};

const LEGACY_INVOICES: &str = r#"[
  {"id": 1, "date": "2023-11-03", "company": "Old Supplier", "invoice_no": "OS-1",
   "amount": 500.0, "vat_rate": 20.0, "currency": "EUR", "total": 600.0},
  {"id": 4, "date": "2023-12-01", "company": "Old Client", "invoice_no": "OC-9",
   "subtotal": 250.0, "vat_rate": 18.0, "currency": "TRY", "invoice_type": "sale", "total": 295.0}
]"#;

const LEGACY_RATES: &str =
    r#"[{"id": 1, "year": 2023, "month": 11, "usd_rate": 28.6, "eur_rate": 30.9}]"#;

#[test]
fn atomic_save_failure_preserves_original_file() {
    let store = isolated_store();
    let (mut manager, _) =
        BookManager::open(Box::new(store.clone()), CurrencyCode::default(), false).unwrap();
    manager
        .add_invoice(draft(date(2024, 1, 5), "Reliable", 42.0, "TRY"))
        .unwrap();
    let path = store.file_path(RecordFile::Invoices);
    let original = fs::read_to_string(&path).unwrap();

    // a directory where the staging file should go makes the write fail
    fs::create_dir_all(tmp_path(&path)).unwrap();
    let result = manager.add_invoice(draft(date(2024, 1, 6), "Reliable", 99.0, "TRY"));
    assert!(result.is_err(), "expected the save to fail");

    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    assert_eq!(manager.book().invoices.len(), 1);
}

#[test]
fn legacy_files_are_copied_and_normalised() {
    let legacy = assert_fs::TempDir::new().unwrap();
    legacy.child("invoices.json").write_str(LEGACY_INVOICES).unwrap();
    legacy.child("fxrates.json").write_str(LEGACY_RATES).unwrap();
    let home = assert_fs::TempDir::new().unwrap();
    let data = home.child("data");

    let store = JsonStore::new(
        StorePaths::new(data.path()).with_legacy_dir(Some(legacy.path().to_path_buf())),
        None,
    );
    let (manager, metadata) =
        BookManager::open(Box::new(store), CurrencyCode::default(), true).unwrap();

    assert!(!metadata.seeded, "legacy data must not be mixed with samples");
    assert!(metadata
        .migrations
        .iter()
        .any(|note| note.contains("set invoice type to purchase on 1")));
    let book = manager.book();
    assert_eq!(book.invoices.len(), 2);
    assert_eq!(book.invoices[0].invoice_type, InvoiceType::Purchase);
    assert_eq!(book.invoices[0].subtotal, 500.0);
    assert_eq!(book.invoices[1].invoice_type, InvoiceType::Sale);
    assert_eq!(book.fx_rates[0].usd, 28.6);

    data.child("invoices.json")
        .assert(predicates::str::contains("\"invoice_type\": \"purchase\""));
    legacy
        .child("invoices.json")
        .assert(predicates::str::contains("\"amount\""));
}

#[test]
fn next_id_continues_after_the_largest_stored_id() {
    let legacy = assert_fs::TempDir::new().unwrap();
    legacy.child("invoices.json").write_str(LEGACY_INVOICES).unwrap();
    let home = assert_fs::TempDir::new().unwrap();
    let store = JsonStore::new(
        StorePaths::new(home.child("data").path())
            .with_legacy_dir(Some(legacy.path().to_path_buf())),
        None,
    );
    let (mut manager, _) =
        BookManager::open(Box::new(store), CurrencyCode::default(), false).unwrap();
    let added = manager
        .add_invoice(draft(date(2024, 2, 1), "New", 10.0, "TRY"))
        .unwrap();
    assert_eq!(added.id, 5);
}

#[test]
fn backups_can_be_listed_and_restored() {
    let store = isolated_store();
    let (mut manager, _) =
        BookManager::open(Box::new(store.clone()), CurrencyCode::default(), false).unwrap();
    let period = YearMonth::new(2024, 3).unwrap();
    manager.add_fx_rate(FxRateDraft::new(period, 31.0, 34.0)).unwrap();
    manager.add_fx_rate(FxRateDraft::new(period, 99.0, 99.0)).unwrap();

    let backups = manager.list_backups(RecordFile::FxRates).unwrap();
    assert!(!backups.is_empty());
    assert!(backups.len() <= store.retention());
    let newest = &backups[0];
    assert!(newest.created_at.is_some());

    let name = newest.name.clone();
    manager.restore_backup(RecordFile::FxRates, &name).unwrap();
    let restored = manager.rate_for_period(period).unwrap();
    assert_eq!(restored.usd, 31.0);

    let err = manager.restore_backup(RecordFile::FxRates, "../fxrates.json");
    assert!(err.is_err());
}

#[test]
fn corrupt_file_is_reported_not_overwritten() {
    let store = isolated_store();
    store.load().unwrap();
    let path = store.file_path(RecordFile::Invoices);
    fs::write(&path, "{ not json").unwrap();

    assert!(BookManager::open(Box::new(store), CurrencyCode::default(), true).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
}
