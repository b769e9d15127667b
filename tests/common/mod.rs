#![allow(dead_code)]

use std::sync::Mutex;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tax_tracker::{
    config::ConfigManager,
    core::BookManager,
    currency::CurrencyCode,
    domain::InvoiceDraft,
    storage::{JsonStore, StorePaths},
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

fn temp_base() -> std::path::PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Store rooted in a fresh directory, with no legacy folder to migrate from.
pub fn isolated_store() -> JsonStore {
    let base = temp_base();
    let paths = StorePaths::new(base.join("data")).with_legacy_dir(Some(base.join("legacy")));
    JsonStore::new(paths, Some(3))
}

/// Creates isolated managers backed by unique directories for each test.
pub fn setup_test_env() -> (BookManager, ConfigManager) {
    let base = temp_base();
    let paths = StorePaths::new(base.join("data")).with_legacy_dir(Some(base.join("legacy")));
    let store = JsonStore::new(paths, Some(3));
    let (manager, _) = BookManager::open(Box::new(store), CurrencyCode::default(), false)
        .expect("open book manager");
    let config_manager =
        ConfigManager::with_base_dir(base).expect("create config manager for temp dir");
    (manager, config_manager)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn draft(on: NaiveDate, company: &str, subtotal: f64, currency: &str) -> InvoiceDraft {
    InvoiceDraft::new(
        on,
        company,
        format!("{}-{}", company.to_uppercase(), on.format("%m%d")),
        subtotal,
        18.0,
        CurrencyCode::new(currency),
    )
}
