pub mod json_backend;

use std::{fmt, path::PathBuf};

use chrono::NaiveDateTime;

use crate::{
    domain::{Book, FxRate, Invoice, TOTAL_TOLERANCE},
    errors::StoreError,
};

pub use json_backend::{JsonStore, StorePaths};

pub type Result<T> = std::result::Result<T, StoreError>;

/// The two JSON files kept in the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordFile {
    Invoices,
    FxRates,
}

impl RecordFile {
    pub const ALL: [RecordFile; 2] = [RecordFile::Invoices, RecordFile::FxRates];

    pub fn stem(&self) -> &'static str {
        match self {
            RecordFile::Invoices => "invoices",
            RecordFile::FxRates => "fxrates",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.stem())
    }
}

impl fmt::Display for RecordFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

impl std::str::FromStr for RecordFile {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "invoices" | "invoice" => Ok(RecordFile::Invoices),
            "fxrates" | "fx" | "fx_rates" | "rates" => Ok(RecordFile::FxRates),
            other => Err(format!("unknown record file `{}` (use invoices or fx)", other)),
        }
    }
}

/// A timestamped copy of a record file taken before it was rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub file: RecordFile,
    pub name: String,
    pub path: PathBuf,
    pub created_at: Option<NaiveDateTime>,
}

/// Outcome of opening the store.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub book: Book,
    /// Data problems that did not prevent loading.
    pub warnings: Vec<String>,
    /// Changes applied to the files while opening them.
    pub migrations: Vec<String>,
}

/// Persistence backend for the invoice and FX rate collections.
pub trait RecordStore {
    /// Opens both collections, creating and normalising the files as needed.
    fn load(&self) -> Result<LoadReport>;
    fn save_invoices(&self, invoices: &[Invoice]) -> Result<()>;
    fn save_fx_rates(&self, rates: &[FxRate]) -> Result<()>;
    /// Newest first.
    fn list_backups(&self, file: RecordFile) -> Result<Vec<BackupInfo>>;
    fn restore_backup(&self, file: RecordFile, name: &str) -> Result<()>;
    /// Whether the prior storage location still holds record files.
    fn legacy_data_present(&self) -> bool;
    fn data_dir(&self) -> PathBuf;
}

/// Consistency checks reported after a load.
pub fn book_warnings(book: &Book) -> Vec<String> {
    let mut warnings = Vec::new();

    for invoice in &book.invoices {
        if !invoice.has_consistent_total() {
            warnings.push(format!(
                "invoice {} total {:.2} differs from subtotal + VAT {:.2} by more than {}",
                invoice.id,
                invoice.total(),
                invoice.computed_total(),
                TOTAL_TOLERANCE
            ));
        }
    }

    let mut seen_invoice_ids = std::collections::HashSet::new();
    for invoice in &book.invoices {
        if !seen_invoice_ids.insert(invoice.id) {
            warnings.push(format!("invoice id {} appears more than once", invoice.id));
        }
    }

    let mut seen_periods = std::collections::HashMap::new();
    for rate in &book.fx_rates {
        match rate.period() {
            Some(period) => {
                if let Some(first) = seen_periods.insert(period, rate.id) {
                    warnings.push(format!(
                        "FX rates {} and {} both cover {}",
                        first, rate.id, period
                    ));
                }
            }
            None => warnings.push(format!(
                "FX rate {} has invalid month {}",
                rate.id, rate.month
            )),
        }
    }
    warnings
}
