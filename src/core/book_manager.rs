use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::core::services::{
    ConversionService, DashboardData, DashboardService, FxRateService, InvoiceConversion,
    InvoiceService, ServiceResult,
};
use crate::currency::CurrencyCode;
use crate::domain::{
    Book, DashboardFilter, FxRate, FxRateDraft, Invoice, InvoiceDraft, InvoiceFilter,
    InvoiceType, RecordId, YearMonth,
};
use crate::storage::{BackupInfo, LoadReport, RecordFile, RecordStore};

const SAMPLE_USD_RATE: f64 = 30.5;
const SAMPLE_EUR_RATE: f64 = 33.2;

/// Metadata describing the outcome of a load operation.
#[derive(Debug, Clone, Default)]
pub struct LoadMetadata {
    pub warnings: Vec<String>,
    pub migrations: Vec<String>,
    pub seeded: bool,
    pub data_dir: PathBuf,
}

/// Facade that owns the in-memory book and writes every change through the store.
pub struct BookManager {
    book: Book,
    store: Box<dyn RecordStore>,
    home_currency: CurrencyCode,
}

impl BookManager {
    pub fn new(store: Box<dyn RecordStore>, home_currency: CurrencyCode) -> Self {
        Self {
            book: Book::default(),
            store,
            home_currency,
        }
    }

    /// Loads both collections and optionally seeds sample records into an empty store.
    pub fn open(
        store: Box<dyn RecordStore>,
        home_currency: CurrencyCode,
        seed_sample_data: bool,
    ) -> ServiceResult<(Self, LoadMetadata)> {
        let mut manager = Self::new(store, home_currency);
        let mut metadata = manager.load()?;
        if seed_sample_data {
            metadata.seeded = manager.seed_sample_data_if_empty(Local::now().date_naive())?;
        }
        Ok((manager, metadata))
    }

    pub fn load(&mut self) -> ServiceResult<LoadMetadata> {
        let report = self.store.load().map_err(|err| {
            warn!(error = %err, "unable to open record store");
            err
        })?;
        Ok(self.apply_load(report))
    }

    fn apply_load(&mut self, report: LoadReport) -> LoadMetadata {
        let LoadReport {
            book,
            warnings,
            migrations,
        } = report;
        for warning in &warnings {
            warn!(%warning, "record store warning");
        }
        self.book = book;
        LoadMetadata {
            warnings,
            migrations,
            seeded: false,
            data_dir: self.store.data_dir(),
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn home_currency(&self) -> &CurrencyCode {
        &self.home_currency
    }

    pub fn set_home_currency(&mut self, code: CurrencyCode) {
        self.home_currency = code;
    }

    pub fn data_dir(&self) -> PathBuf {
        self.store.data_dir()
    }

    pub fn invoices(&self, filter: &InvoiceFilter) -> Vec<&Invoice> {
        InvoiceService::list(&self.book, filter)
    }

    pub fn invoice(&self, id: RecordId) -> ServiceResult<&Invoice> {
        InvoiceService::get(&self.book, id)
    }

    pub fn add_invoice(&mut self, draft: InvoiceDraft) -> ServiceResult<Invoice> {
        let invoice = self.commit_invoices(|book| InvoiceService::add(book, draft))?;
        info!(id = invoice.id, company = %invoice.company, "invoice added");
        Ok(invoice)
    }

    pub fn update_invoice(&mut self, id: RecordId, draft: InvoiceDraft) -> ServiceResult<Invoice> {
        let invoice = self.commit_invoices(|book| InvoiceService::update(book, id, draft))?;
        info!(id, "invoice updated");
        Ok(invoice)
    }

    pub fn delete_invoice(&mut self, id: RecordId) -> ServiceResult<RecordId> {
        self.commit_invoices(|book| InvoiceService::remove(book, id))?;
        info!(id, "invoice deleted");
        Ok(id)
    }

    pub fn fx_rates(&self, year: Option<i32>, month: Option<u32>) -> Vec<&FxRate> {
        FxRateService::list(&self.book, year, month)
    }

    pub fn rate_for_period(&self, period: YearMonth) -> Option<&FxRate> {
        FxRateService::rate_for_period(&self.book, period)
    }

    /// Stores the rate for its period, replacing an existing one in place.
    pub fn add_fx_rate(&mut self, draft: FxRateDraft) -> ServiceResult<FxRate> {
        let rate = self.commit_fx_rates(|book| FxRateService::upsert(book, draft))?;
        info!(id = rate.id, year = rate.year, month = rate.month, "FX rate saved");
        Ok(rate)
    }

    pub fn update_fx_rate(&mut self, id: RecordId, draft: FxRateDraft) -> ServiceResult<FxRate> {
        let rate = self.commit_fx_rates(|book| FxRateService::update(book, id, draft))?;
        info!(id, "FX rate updated");
        Ok(rate)
    }

    pub fn dashboard(&self, filter: &DashboardFilter) -> DashboardData {
        DashboardService::build(&self.book, filter, &self.home_currency)
    }

    pub fn convert_invoice(&self, id: RecordId) -> ServiceResult<InvoiceConversion> {
        let invoice = self.invoice(id)?;
        ConversionService::convert(&self.book, invoice, &self.home_currency)
    }

    /// Computes the home-currency equivalent from the rate table and stores it.
    pub fn attach_home_equivalent(&mut self, id: RecordId) -> ServiceResult<InvoiceConversion> {
        let home = self.home_currency.clone();
        let conversion = self.commit_invoices(|book| ConversionService::attach(book, id, &home))?;
        info!(id, total = conversion.equivalent.total, "home equivalent stored");
        Ok(conversion)
    }

    /// Seeds one purchase invoice and one FX rate for `today` when nothing exists yet.
    pub fn seed_sample_data_if_empty(&mut self, today: NaiveDate) -> ServiceResult<bool> {
        if !self.book.is_empty() || self.store.legacy_data_present() {
            return Ok(false);
        }
        let draft = InvoiceDraft::new(
            today,
            "Sample Company Ltd.",
            "SAMPLE-001",
            1000.0,
            18.0,
            CurrencyCode::default(),
        )
        .with_type(InvoiceType::Purchase)
        .with_description("Sample invoice");
        self.add_invoice(draft)?;
        self.add_fx_rate(FxRateDraft::new(
            YearMonth::of(today),
            SAMPLE_USD_RATE,
            SAMPLE_EUR_RATE,
        ))?;
        info!("seeded sample data into empty store");
        Ok(true)
    }

    pub fn list_backups(&self, file: RecordFile) -> ServiceResult<Vec<BackupInfo>> {
        Ok(self.store.list_backups(file)?)
    }

    /// Restores a backup over the live file and reloads both collections.
    pub fn restore_backup(&mut self, file: RecordFile, name: &str) -> ServiceResult<LoadMetadata> {
        self.store.restore_backup(file, name)?;
        self.load()
    }

    fn commit_invoices<T, F>(&mut self, change: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut Book) -> ServiceResult<T>,
    {
        let snapshot = self.book.invoices.clone();
        let value = change(&mut self.book)?;
        if let Err(err) = self.store.save_invoices(&self.book.invoices) {
            warn!(error = %err, "saving invoices failed; in-memory change rolled back");
            self.book.invoices = snapshot;
            return Err(err.into());
        }
        Ok(value)
    }

    fn commit_fx_rates<T, F>(&mut self, change: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut Book) -> ServiceResult<T>,
    {
        let snapshot = self.book.fx_rates.clone();
        let value = change(&mut self.book)?;
        if let Err(err) = self.store.save_fx_rates(&self.book.fx_rates) {
            warn!(error = %err, "saving FX rates failed; in-memory change rolled back");
            self.book.fx_rates = snapshot;
            return Err(err.into());
        }
        Ok(value)
    }
}
