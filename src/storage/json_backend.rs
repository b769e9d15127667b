use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    domain::{Book, FxRate, Invoice},
    errors::StoreError,
    utils::fs::{ensure_dir, write_atomic},
};

use super::{book_warnings, BackupInfo, LoadReport, RecordFile, RecordStore, Result};

const BACKUP_DIR: &str = "backups";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";
const BACKUP_TIMESTAMP_PARSE: &str = "%Y%m%d_%H%M%S";
const BACKUP_TIMESTAMP_PARSE_LEN: usize = 15;
const DEFAULT_RETENTION: usize = 5;
const EMPTY_COLLECTION: &str = "[]";

/// Where the store keeps its files and where earlier releases kept theirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub data_dir: PathBuf,
    pub legacy_dir: Option<PathBuf>,
}

impl StorePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            legacy_dir: None,
        }
    }

    pub fn with_legacy_dir(mut self, legacy_dir: Option<PathBuf>) -> Self {
        self.legacy_dir = legacy_dir;
        self
    }

    /// Data folder used by the desktop release, under the per-user
    /// application-data root (`~/.config` on Linux).
    pub fn default_legacy_dir() -> Option<PathBuf> {
        dirs::config_dir().map(legacy_dir_under)
    }
}

/// Flat-file store holding each collection as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonStore {
    paths: StorePaths,
    retention: usize,
}

impl JsonStore {
    pub fn new(paths: StorePaths, retention: Option<usize>) -> Self {
        Self {
            paths,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        }
    }

    pub fn file_path(&self, file: RecordFile) -> PathBuf {
        self.paths.data_dir.join(file.file_name())
    }

    fn backup_dir(&self, file: RecordFile) -> PathBuf {
        self.paths.data_dir.join(BACKUP_DIR).join(file.stem())
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Copies record files from the legacy folder when the data folder is new.
    fn migrate_legacy(&self, migrations: &mut Vec<String>) {
        if self.paths.data_dir.exists() {
            return;
        }
        let Some(legacy) = self.paths.legacy_dir.as_deref() else {
            return;
        };
        if !legacy.is_dir() {
            return;
        }
        if let Err(err) = ensure_dir(&self.paths.data_dir) {
            warn!(error = %err, dir = %self.paths.data_dir.display(), "unable to create data directory for legacy copy");
            return;
        }
        for file in RecordFile::ALL {
            let source = legacy.join(file.file_name());
            if !source.exists() {
                continue;
            }
            match fs::copy(&source, self.file_path(file)) {
                Ok(_) => {
                    info!(file = %file, from = %source.display(), "copied legacy record file");
                    migrations.push(format!(
                        "copied {} from {}",
                        file.file_name(),
                        legacy.display()
                    ));
                }
                Err(err) => {
                    warn!(error = %err, from = %source.display(), "legacy copy failed");
                }
            }
        }
    }

    fn ensure_file(&self, file: RecordFile, migrations: &mut Vec<String>) -> Result<()> {
        let path = self.file_path(file);
        if path.exists() {
            return Ok(());
        }
        write_atomic(&path, EMPTY_COLLECTION)?;
        debug!(path = %path.display(), "created empty record file");
        migrations.push(format!("created empty {}", file.file_name()));
        Ok(())
    }

    fn load_invoices(&self, migrations: &mut Vec<String>) -> Result<Vec<Invoice>> {
        let path = self.file_path(RecordFile::Invoices);
        let raw: Vec<Value> = read_json(&path)?;
        let untyped = raw.iter().filter(|entry| lacks_invoice_type(entry)).count();
        let invoices: Vec<Invoice> = serde_json::from_value(Value::Array(raw))?;
        if untyped > 0 {
            self.save_invoices(&invoices)?;
            info!(count = untyped, "defaulted missing invoice types to purchase");
            migrations.push(format!(
                "set invoice type to purchase on {} invoice(s)",
                untyped
            ));
        }
        Ok(invoices)
    }

    fn write_collection<T: Serialize>(&self, file: RecordFile, records: &[T]) -> Result<()> {
        let path = self.file_path(file);
        if path.exists() {
            self.backup_existing_file(file, &path)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        write_atomic(&path, &json).map_err(|err| {
            warn!(error = %err, path = %path.display(), "failed to write record file");
            StoreError::from(err)
        })?;
        debug!(file = %file, count = records.len(), "saved record file");
        Ok(())
    }

    fn backup_existing_file(&self, file: RecordFile, path: &Path) -> Result<()> {
        let dir = self.backup_dir(file);
        ensure_dir(&dir)?;
        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let backup_name = unused_backup_name(&dir, file, &timestamp);
        fs::copy(path, dir.join(&backup_name))?;
        self.prune_backups(file)
    }

    fn prune_backups(&self, file: RecordFile) -> Result<()> {
        let backups = self.list_backups(file)?;
        for entry in backups.iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                warn!(error = %err, backup = %entry.name, "unable to prune backup");
            }
        }
        Ok(())
    }
}

impl RecordStore for JsonStore {
    fn load(&self) -> Result<LoadReport> {
        let mut migrations = Vec::new();
        self.migrate_legacy(&mut migrations);
        ensure_dir(&self.paths.data_dir)?;
        for file in RecordFile::ALL {
            self.ensure_file(file, &mut migrations)?;
        }

        let invoices = self.load_invoices(&mut migrations).map_err(|err| {
            warn!(error = %err, "failed to load invoices");
            err
        })?;
        let fx_rates: Vec<FxRate> =
            read_json(&self.file_path(RecordFile::FxRates)).map_err(|err| {
                warn!(error = %err, "failed to load FX rates");
                err
            })?;

        let book = Book::new(invoices, fx_rates);
        let warnings = book_warnings(&book);
        info!(
            invoices = book.invoices.len(),
            fx_rates = book.fx_rates.len(),
            dir = %self.paths.data_dir.display(),
            "record store opened"
        );
        Ok(LoadReport {
            book,
            warnings,
            migrations,
        })
    }

    fn save_invoices(&self, invoices: &[Invoice]) -> Result<()> {
        self.write_collection(RecordFile::Invoices, invoices)
    }

    fn save_fx_rates(&self, rates: &[FxRate]) -> Result<()> {
        self.write_collection(RecordFile::FxRates, rates)
    }

    fn list_backups(&self, file: RecordFile) -> Result<Vec<BackupInfo>> {
        let dir = self.backup_dir(file);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", file.stem());
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !name.starts_with(&prefix) {
                continue;
            }
            entries.push(BackupInfo {
                file,
                name: name.to_string(),
                created_at: parse_backup_timestamp(&name[prefix.len()..]),
                path: path.clone(),
            });
        }
        entries.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(entries)
    }

    fn restore_backup(&self, file: RecordFile, name: &str) -> Result<()> {
        let backup = self.backup_dir(file).join(name);
        if name.contains(['/', '\\']) || !backup.is_file() {
            return Err(StoreError::Storage(format!("backup `{}` not found", name)));
        }
        let data = fs::read_to_string(&backup)?;
        match file {
            RecordFile::Invoices => serde_json::from_str::<Vec<Invoice>>(&data).map(drop)?,
            RecordFile::FxRates => serde_json::from_str::<Vec<FxRate>>(&data).map(drop)?,
        }
        let target = self.file_path(file);
        if target.exists() {
            self.backup_existing_file(file, &target)?;
        }
        write_atomic(&target, &data)?;
        info!(file = %file, backup = name, "restored record file from backup");
        Ok(())
    }

    fn legacy_data_present(&self) -> bool {
        self.paths.legacy_dir.as_deref().is_some_and(|dir| {
            RecordFile::ALL
                .iter()
                .any(|file| dir.join(file.file_name()).exists())
        })
    }

    fn data_dir(&self) -> PathBuf {
        self.paths.data_dir.clone()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(serde_json::from_str(EMPTY_COLLECTION)?);
    }
    Ok(serde_json::from_str(&data)?)
}

fn lacks_invoice_type(entry: &Value) -> bool {
    match entry.get("invoice_type") {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

fn legacy_dir_under(app_data: PathBuf) -> PathBuf {
    app_data.join("Electron").join("taxtracker-data")
}

/// Backup name for `timestamp`, numbered when that millisecond is taken.
fn unused_backup_name(dir: &Path, file: RecordFile, timestamp: &str) -> String {
    let mut name = format!("{}_{}.{}", file.stem(), timestamp, BACKUP_EXTENSION);
    let mut attempt = 1;
    while dir.join(&name).exists() {
        name = format!(
            "{}_{}_{:02}.{}",
            file.stem(),
            timestamp,
            attempt,
            BACKUP_EXTENSION
        );
        attempt += 1;
    }
    name
}

fn parse_backup_timestamp(suffix: &str) -> Option<NaiveDateTime> {
    let stamp = suffix.get(..BACKUP_TIMESTAMP_PARSE_LEN)?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_PARSE).ok()
}
