use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    core::utils,
    currency::{CurrencyCode, LocaleConfig},
    domain::QUOTED_CURRENCIES,
    storage::StorePaths,
    utils::fs::{ensure_dir, sanitize_note, write_atomic},
};

const BACKUP_EXTENSION: &str = "json";
const BACKUP_PREFIX: &str = "config_";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";
const DATA_DIR: &str = "data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// User preferences persisted as `config/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: String,
    pub home_currency: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_data_dir: Option<PathBuf>,
    pub backup_retention: usize,
    pub seed_sample_data: bool,
    pub default_vat_rate: f64,
    pub ui_color_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            home_currency: CurrencyCode::default(),
            data_dir: None,
            legacy_data_dir: None,
            backup_retention: 5,
            seed_sample_data: true,
            default_vat_rate: 18.0,
            ui_color_enabled: true,
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 8] = [
        "locale",
        "home_currency",
        "data_dir",
        "legacy_data_dir",
        "backup_retention",
        "seed_sample_data",
        "default_vat_rate",
        "ui_color_enabled",
    ];

    pub fn locale_config(&self) -> LocaleConfig {
        LocaleConfig::from_tag(&self.locale)
    }

    /// Store locations, falling back to `default_data_dir` and the old desktop folder.
    pub fn store_paths(&self, default_data_dir: PathBuf) -> StorePaths {
        let legacy = self
            .legacy_data_dir
            .clone()
            .or_else(StorePaths::default_legacy_dir);
        StorePaths::new(self.data_dir.clone().unwrap_or(default_data_dir)).with_legacy_dir(legacy)
    }

    /// Key/value pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let path_or_default = |path: &Option<PathBuf>| {
            path.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default)".into())
        };
        vec![
            ("locale", self.locale.clone()),
            ("home_currency", self.home_currency.to_string()),
            ("data_dir", path_or_default(&self.data_dir)),
            ("legacy_data_dir", path_or_default(&self.legacy_data_dir)),
            ("backup_retention", self.backup_retention.to_string()),
            ("seed_sample_data", self.seed_sample_data.to_string()),
            ("default_vat_rate", self.default_vat_rate.to_string()),
            ("ui_color_enabled", self.ui_color_enabled.to_string()),
        ]
    }

    /// Updates one preference from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "locale" => {
                if value.is_empty() {
                    return Err(ConfigError::Invalid("locale cannot be empty".into()));
                }
                self.locale = value.to_string();
            }
            "home_currency" => {
                let code = CurrencyCode::new(value);
                if !QUOTED_CURRENCIES.iter().any(|quoted| code.is(quoted)) {
                    return Err(ConfigError::Invalid(format!(
                        "home_currency must be a currency the FX table prices ({}), got `{}`",
                        QUOTED_CURRENCIES.join(", "),
                        value
                    )));
                }
                self.home_currency = code;
            }
            "data_dir" => self.data_dir = optional_path(value),
            "legacy_data_dir" => self.legacy_data_dir = optional_path(value),
            "backup_retention" => {
                let retention = value.parse::<usize>().ok().filter(|n| *n > 0);
                self.backup_retention = retention.ok_or_else(|| {
                    ConfigError::Invalid("backup_retention must be a positive integer".into())
                })?;
            }
            "seed_sample_data" => self.seed_sample_data = parse_flag(key, value)?,
            "ui_color_enabled" => self.ui_color_enabled = parse_flag(key, value)?,
            "default_vat_rate" => {
                let rate = value
                    .replace(',', ".")
                    .parse::<f64>()
                    .ok()
                    .filter(|rate| (0.0..=100.0).contains(rate));
                self.default_vat_rate = rate.ok_or_else(|| {
                    ConfigError::Invalid("default_vat_rate must be between 0 and 100".into())
                })?;
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown setting `{}` (expected one of: {})",
                    other,
                    Self::KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    match value {
        "" | "default" | "none" => None,
        path => Some(PathBuf::from(path)),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "{} expects true or false (got `{}`)",
            key, value
        ))),
    }
}

/// Loads, saves, and snapshots the configuration file.
pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(utils::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        let config_root = base.join("config");
        let backups_dir = config_root.join("backups");
        ensure_dir(&backups_dir)?;
        Ok(Self {
            path: config_root.join("config.json"),
            backups_dir,
            base,
        })
    }

    pub fn load(&self) -> Result<Config> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            let config = serde_json::from_str(&data)?;
            debug!(path = %self.path.display(), "configuration loaded");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)?;
        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String> {
        ensure_dir(&self.backups_dir)?;
        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut name = format!("{}{}", BACKUP_PREFIX, timestamp);
        if let Some(label) = sanitize_note(note) {
            name.push('_');
            name.push_str(&label);
        }
        name.push_str(&format!(".{}", BACKUP_EXTENSION));
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.backups_dir.join(&name), &json)?;
        info!(backup = %name, "configuration backup written");
        Ok(name)
    }

    /// Reads a backup and makes it the active configuration.
    pub fn restore(&self, backup_name: &str) -> Result<Config> {
        let path = self.backups_dir.join(backup_name);
        if backup_name.contains(['/', '\\']) || !path.is_file() {
            return Err(ConfigError::Invalid(format!(
                "configuration backup `{}` not found",
                backup_name
            )));
        }
        let data = fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&data)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                if name.starts_with(BACKUP_PREFIX) {
                    entries.push(name.to_string());
                }
            }
        }
        entries.sort_by(|a, b| b.cmp(a));
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data directory used when the configuration does not name one.
    pub fn default_data_dir(&self) -> PathBuf {
        self.base.join(DATA_DIR)
    }
}
