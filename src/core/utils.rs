use dirs::home_dir;
use std::{env, path::PathBuf};

/// Overrides the application directory when set.
pub const HOME_ENV: &str = "TAX_TRACKER_HOME";

const DEFAULT_DIR_NAME: &str = ".tax_tracker";

/// Returns the application directory, defaulting to `~/.tax_tracker`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}
