//! Default paths for suncap components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/suncap/config.toml` or `~/.config/suncap/config.toml`
//! - Data: `$XDG_DATA_HOME/suncap` or `~/.local/share/suncap`
//!
//! Inside the data directory, [`DataLayout`] fixes where the sun-event cache,
//! captured frames and built artifacts live.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Environment variable for overriding the config file
pub const SUNCAP_CONFIG_ENV: &str = "SUNCAP_CONFIG";

/// Environment variable for overriding the data directory
pub const SUNCAP_DATA_DIR_ENV: &str = "SUNCAP_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "suncap";

const CONFIG_FILENAME: &str = "config.toml";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$SUNCAP_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/suncap/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/suncap/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(SUNCAP_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$SUNCAP_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/suncap` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/suncap` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(SUNCAP_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking SUNCAP_DATA_DIR env var.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Fixed layout of the data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Single-slot sun-event cache file
    pub fn sun_cache_path(&self) -> PathBuf {
        self.root.join("config").join("sun-times.json")
    }

    pub fn captures_dir(&self) -> PathBuf {
        self.root.join("captures")
    }

    /// One directory per calendar date
    pub fn capture_day_dir(&self, date: NaiveDate) -> PathBuf {
        self.captures_dir().join(date.format("%Y-%m-%d").to_string())
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    /// Create every directory of the layout
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.root.join("config"),
            self.captures_dir(),
            self.artifacts_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_contains_suncap() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("suncap"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
    }

    #[test]
    fn layout_paths() {
        let layout = DataLayout::new("/srv/suncap");
        let date = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();

        assert_eq!(
            layout.sun_cache_path(),
            PathBuf::from("/srv/suncap/config/sun-times.json")
        );
        assert_eq!(
            layout.capture_day_dir(date),
            PathBuf::from("/srv/suncap/captures/2025-06-21")
        );
        assert_eq!(layout.artifacts_dir(), PathBuf::from("/srv/suncap/artifacts"));
    }
}
