//! Sun-event cache implementations

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use suncap_api::SunEventRecord;
use tracing::debug;

use crate::{StoreResult, SunEventCache};

/// JSON file holding one [`SunEventRecord`], readable across restarts
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SunEventCache for JsonFileCache {
    fn load(&self) -> StoreResult<Option<SunEventRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = std::fs::read_to_string(&self.path)?;
        let record: SunEventRecord = serde_json::from_str(&data)?;
        debug!(date = %record.date, path = %self.path.display(), "Sun cache loaded");
        Ok(Some(record))
    }

    fn save(&self, record: &SunEventRecord) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        // Write-then-rename so a crash never leaves a half-written slot
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(date = %record.date, path = %self.path.display(), "Sun cache saved");
        Ok(())
    }
}

/// In-memory cache (for testing)
#[derive(Debug, Default)]
pub struct MemoryCache {
    slot: Mutex<Option<SunEventRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: SunEventRecord) -> Self {
        Self {
            slot: Mutex::new(Some(record)),
        }
    }
}

impl SunEventCache for MemoryCache {
    fn load(&self) -> StoreResult<Option<SunEventRecord>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, record: &SunEventRecord) -> StoreResult<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn record(day: u32) -> SunEventRecord {
        SunEventRecord {
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            sunrise: Utc.with_ymd_and_hms(2025, 6, day, 4, 35, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2025, 6, day, 19, 30, 0).unwrap(),
            solar_noon: Utc.with_ymd_and_hms(2025, 6, day, 12, 2, 0).unwrap(),
            day_length: 53_700,
            fetched_at: Utc.with_ymd_and_hms(2025, 6, day, 0, 5, 0).unwrap(),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("sun-times.json"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("config").join("sun-times.json"));

        cache.save(&record(21)).unwrap();
        assert_eq!(cache.load().unwrap(), Some(record(21)));
    }

    #[test]
    fn save_overwrites_single_slot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("sun-times.json"));

        cache.save(&record(21)).unwrap();
        cache.save(&record(22)).unwrap();

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.date, NaiveDate::from_ymd_opt(2025, 6, 22).unwrap());
        assert!(!dir.path().join("sun-times.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sun-times.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cache = JsonFileCache::new(&path);
        assert!(matches!(cache.load(), Err(crate::StoreError::Serialization(_))));
    }

    #[test]
    fn memory_cache_replaces() {
        let cache = MemoryCache::with_record(record(21));
        cache.save(&record(22)).unwrap();
        assert_eq!(cache.load().unwrap(), Some(record(22)));
    }
}
