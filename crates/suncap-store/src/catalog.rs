//! On-disk catalog of captured frames
//!
//! Frames live at `<data>/captures/YYYY-MM-DD/HH-MM-SS.jpg`, with both the
//! directory date and the file time in the location timezone.

use chrono::{NaiveDate, NaiveTime};
use std::path::PathBuf;
use suncap_api::CaptureRecord;
use suncap_util::DataLayout;
use tracing::warn;

use crate::StoreResult;

const FRAME_EXTENSION: &str = "jpg";

#[derive(Debug, Clone)]
pub struct CaptureCatalog {
    layout: DataLayout,
}

impl CaptureCatalog {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// `HH-MM-SS`, the stem every frame file uses
    pub fn time_label(time: NaiveTime) -> String {
        time.format("%H-%M-%S").to_string()
    }

    pub fn frame_filename(time: NaiveTime) -> String {
        format!("{}.{}", Self::time_label(time), FRAME_EXTENSION)
    }

    pub fn frame_path(&self, date: NaiveDate, time: NaiveTime) -> PathBuf {
        self.layout
            .capture_day_dir(date)
            .join(Self::frame_filename(time))
    }

    /// Frames captured on `date`, in capture order.
    ///
    /// A date without a directory has no frames.
    pub fn list_captures(&self, date: NaiveDate) -> StoreResult<Vec<CaptureRecord>> {
        let dir = self.layout.capture_day_dir(date);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FRAME_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if NaiveTime::parse_from_str(stem, "%H-%M-%S").is_err() {
                warn!(path = %path.display(), "Skipping unrecognised file in capture directory");
                continue;
            }

            records.push(CaptureRecord {
                filename: entry.file_name().to_string_lossy().into_owned(),
                time: stem.to_string(),
                byte_size: entry.metadata()?.len(),
                date,
                file_path: path,
            });
        }

        // HH-MM-SS sorts lexically in time order
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(records)
    }

    /// Dates that have a capture directory, newest first
    pub fn capture_dates(&self) -> StoreResult<Vec<NaiveDate>> {
        let dir = self.layout.captures_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut dates: Vec<NaiveDate> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                NaiveDate::parse_from_str(&entry.file_name().to_string_lossy(), "%Y-%m-%d").ok()
            })
            .collect();

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }
}
