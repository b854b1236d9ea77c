//! Frame acquisition

use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use suncap_api::CaptureRecord;
use suncap_host_api::{CameraSource, HostError, HostResult};
use suncap_store::CaptureCatalog;
use suncap_util::{Clock, Result, SuncapError};
use tracing::{debug, info, warn};

/// Fixed-delay retry, no backoff growth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Fetches one frame and files it under the capture catalog
pub struct CaptureAgent {
    camera: Arc<dyn CameraSource>,
    catalog: CaptureCatalog,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl CaptureAgent {
    pub fn new(camera: Arc<dyn CameraSource>, catalog: CaptureCatalog, clock: Arc<dyn Clock>) -> Self {
        Self {
            camera,
            catalog,
            clock,
            policy: RetryPolicy::default(),
        }
    }

    /// Acquire a frame from `url` and persist it.
    ///
    /// The file is named after the instant taken before the first attempt,
    /// at second resolution in `tz`. Two captures in the same second share
    /// a name and the later one wins.
    pub async fn capture(&self, url: &str, tz: Tz) -> Result<CaptureRecord> {
        let local = self.clock.now().with_timezone(&tz);
        let bytes = self.fetch_with_retry(url).await?;

        let date = local.date_naive();
        let time = local.time();
        let path = self.catalog.frame_path(date, time);

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SuncapError::storage(format!("{}: {}", dir.display(), e)))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| SuncapError::storage(format!("{}: {}", path.display(), e)))?;

        let record = CaptureRecord {
            filename: CaptureCatalog::frame_filename(time),
            time: CaptureCatalog::time_label(time),
            byte_size: bytes.len() as u64,
            date,
            file_path: path,
        };

        info!(file = %record.filename, date = %date, bytes = record.byte_size, "Frame captured");
        Ok(record)
    }

    /// One attempt, nothing written; returns the frame size
    pub async fn probe(&self, url: &str) -> Result<u64> {
        let bytes = self
            .attempt(url)
            .await
            .map_err(|e| SuncapError::acquisition(1, e.to_string()))?;
        Ok(bytes.len() as u64)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(url).await {
                Ok(bytes) => {
                    if attempt > 1 {
                        debug!(attempt, "Frame fetch succeeded after retry");
                    }
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "Frame fetch failed"
                    );
                    last_error = e.to_string();

                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(SuncapError::acquisition(self.policy.max_attempts, last_error))
    }

    async fn attempt(&self, url: &str) -> HostResult<Vec<u8>> {
        tokio::time::timeout(self.policy.attempt_timeout, self.camera.fetch(url))
            .await
            .map_err(|_| HostError::Timeout)?
    }
}
