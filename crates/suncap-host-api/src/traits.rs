//! Host seam traits

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use suncap_api::{EventType, Location};
use thiserror::Error;

/// Errors from host seam operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Service rejected request: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Sun events for one date as reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub solar_noon: DateTime<Utc>,
    /// Seconds between sunrise and sunset
    pub day_length: u64,
}

/// Source of still frames
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Fetch one frame from `url`.
    ///
    /// Implementations make a single attempt; retry and timeout policy is
    /// the caller's.
    async fn fetch(&self, url: &str) -> HostResult<Vec<u8>>;
}

/// Remote sunrise/sunset lookup
#[async_trait]
pub trait SunEventService: Send + Sync {
    async fn fetch(&self, location: &Location, date: NaiveDate) -> HostResult<SunTimes>;
}

/// Turns a finished session's frames into an artifact
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Build the artifact for the frames of `date` and return its path
    async fn build(&self, date: NaiveDate, event_type: EventType) -> HostResult<PathBuf>;
}
