//! Error types for suncap

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for suncap operations
#[derive(Debug, Error)]
pub enum SuncapError {
    #[error("Failed to fetch image after {attempts} attempts: {reason}")]
    AcquisitionFailed { attempts: u32, reason: String },

    #[error("Sun event data unavailable for {date}: {reason}")]
    SunDataUnavailable { date: NaiveDate, reason: String },

    #[error("Artifact build failed: {0}")]
    ArtifactBuildFailed(String),

    #[error("Already capturing")]
    AlreadyCapturing,

    #[error("Not currently capturing")]
    NotCapturing,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler is not running")]
    SchedulerStopped,
}

impl SuncapError {
    pub fn acquisition(attempts: u32, reason: impl Into<String>) -> Self {
        Self::AcquisitionFailed {
            attempts,
            reason: reason.into(),
        }
    }

    pub fn sun_data(date: NaiveDate, reason: impl Into<String>) -> Self {
        Self::SunDataUnavailable {
            date,
            reason: reason.into(),
        }
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::ArtifactBuildFailed(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Manual-control misuse, reported to the caller as a rejection
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::AlreadyCapturing | Self::NotCapturing)
    }
}

pub type Result<T> = std::result::Result<T, SuncapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = SuncapError::acquisition(3, "connection refused");
        assert_eq!(
            err.to_string(),
            "Failed to fetch image after 3 attempts: connection refused"
        );

        let date = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        let err = SuncapError::sun_data(date, "status INVALID_REQUEST");
        assert_eq!(
            err.to_string(),
            "Sun event data unavailable for 2025-06-21: status INVALID_REQUEST"
        );
    }

    #[test]
    fn rejections() {
        assert!(SuncapError::AlreadyCapturing.is_rejection());
        assert!(SuncapError::NotCapturing.is_rejection());
        assert!(!SuncapError::artifact("boom").is_rejection());
    }
}
