//! Persistence layer for suncap
//!
//! Provides:
//! - Sun-event cache (one record, overwritten daily, JSON on disk)
//! - Capture catalog (per-date frame directories)

mod cache;
mod catalog;
mod traits;

pub use cache::*;
pub use catalog::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
