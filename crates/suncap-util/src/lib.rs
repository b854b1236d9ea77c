//! Shared utilities for suncap
//!
//! This crate provides:
//! - Session IDs
//! - Time utilities (clock abstraction, mock time, daily wall-clock triggers)
//! - The error taxonomy shared by the scheduler and its collaborators
//! - Default paths for config and data directories

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
