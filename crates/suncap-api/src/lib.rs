//! Shared types for suncap
//!
//! This crate defines the data model exchanged between the scheduler, its
//! host adapters and whatever surface drives it:
//! - Sun events, capture windows and capture records
//! - Scheduler state snapshots
//! - Manual control options
//! - Scheduler events (scheduler -> observers)

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;
