//! Scheduling core for suncap
//!
//! This crate is the heart of suncapd, containing:
//! - Sun-event lookup with a single-slot cache fallback
//! - Frame acquisition with fixed-delay retry
//! - Capture window planning (start now, schedule, defer)
//! - The session state machine (Idle -> Waiting -> Capturing -> Generating -> Idle),
//!   run as a single actor task that owns every timer

mod capture;
mod controller;
mod planner;
mod sun;

pub use capture::*;
pub use controller::*;
pub use planner::*;
pub use sun::*;
