//! Host seam trait interfaces for suncap
//!
//! This crate defines the interface between the scheduler core and the
//! outside world (camera, sun-event service, artifact builder). It contains
//! no network or process code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
