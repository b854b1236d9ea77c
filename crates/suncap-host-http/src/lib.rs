//! Network and process host seams for suncap
//!
//! Provides:
//! - HTTP still-frame camera
//! - sunrise-sunset.org client
//! - Artifact builders (frame manifest, external command)

mod artifact;
mod camera;
mod sun_api;

pub use artifact::*;
pub use camera::*;
pub use sun_api::*;
