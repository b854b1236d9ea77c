//! Validated settings structures

use crate::schema::RawConfig;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;
use suncap_api::{EventType, Location};
use suncap_util::WallClock;

/// Validated settings ready for use by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub camera: CameraSettings,
    pub capture: CaptureSettings,
    pub location: Location,
    pub service: ServiceSettings,
    pub artifact: ArtifactSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub event_type: EventType,
    pub interval: Duration,
    /// Distance from the event to either end of the window
    pub offset: Duration,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// None means use the default data directory
    pub data_dir: Option<PathBuf>,
    pub refresh_at: WallClock,
    pub sun_api_url: String,
    pub sun_api_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSettings {
    /// External builder argv; None selects the manifest builder
    pub command: Option<Vec<String>>,
    pub timeout: Duration,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            camera: CameraSettings {
                url: raw.camera.url,
            },
            capture: CaptureSettings {
                event_type: raw
                    .capture
                    .event_type
                    .parse()
                    .unwrap_or(EventType::Sunrise),
                interval: Duration::from_secs(raw.capture.interval_seconds.max(1)),
                offset: Duration::from_secs(raw.capture.offset_minutes * 60),
                enabled: raw.capture.enabled,
            },
            location: Location {
                latitude: raw.location.latitude,
                longitude: raw.location.longitude,
                timezone: raw.location.timezone.parse().unwrap_or(Tz::UTC),
                name: raw.location.name,
            },
            service: ServiceSettings {
                data_dir: raw.service.data_dir,
                refresh_at: raw
                    .service
                    .refresh_at
                    .parse()
                    .unwrap_or(WallClock { hour: 0, minute: 5 }),
                sun_api_url: raw.service.sun_api_url,
                sun_api_timeout: Duration::from_secs(raw.service.sun_api_timeout_seconds),
            },
            artifact: ArtifactSettings {
                command: raw.artifact.command,
                timeout: Duration::from_secs(raw.artifact.timeout_seconds),
            },
        }
    }

    /// The timezone calendar dates are computed in
    pub fn timezone(&self) -> Tz {
        self.location.timezone
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_installation() {
        let settings = Settings::default();
        assert_eq!(settings.camera.url, "http://192.168.1.72/capture");
        assert_eq!(settings.capture.event_type, EventType::Sunrise);
        assert_eq!(settings.capture.interval, Duration::from_secs(15));
        assert_eq!(settings.capture.offset, Duration::from_secs(30 * 60));
        assert!(settings.capture.enabled);
        assert_eq!(settings.timezone(), chrono_tz::Europe::Madrid);
        assert_eq!(settings.service.refresh_at, WallClock { hour: 0, minute: 5 });
        assert!(settings.artifact.command.is_none());
        assert_eq!(settings.artifact.timeout, Duration::from_secs(600));
    }
}
