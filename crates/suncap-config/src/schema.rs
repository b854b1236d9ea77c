//! Raw configuration schema (as parsed from TOML)
//!
//! Every section and field is optional; missing values take the defaults
//! below. Values are checked by [`crate::validate_config`] before use.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::CURRENT_CONFIG_VERSION;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub camera: RawCamera,

    #[serde(default)]
    pub capture: RawCapture,

    #[serde(default)]
    pub location: RawLocation,

    #[serde(default)]
    pub service: RawServiceConfig,

    #[serde(default)]
    pub artifact: RawArtifact,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION,
            camera: RawCamera::default(),
            capture: RawCapture::default(),
            location: RawLocation::default(),
            service: RawServiceConfig::default(),
            artifact: RawArtifact::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawCamera {
    /// Endpoint returning one JPEG per GET
    pub url: String,
}

impl Default for RawCamera {
    fn default() -> Self {
        Self {
            url: "http://192.168.1.72/capture".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawCapture {
    /// "sunrise" or "sunset"
    pub event_type: String,
    pub interval_seconds: u64,
    /// Minutes before and after the event
    pub offset_minutes: u64,
    pub enabled: bool,
}

impl Default for RawCapture {
    fn default() -> Self {
        Self {
            event_type: "sunrise".into(),
            interval_seconds: 15,
            offset_minutes: 30,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name
    pub timezone: String,
    pub name: Option<String>,
}

impl Default for RawLocation {
    fn default() -> Self {
        Self {
            latitude: 39.4699,
            longitude: -0.3763,
            timezone: "Europe/Madrid".into(),
            name: Some("Valencia, Spain".into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawServiceConfig {
    /// Data directory for captures, artifacts and the sun-event cache.
    /// Read once at daemon start.
    pub data_dir: Option<PathBuf>,

    /// Daily sun-data refresh time (HH:MM, location timezone)
    pub refresh_at: String,

    /// Read once at daemon start; a change takes effect after a restart
    pub sun_api_url: String,

    /// Read once at daemon start, like `sun_api_url`
    pub sun_api_timeout_seconds: u64,
}

impl Default for RawServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            refresh_at: "00:05".into(),
            sun_api_url: "https://api.sunrise-sunset.org/json".into(),
            sun_api_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawArtifact {
    /// Builder argv; `<date> <event>` are appended. The manifest builder
    /// is used when absent. Read once at daemon start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,

    /// Upper bound on one build; a build still running is killed.
    /// Taken from the config in effect when the session started.
    pub timeout_seconds: u64,
}

impl Default for RawArtifact {
    fn default() -> Self {
        Self {
            command: None,
            timeout_seconds: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial_sections() {
        let toml_str = r#"
            config_version = 1

            [capture]
            event_type = "sunset"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.capture.event_type, "sunset");
        assert_eq!(config.capture.interval_seconds, 15);
        assert_eq!(config.location.timezone, "Europe/Madrid");
        assert!(config.artifact.command.is_none());
        assert_eq!(config.artifact.timeout_seconds, 600);
    }

    #[test]
    fn parse_artifact_command() {
        let toml_str = r#"
            config_version = 1

            [artifact]
            command = ["/usr/local/bin/make-gif", "--fps", "10"]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.artifact.command.map(|argv| argv.len()), Some(3));
    }

    #[test]
    fn defaults_serialize_to_toml() {
        let text = toml::to_string_pretty(&RawConfig::default()).unwrap();
        let back: RawConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(back.service.refresh_at, "00:05");
    }
}
