//! Configuration validation

use crate::schema::RawConfig;
use chrono_tz::Tz;
use suncap_api::EventType;
use suncap_util::WallClock;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Unknown event type '{0}' (expected \"sunrise\" or \"sunset\")")]
    UnknownEventType(String),

    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },
}

impl ValidationError {
    fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

/// Validate a raw configuration, collecting every error
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.camera.url.trim().is_empty() {
        errors.push(ValidationError::field("camera.url", "cannot be empty"));
    }

    if config.capture.event_type.parse::<EventType>().is_err() {
        errors.push(ValidationError::UnknownEventType(
            config.capture.event_type.clone(),
        ));
    }

    if config.capture.interval_seconds == 0 {
        errors.push(ValidationError::field(
            "capture.interval_seconds",
            "must be greater than 0",
        ));
    }

    let loc = &config.location;
    if !(-90.0..=90.0).contains(&loc.latitude) {
        errors.push(ValidationError::field(
            "location.latitude",
            format!("{} is outside [-90, 90]", loc.latitude),
        ));
    }
    if !(-180.0..=180.0).contains(&loc.longitude) {
        errors.push(ValidationError::field(
            "location.longitude",
            format!("{} is outside [-180, 180]", loc.longitude),
        ));
    }
    if loc.timezone.parse::<Tz>().is_err() {
        errors.push(ValidationError::UnknownTimezone(loc.timezone.clone()));
    }

    if let Err(message) = config.service.refresh_at.parse::<WallClock>() {
        errors.push(ValidationError::InvalidTimeFormat {
            value: config.service.refresh_at.clone(),
            message,
        });
    }

    if config.service.sun_api_url.trim().is_empty() {
        errors.push(ValidationError::field("service.sun_api_url", "cannot be empty"));
    }

    if config.service.sun_api_timeout_seconds == 0 {
        errors.push(ValidationError::field(
            "service.sun_api_timeout_seconds",
            "must be greater than 0",
        ));
    }

    if let Some(command) = &config.artifact.command
        && command.first().is_none_or(|program| program.trim().is_empty())
    {
        errors.push(ValidationError::field("artifact.command", "cannot be empty"));
    }

    if config.artifact.timeout_seconds == 0 {
        errors.push(ValidationError::field(
            "artifact.timeout_seconds",
            "must be greater than 0",
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&RawConfig::default()).is_empty());
    }

    #[test]
    fn collects_every_error() {
        let mut config = RawConfig::default();
        config.capture.interval_seconds = 0;
        config.capture.event_type = "noon".into();
        config.location.latitude = 91.0;
        config.location.timezone = "Mars/Olympus".into();
        config.service.refresh_at = "25:00".into();

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::UnknownEventType("noon".into())));
        assert!(errors.contains(&ValidationError::UnknownTimezone("Mars/Olympus".into())));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidField { field: "capture.interval_seconds", .. }
        )));
    }

    #[test]
    fn empty_artifact_command_rejected() {
        let mut config = RawConfig::default();
        config.artifact.command = Some(vec![]);

        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidField { field: "artifact.command", .. }
        )));
    }

    #[test]
    fn zero_artifact_timeout_rejected() {
        let mut config = RawConfig::default();
        config.artifact.timeout_seconds = 0;

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidField { field: "artifact.timeout_seconds", .. }
        ));
    }
}
