//! sunrise-sunset.org client

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use suncap_api::Location;
use suncap_host_api::{HostError, HostResult, SunEventService, SunTimes};
use tracing::debug;

use crate::camera::request_error;

pub const DEFAULT_SUN_API_URL: &str = "https://api.sunrise-sunset.org/json";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    /// An object on success, an empty string on most errors
    #[serde(default)]
    results: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResults {
    sunrise: String,
    sunset: String,
    solar_noon: String,
    day_length: u64,
}

/// Client for the `formatted=0` JSON API
#[derive(Debug, Clone)]
pub struct SunriseSunsetClient {
    client: Client,
    base_url: String,
}

impl SunriseSunsetClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> HostResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| HostError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SunEventService for SunriseSunsetClient {
    async fn fetch(&self, location: &Location, date: NaiveDate) -> HostResult<SunTimes> {
        debug!(
            url = %self.base_url,
            lat = location.latitude,
            lng = location.longitude,
            date = %date,
            "Querying sun events"
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lng", location.longitude.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
                ("formatted", "0".to_string()),
                ("tzid", location.timezone.name().to_string()),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(request_error)?;
        parse_response(&body)
    }
}

/// Decode an API body; any status other than `OK` is a rejection
pub fn parse_response(body: &str) -> HostResult<SunTimes> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| HostError::Parse(e.to_string()))?;

    if response.status != "OK" {
        return Err(HostError::Rejected(response.status));
    }

    let results: ApiResults =
        serde_json::from_value(response.results).map_err(|e| HostError::Parse(e.to_string()))?;

    Ok(SunTimes {
        sunrise: parse_instant("sunrise", &results.sunrise)?,
        sunset: parse_instant("sunset", &results.sunset)?,
        solar_noon: parse_instant("solar_noon", &results.solar_noon)?,
        day_length: results.day_length,
    })
}

fn parse_instant(field: &str, value: &str) -> HostResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HostError::Parse(format!("{} '{}': {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const OK_BODY: &str = r#"{
        "results": {
            "sunrise": "2025-06-21T06:34:12+02:00",
            "sunset": "2025-06-21T21:30:45+02:00",
            "solar_noon": "2025-06-21T14:02:28+02:00",
            "day_length": 53793,
            "civil_twilight_begin": "2025-06-21T06:04:37+02:00"
        },
        "status": "OK",
        "tzid": "Europe/Madrid"
    }"#;

    #[test]
    fn parses_ok_response_to_utc() {
        let times = parse_response(OK_BODY).unwrap();
        assert_eq!(times.sunrise, Utc.with_ymd_and_hms(2025, 6, 21, 4, 34, 12).unwrap());
        assert_eq!(times.sunset, Utc.with_ymd_and_hms(2025, 6, 21, 19, 30, 45).unwrap());
        assert_eq!(times.solar_noon, Utc.with_ymd_and_hms(2025, 6, 21, 12, 2, 28).unwrap());
        assert_eq!(times.day_length, 53793);
    }

    #[test]
    fn non_ok_status_is_rejected() {
        let body = r#"{"results": "", "status": "INVALID_TZID"}"#;
        assert!(matches!(parse_response(body), Err(HostError::Rejected(s)) if s == "INVALID_TZID"));

        let body = r#"{"status": "INVALID_DATE"}"#;
        assert!(matches!(parse_response(body), Err(HostError::Rejected(s)) if s == "INVALID_DATE"));
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(parse_response("<html>"), Err(HostError::Parse(_))));

        let body = r#"{"status": "OK", "results": {"sunrise": "06:34", "sunset": "x", "solar_noon": "x", "day_length": 1}}"#;
        assert!(matches!(parse_response(body), Err(HostError::Parse(_))));
    }

    #[test]
    fn client_builds_with_timeout() {
        let client = SunriseSunsetClient::new(DEFAULT_SUN_API_URL, Duration::from_secs(10));
        assert!(client.is_ok());
    }
}
