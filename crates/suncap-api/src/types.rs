//! Shared types for suncap

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use suncap_util::SessionId;

/// The daily astronomical event a capture window is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Sunrise,
    Sunset,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Sunrise => "sunrise",
            EventType::Sunset => "sunset",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sunrise" => Ok(EventType::Sunrise),
            "sunset" => Ok(EventType::Sunset),
            other => Err(format!("unknown event type '{}'", other)),
        }
    }
}

/// Scheduler lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    #[default]
    Idle,
    /// A window start is armed
    Waiting,
    Capturing,
    /// Artifact build in progress
    Generating,
}

/// Where the sun events are computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    #[serde(default)]
    pub name: Option<String>,
}

/// Sun events of one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SunEventRecord {
    pub date: NaiveDate,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub solar_noon: DateTime<Utc>,
    /// Seconds between sunrise and sunset
    pub day_length: u64,
    pub fetched_at: DateTime<Utc>,
}

impl SunEventRecord {
    pub fn event_instant(&self, event_type: EventType) -> DateTime<Utc> {
        match event_type {
            EventType::Sunrise => self.sunrise,
            EventType::Sunset => self.sunset,
        }
    }

    pub fn is_for(&self, date: NaiveDate) -> bool {
        self.date == date
    }
}

/// The interval around an event during which automatic capture runs.
///
/// Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureWindow {
    pub event_type: EventType,
    pub event_instant: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CaptureWindow {
    /// `[event - offset, event + offset]`
    pub fn around(event_type: EventType, event_instant: DateTime<Utc>, offset: Duration) -> Self {
        let offset = chrono::Duration::from_std(offset).unwrap_or(chrono::Duration::MAX);
        let start = event_instant
            .checked_sub_signed(offset)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = event_instant
            .checked_add_signed(offset)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            event_type,
            event_instant,
            start,
            end,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.end
    }
}

/// One persisted frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecord {
    pub file_path: PathBuf,
    pub filename: String,
    pub date: NaiveDate,
    /// `HH-MM-SS` in the location timezone
    pub time: String,
    pub byte_size: u64,
}

/// Read-only view of the scheduler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStateSnapshot {
    pub status: CaptureStatus,
    pub session_id: Option<SessionId>,
    pub capture_count: u32,
    pub max_captures: Option<u32>,
    pub current_session_date: Option<NaiveDate>,
    pub next_capture_window: Option<CaptureWindow>,
    pub last_error: Option<String>,
    pub last_capture: Option<CaptureRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 21, h, m, 0).unwrap()
    }

    #[test]
    fn window_around_event() {
        let window = CaptureWindow::around(EventType::Sunset, at(18, 0), Duration::from_secs(30 * 60));
        assert_eq!(window.start, at(17, 30));
        assert_eq!(window.end, at(18, 30));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = CaptureWindow::around(EventType::Sunset, at(18, 0), Duration::from_secs(30 * 60));
        assert!(window.contains(at(17, 30)));
        assert!(window.contains(at(18, 30)));
        assert!(!window.contains(at(17, 29)));
        assert!(!window.has_elapsed(at(18, 30)));
        assert!(window.has_elapsed(at(18, 31)));
    }

    #[test]
    fn zero_offset_is_a_point() {
        let window = CaptureWindow::around(EventType::Sunrise, at(6, 0), Duration::ZERO);
        assert_eq!(window.start, window.end);
        assert!(window.contains(at(6, 0)));
    }

    #[test]
    fn event_type_round_trips_as_lowercase() {
        assert_eq!(serde_json::to_string(&EventType::Sunset).unwrap(), "\"sunset\"");
        assert_eq!("sunrise".parse::<EventType>(), Ok(EventType::Sunrise));
        assert!("noon".parse::<EventType>().is_err());
    }

    #[test]
    fn sun_record_reads_cached_json() {
        let json = r#"{
            "date": "2025-06-21",
            "sunrise": "2025-06-21T06:35:10+02:00",
            "sunset": "2025-06-21T21:30:05+02:00",
            "solarNoon": "2025-06-21T14:02:37+02:00",
            "dayLength": 53695,
            "fetchedAt": "2025-06-20T22:05:00Z"
        }"#;

        let record: SunEventRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.sunrise, Utc.with_ymd_and_hms(2025, 6, 21, 4, 35, 10).unwrap());
        assert_eq!(record.event_instant(EventType::Sunset), Utc.with_ymd_and_hms(2025, 6, 21, 19, 30, 5).unwrap());
        assert!(record.is_for(NaiveDate::from_ymd_opt(2025, 6, 21).unwrap()));
    }

    #[test]
    fn snapshot_clone_is_independent() {
        let mut original = SchedulerStateSnapshot {
            status: CaptureStatus::Capturing,
            capture_count: 2,
            ..Default::default()
        };
        let copy = original.clone();

        original.capture_count = 99;
        original.last_error = Some("changed".into());

        assert_eq!(copy.capture_count, 2);
        assert_eq!(copy.last_error, None);
    }

    proptest! {
        #[test]
        fn window_start_never_after_end(
            event_secs in 0i64..4_000_000_000,
            offset_secs in 0u64..1_000_000,
        ) {
            let event = Utc.timestamp_opt(event_secs, 0).unwrap();
            let offset = Duration::from_secs(offset_secs);
            let window = CaptureWindow::around(EventType::Sunset, event, offset);

            let o = chrono::Duration::seconds(offset_secs as i64);
            prop_assert!(window.start <= window.end);
            prop_assert_eq!(window.start, event - o);
            prop_assert_eq!(window.end, event + o);
            prop_assert!(window.contains(event));
        }
    }
}
