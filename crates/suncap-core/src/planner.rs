//! Capture window planning

use chrono::{DateTime, Utc};
use std::sync::Arc;
use suncap_api::{CaptureWindow, PlanOutcome, SunEventRecord};
use suncap_config::Settings;
use suncap_util::{Clock, Result};
use tracing::debug;

use crate::SunEventProvider;

/// What the scheduler should do about today's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// Capture is disabled; no window
    Idle,
    /// Inside the window: capture until `end`
    StartNow { end: DateTime<Utc> },
    /// Before the window: wait for `start`
    ScheduleAt {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Window already over; nothing is armed until the next daily refresh
    DeferToNextCycle,
}

impl PlanAction {
    pub fn outcome(&self) -> PlanOutcome {
        match self {
            PlanAction::Idle => PlanOutcome::Idle,
            PlanAction::StartNow { .. } => PlanOutcome::StartedNow,
            PlanAction::ScheduleAt { .. } => PlanOutcome::Scheduled,
            PlanAction::DeferToNextCycle => PlanOutcome::Deferred,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub window: Option<CaptureWindow>,
    pub action: PlanAction,
}

/// Decide against a window; both boundaries count as inside
pub fn decide(window: &CaptureWindow, now: DateTime<Utc>) -> PlanAction {
    if window.contains(now) {
        PlanAction::StartNow { end: window.end }
    } else if window.has_elapsed(now) {
        PlanAction::DeferToNextCycle
    } else {
        PlanAction::ScheduleAt {
            start: window.start,
            end: window.end,
        }
    }
}

/// The configured event's window on the record's date
pub fn window_for(record: &SunEventRecord, settings: &Settings) -> CaptureWindow {
    let event_type = settings.capture.event_type;
    CaptureWindow::around(
        event_type,
        record.event_instant(event_type),
        settings.capture.offset,
    )
}

pub struct CaptureWindowPlanner {
    provider: Arc<SunEventProvider>,
    clock: Arc<dyn Clock>,
}

impl CaptureWindowPlanner {
    pub fn new(provider: Arc<SunEventProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { provider, clock }
    }

    /// Plan today's window from a fresh settings snapshot.
    ///
    /// Fails with `SunDataUnavailable` when today's sun events cannot be
    /// resolved.
    pub async fn plan_next(&self, settings: &Settings) -> Result<Plan> {
        if !settings.capture.enabled {
            debug!("Capture disabled, nothing to plan");
            return Ok(Plan {
                window: None,
                action: PlanAction::Idle,
            });
        }

        let record = self.provider.today(&settings.location).await?;
        let window = window_for(&record, settings);
        let action = decide(&window, self.clock.now());

        debug!(
            event = %window.event_type,
            start = %window.start,
            end = %window.end,
            action = ?action,
            "Planned capture window"
        );

        Ok(Plan {
            window: Some(window),
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;
    use std::time::Duration;
    use suncap_api::EventType;
    use suncap_host_api::{MockClock, MockSunService, SunTimes};
    use suncap_store::MemoryCache;
    use suncap_util::SuncapError;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 22, h, m, 0).unwrap()
    }

    fn sunset_window() -> CaptureWindow {
        CaptureWindow::around(EventType::Sunset, at(18, 0), Duration::from_secs(30 * 60))
    }

    #[test]
    fn inside_window_starts_now() {
        assert_eq!(
            decide(&sunset_window(), at(17, 45)),
            PlanAction::StartNow { end: at(18, 30) }
        );
    }

    #[test]
    fn before_window_schedules_start() {
        assert_eq!(
            decide(&sunset_window(), at(17, 0)),
            PlanAction::ScheduleAt {
                start: at(17, 30),
                end: at(18, 30)
            }
        );
    }

    #[test]
    fn after_window_defers() {
        assert_eq!(decide(&sunset_window(), at(19, 0)), PlanAction::DeferToNextCycle);
    }

    #[test]
    fn boundaries_are_inside() {
        let window = sunset_window();
        assert!(matches!(decide(&window, at(17, 30)), PlanAction::StartNow { .. }));
        assert!(matches!(decide(&window, at(18, 30)), PlanAction::StartNow { .. }));
        assert_eq!(
            decide(&window, at(18, 30) + chrono::Duration::seconds(1)),
            PlanAction::DeferToNextCycle
        );
    }

    proptest! {
        #[test]
        fn every_instant_gets_exactly_one_action(offset_min in 0u64..720, probe_min in -1500i64..1500) {
            let window = CaptureWindow::around(EventType::Sunrise, at(12, 0), Duration::from_secs(offset_min * 60));
            let now = at(12, 0) + chrono::Duration::minutes(probe_min);

            let expected = if now < window.start {
                PlanAction::ScheduleAt { start: window.start, end: window.end }
            } else if now > window.end {
                PlanAction::DeferToNextCycle
            } else {
                PlanAction::StartNow { end: window.end }
            };
            prop_assert_eq!(decide(&window, now), expected);
        }
    }

    fn planner(now: DateTime<Utc>, service: &MockSunService) -> CaptureWindowPlanner {
        let clock: Arc<dyn Clock> = Arc::new(MockClock::new(now));
        let provider = SunEventProvider::new(
            Arc::new(service.clone()),
            Arc::new(MemoryCache::new()),
            clock.clone(),
        );
        CaptureWindowPlanner::new(Arc::new(provider), clock)
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.location.timezone = chrono_tz::UTC;
        settings.capture.event_type = EventType::Sunset;
        settings.capture.offset = Duration::from_secs(30 * 60);
        settings
    }

    #[tokio::test]
    async fn plans_configured_event() {
        let service = MockSunService::new();
        service.set_times(
            NaiveDate::from_ymd_opt(2025, 9, 22).unwrap(),
            SunTimes {
                sunrise: at(6, 0),
                sunset: at(18, 0),
                solar_noon: at(12, 0),
                day_length: 43_200,
            },
        );

        let plan = planner(at(17, 0), &service).plan_next(&settings()).await.unwrap();
        assert_eq!(plan.window, Some(sunset_window()));
        assert_eq!(plan.action.outcome(), PlanOutcome::Scheduled);
    }

    #[tokio::test]
    async fn disabled_plans_nothing() {
        let service = MockSunService::new();
        let mut settings = settings();
        settings.capture.enabled = false;

        let plan = planner(at(17, 0), &service).plan_next(&settings).await.unwrap();
        assert_eq!(plan, Plan { window: None, action: PlanAction::Idle });
        assert_eq!(service.fetch_count(), 0);
    }

    #[tokio::test]
    async fn missing_sun_data_fails() {
        let service = MockSunService::new();
        service.set_failing(true);

        let result = planner(at(17, 0), &service).plan_next(&settings()).await;
        assert!(matches!(result, Err(SuncapError::SunDataUnavailable { .. })));
    }
}
