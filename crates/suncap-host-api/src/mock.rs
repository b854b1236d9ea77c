//! Mock host seams for testing

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use suncap_api::{EventType, Location};
use suncap_util::Clock;
use tokio::time::Instant;

use crate::{ArtifactBuilder, CameraSource, HostError, HostResult, SunEventService, SunTimes};

/// Wall clock driven by tokio time.
///
/// Under `start_paused` tests the clock advances exactly as far as tokio's
/// paused timer does, so wall-clock deadlines and tokio sleeps stay in step.
#[derive(Debug, Clone)]
pub struct MockClock {
    anchor: Arc<Mutex<(DateTime<Utc>, Instant)>>,
}

impl MockClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            anchor: Arc::new(Mutex::new((start, Instant::now()))),
        }
    }

    /// Jump the wall clock; tokio timers are not affected
    pub fn set(&self, now: DateTime<Utc>) {
        *self.anchor.lock().unwrap() = (now, Instant::now());
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        let (wall, instant) = *self.anchor.lock().unwrap();
        let elapsed = Instant::now().saturating_duration_since(instant);
        wall + chrono::Duration::from_std(elapsed).unwrap_or_default()
    }
}

/// Scripted camera
#[derive(Debug, Clone)]
pub struct MockCamera {
    frame: Arc<Mutex<Vec<u8>>>,
    attempts: Arc<AtomicU32>,

    /// Number of upcoming fetches that fail before fetches succeed again
    pub fail_next: Arc<Mutex<u32>>,

    /// Fail every fetch
    pub fail_always: Arc<Mutex<bool>>,

    /// Delay applied to every fetch (simulates a slow camera)
    pub delay: Arc<Mutex<Option<Duration>>>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self {
            frame: Arc::new(Mutex::new(b"\xff\xd8mock-jpeg\xff\xd9".to_vec())),
            attempts: Arc::new(AtomicU32::new(0)),
            fail_next: Arc::new(Mutex::new(0)),
            fail_always: Arc::new(Mutex::new(false)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_frame(&self, bytes: Vec<u8>) {
        *self.frame.lock().unwrap() = bytes;
    }

    pub fn fail_next(&self, count: u32) {
        *self.fail_next.lock().unwrap() = count;
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_always.lock().unwrap() = failing;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Total fetch attempts seen so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraSource for MockCamera {
    async fn fetch(&self, _url: &str) -> HostResult<Vec<u8>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail_always.lock().unwrap() {
            return Err(HostError::Http("Mock camera offline".into()));
        }

        {
            let mut remaining = self.fail_next.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(HostError::Status(503));
            }
        }

        Ok(self.frame.lock().unwrap().clone())
    }
}

/// Sun-event service answering from a table
#[derive(Debug, Clone, Default)]
pub struct MockSunService {
    by_date: Arc<Mutex<HashMap<NaiveDate, SunTimes>>>,
    fallback: Arc<Mutex<Option<SunTimes>>>,
    fetches: Arc<AtomicU32>,

    /// Fail every fetch
    pub fail: Arc<Mutex<bool>>,
}

impl MockSunService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_times(&self, date: NaiveDate, times: SunTimes) {
        self.by_date.lock().unwrap().insert(date, times);
    }

    /// Times returned for dates without an explicit entry
    pub fn set_fallback(&self, times: SunTimes) {
        *self.fallback.lock().unwrap() = Some(times);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SunEventService for MockSunService {
    async fn fetch(&self, _location: &Location, date: NaiveDate) -> HostResult<SunTimes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if *self.fail.lock().unwrap() {
            return Err(HostError::Rejected("INVALID_REQUEST".into()));
        }

        if let Some(times) = self.by_date.lock().unwrap().get(&date) {
            return Ok(times.clone());
        }

        self.fallback
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HostError::Rejected(format!("no mock data for {}", date)))
    }
}

/// Artifact builder that records every request
#[derive(Debug, Clone, Default)]
pub struct MockArtifactBuilder {
    requests: Arc<Mutex<Vec<(NaiveDate, EventType)>>>,

    /// Fail every build
    pub fail: Arc<Mutex<bool>>,

    /// Never finish a build
    pub hang: Arc<Mutex<bool>>,
}

impl MockArtifactBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }

    pub fn set_hanging(&self, hanging: bool) {
        *self.hang.lock().unwrap() = hanging;
    }

    pub fn requests(&self) -> Vec<(NaiveDate, EventType)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactBuilder for MockArtifactBuilder {
    async fn build(&self, date: NaiveDate, event_type: EventType) -> HostResult<PathBuf> {
        self.requests.lock().unwrap().push((date, event_type));

        let hang = *self.hang.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }

        if *self.fail.lock().unwrap() {
            return Err(HostError::Command("Mock build failure".into()));
        }

        Ok(PathBuf::from(format!("/tmp/mock-{}-{}.gif", date, event_type)))
    }
}
