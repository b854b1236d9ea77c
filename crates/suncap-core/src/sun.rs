//! Sun-event lookup

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use suncap_api::{EventType, Location, SunEventRecord};
use suncap_host_api::SunEventService;
use suncap_store::SunEventCache;
use suncap_util::{Clock, Result, SuncapError};
use tracing::{debug, info, warn};

/// Resolves sunrise/sunset instants for a date.
///
/// The cache holds one record. A record answers only for its own date;
/// anything else goes to the remote service. Remote failures are not
/// retried here.
pub struct SunEventProvider {
    service: Arc<dyn SunEventService>,
    cache: Arc<dyn SunEventCache>,
    clock: Arc<dyn Clock>,
}

impl SunEventProvider {
    pub fn new(
        service: Arc<dyn SunEventService>,
        cache: Arc<dyn SunEventCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            service,
            cache,
            clock,
        }
    }

    /// Fetch `date` from the remote service, overwriting the cache.
    ///
    /// On remote failure the cached record is returned only if it is for
    /// the same date.
    pub async fn refresh(&self, location: &Location, date: NaiveDate) -> Result<SunEventRecord> {
        match self.service.fetch(location, date).await {
            Ok(times) => {
                let record = SunEventRecord {
                    date,
                    sunrise: times.sunrise,
                    sunset: times.sunset,
                    solar_noon: times.solar_noon,
                    day_length: times.day_length,
                    fetched_at: self.clock.now(),
                };

                if let Err(e) = self.cache.save(&record) {
                    warn!(error = %e, "Failed to write sun cache");
                }

                info!(
                    date = %date,
                    sunrise = %record.sunrise,
                    sunset = %record.sunset,
                    "Fetched sun times"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(date = %date, error = %e, "Sun times fetch failed");

                match self.cached(date) {
                    Some(record) => {
                        info!(date = %date, "Using cached sun times");
                        Ok(record)
                    }
                    None => Err(SuncapError::sun_data(date, e.to_string())),
                }
            }
        }
    }

    /// Cache-or-fetch for `date`
    pub async fn for_date(&self, location: &Location, date: NaiveDate) -> Result<SunEventRecord> {
        if let Some(record) = self.cached(date) {
            debug!(date = %date, "Sun cache hit");
            return Ok(record);
        }
        self.refresh(location, date).await
    }

    /// Cache-or-fetch for the current date in the location's timezone
    pub async fn today(&self, location: &Location) -> Result<SunEventRecord> {
        let date = self.clock.today(location.timezone);
        self.for_date(location, date).await
    }

    pub async fn resolve_event(
        &self,
        location: &Location,
        date: NaiveDate,
        event_type: EventType,
    ) -> Result<DateTime<Utc>> {
        Ok(self.for_date(location, date).await?.event_instant(event_type))
    }

    /// The cached record if it is for `date`; an unreadable cache is a miss
    fn cached(&self, date: NaiveDate) -> Option<SunEventRecord> {
        match self.cache.load() {
            Ok(record) => record.filter(|r| r.is_for(date)),
            Err(e) => {
                warn!(error = %e, "Failed to read sun cache, treating as empty");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use suncap_host_api::{MockClock, MockSunService, SunTimes};
    use suncap_store::{JsonFileCache, MemoryCache};

    fn location() -> Location {
        Location {
            latitude: 39.47,
            longitude: -0.38,
            timezone: chrono_tz::UTC,
            name: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn times(d: u32) -> SunTimes {
        SunTimes {
            sunrise: Utc.with_ymd_and_hms(2025, 6, d, 4, 30, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2025, 6, d, 19, 30, 0).unwrap(),
            solar_noon: Utc.with_ymd_and_hms(2025, 6, d, 12, 0, 0).unwrap(),
            day_length: 54_000,
        }
    }

    fn setup(cache: Arc<dyn SunEventCache>) -> (SunEventProvider, MockSunService) {
        let service = MockSunService::new();
        let clock = MockClock::new(Utc.with_ymd_and_hms(2025, 6, 21, 0, 5, 0).unwrap());
        let provider = SunEventProvider::new(Arc::new(service.clone()), cache, Arc::new(clock));
        (provider, service)
    }

    #[tokio::test]
    async fn cache_hit_skips_network() {
        let (provider, service) = setup(Arc::new(MemoryCache::new()));
        service.set_times(day(21), times(21));

        provider.today(&location()).await.unwrap();
        provider.today(&location()).await.unwrap();
        assert_eq!(service.fetch_count(), 1);
    }

    #[tokio::test]
    async fn other_date_forces_refetch() {
        let cache = Arc::new(MemoryCache::new());
        let (provider, service) = setup(cache.clone());
        service.set_times(day(21), times(21));
        service.set_times(day(22), times(22));

        provider.for_date(&location(), day(21)).await.unwrap();
        let record = provider.for_date(&location(), day(22)).await.unwrap();

        assert_eq!(record.date, day(22));
        assert_eq!(service.fetch_count(), 2);
        // single slot: only the latest date survives
        assert_eq!(cache.load().unwrap().unwrap().date, day(22));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_always_fetches_and_stamps() {
        let (provider, service) = setup(Arc::new(MemoryCache::new()));
        service.set_times(day(21), times(21));

        provider.refresh(&location(), day(21)).await.unwrap();
        let record = provider.refresh(&location(), day(21)).await.unwrap();

        assert_eq!(service.fetch_count(), 2);
        assert_eq!(record.fetched_at, Utc.with_ymd_and_hms(2025, 6, 21, 0, 5, 0).unwrap());
        assert_eq!(record.day_length, 54_000);
    }

    #[tokio::test]
    async fn failure_falls_back_to_same_date_cache() {
        let (provider, service) = setup(Arc::new(MemoryCache::new()));
        service.set_times(day(21), times(21));
        provider.refresh(&location(), day(21)).await.unwrap();

        service.set_failing(true);
        let record = provider.refresh(&location(), day(21)).await.unwrap();
        assert_eq!(record.sunset, times(21).sunset);
    }

    #[tokio::test]
    async fn failure_with_stale_cache_is_unavailable() {
        let (provider, service) = setup(Arc::new(MemoryCache::new()));
        service.set_times(day(20), times(20));
        provider.refresh(&location(), day(20)).await.unwrap();

        service.set_failing(true);
        let result = provider.refresh(&location(), day(21)).await;
        assert!(matches!(
            result,
            Err(SuncapError::SunDataUnavailable { date, .. }) if date == day(21)
        ));
    }

    #[tokio::test]
    async fn corrupt_cache_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sun-times.json");
        std::fs::write(&path, "not json").unwrap();

        let (provider, service) = setup(Arc::new(JsonFileCache::new(&path)));
        service.set_times(day(21), times(21));

        let record = provider.today(&location()).await.unwrap();
        assert_eq!(record.date, day(21));
        assert_eq!(service.fetch_count(), 1);
    }

    #[tokio::test]
    async fn resolve_event_picks_instant() {
        let (provider, service) = setup(Arc::new(MemoryCache::new()));
        service.set_times(day(21), times(21));

        let sunset = provider
            .resolve_event(&location(), day(21), EventType::Sunset)
            .await
            .unwrap();
        assert_eq!(sunset, times(21).sunset);
    }
}
