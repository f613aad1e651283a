//! Time-based snapshot cache.
//!
//! Holds at most one value plus the instant it was stored. A value older
//! than the staleness window is replaced by running a caller-supplied
//! refresh before it is served again. A failed refresh leaves the previous
//! snapshot in place.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// How concurrent refresh triggers are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Every caller that sees a stale cache runs its own refresh; the last
    /// one to finish wins.
    #[default]
    Concurrent,
    /// Refreshes are serialized and callers waiting behind a refresh reuse
    /// its result.
    SingleFlight,
}

/// A stored value and when it was stored.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub value: Arc<T>,
    pub updated_at: DateTime<Utc>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            updated_at: self.updated_at,
        }
    }
}

pub struct TimedCache<T> {
    slot: RwLock<Option<Snapshot<T>>>,
    refresh_lock: Mutex<()>,
    staleness: Duration,
    mode: RefreshMode,
    clock: Arc<dyn Clock>,
}

impl<T: Send + Sync> TimedCache<T> {
    /// Empty cache on the wall clock.
    pub fn new(staleness: Duration, mode: RefreshMode) -> Self {
        Self::with_clock(staleness, mode, Arc::new(SystemClock))
    }

    pub fn with_clock(staleness: Duration, mode: RefreshMode, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            staleness,
            mode,
            clock,
        }
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    /// Current snapshot regardless of age.
    pub async fn current(&self) -> Option<Snapshot<T>> {
        self.slot.read().await.clone()
    }

    /// Whether a snapshot is still inside the staleness window.
    ///
    /// An age exactly equal to the window still counts as fresh. A snapshot
    /// stamped in the future (clock moved backwards) is fresh.
    pub fn is_fresh(&self, snapshot: &Snapshot<T>) -> bool {
        match (self.clock.now() - snapshot.updated_at).to_std() {
            Ok(age) => age <= self.staleness,
            Err(_) => true,
        }
    }

    /// Cached value if present and fresh.
    pub async fn fresh(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|snapshot| self.is_fresh(snapshot))
            .map(|snapshot| Arc::clone(&snapshot.value))
    }

    /// Serve the cached value, running `refresh` first if the cache is
    /// empty or stale.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh().await {
            return Ok(value);
        }

        match self.mode {
            RefreshMode::Concurrent => self.refresh_with(refresh).await,
            RefreshMode::SingleFlight => {
                let _guard = self.refresh_lock.lock().await;
                if let Some(value) = self.fresh().await {
                    debug!("Cache refreshed while waiting, reusing result");
                    return Ok(value);
                }
                self.refresh_with(refresh).await
            }
        }
    }

    /// Run `refresh` unconditionally and store its result.
    pub async fn refresh_with<F, Fut, E>(&self, refresh: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = Arc::new(refresh().await?);
        let snapshot = Snapshot {
            value: Arc::clone(&value),
            updated_at: self.clock.now(),
        };
        *self.slot.write().await = Some(snapshot);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn manual_cache(mode: RefreshMode) -> (Arc<ManualClock>, TimedCache<u32>) {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TimedCache::with_clock(WEEK, mode, clock.clone());
        (clock, cache)
    }

    async fn counting_refresh(counter: &AtomicUsize) -> Result<u32, String> {
        let n = counter.fetch_add(1, Ordering::SeqCst) as u32 + 1;
        Ok(n)
    }

    #[tokio::test]
    async fn test_empty_cache_refreshes() {
        let (_, cache) = manual_cache(RefreshMode::Concurrent);
        let calls = AtomicUsize::new(0);

        assert!(cache.current().await.is_none());
        let value = assert_ok!(cache.get_or_refresh(|| counting_refresh(&calls)).await);

        assert_eq!(*value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.current().await.unwrap().updated_at, start());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_refresh() {
        let (clock, cache) = manual_cache(RefreshMode::Concurrent);
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_refresh(|| counting_refresh(&calls)).await.unwrap();
        clock.advance(chrono::Duration::days(3));
        let second = cache.get_or_refresh(|| counting_refresh(&calls)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exact_window_is_still_fresh() {
        let (clock, cache) = manual_cache(RefreshMode::Concurrent);
        let calls = AtomicUsize::new(0);

        cache.get_or_refresh(|| counting_refresh(&calls)).await.unwrap();
        clock.advance(chrono::Duration::days(7));
        cache.get_or_refresh(|| counting_refresh(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_refreshes() {
        let (clock, cache) = manual_cache(RefreshMode::Concurrent);
        let calls = AtomicUsize::new(0);

        cache.get_or_refresh(|| counting_refresh(&calls)).await.unwrap();
        clock.advance(chrono::Duration::days(7) + chrono::Duration::milliseconds(1));
        let value = cache.get_or_refresh(|| counting_refresh(&calls)).await.unwrap();

        assert_eq!(*value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.current().await.unwrap().updated_at,
            start() + chrono::Duration::days(7) + chrono::Duration::milliseconds(1)
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let (clock, cache) = manual_cache(RefreshMode::Concurrent);

        cache
            .get_or_refresh(|| async { Ok::<_, String>(42) })
            .await
            .unwrap();
        clock.advance(chrono::Duration::days(8));

        let err = assert_err!(
            cache
                .get_or_refresh(|| async { Err::<u32, _>("upstream down".to_string()) })
                .await
        );
        assert_eq!(err, "upstream down");

        let snapshot = cache.current().await.unwrap();
        assert_eq!(*snapshot.value, 42);
        assert_eq!(snapshot.updated_at, start());
        assert!(!cache.is_fresh(&snapshot));
    }

    #[tokio::test]
    async fn test_failed_first_refresh_leaves_cache_empty() {
        let (_, cache) = manual_cache(RefreshMode::Concurrent);

        let result = cache
            .get_or_refresh(|| async { Err::<u32, _>("boom") })
            .await;
        assert!(result.is_err());
        assert!(cache.current().await.is_none());
    }

    #[tokio::test]
    async fn test_clock_moving_backwards_counts_as_fresh() {
        let (clock, cache) = manual_cache(RefreshMode::Concurrent);
        let calls = AtomicUsize::new(0);

        cache.get_or_refresh(|| counting_refresh(&calls)).await.unwrap();
        clock.advance(chrono::Duration::hours(-1));
        cache.get_or_refresh(|| counting_refresh(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    async fn slow_refresh(counter: &AtomicUsize) -> Result<u32, String> {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(7)
    }

    #[tokio::test]
    async fn test_concurrent_mode_runs_duplicate_refreshes() {
        let cache = TimedCache::<u32>::new(WEEK, RefreshMode::Concurrent);
        let calls = AtomicUsize::new(0);

        let (a, b) = tokio::join!(
            cache.get_or_refresh(|| slow_refresh(&calls)),
            cache.get_or_refresh(|| slow_refresh(&calls)),
        );

        assert_eq!(*a.unwrap(), 7);
        assert_eq!(*b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_flight_shares_refresh() {
        let cache = TimedCache::<u32>::new(WEEK, RefreshMode::SingleFlight);
        let calls = AtomicUsize::new(0);

        let (a, b) = tokio::join!(
            cache.get_or_refresh(|| slow_refresh(&calls)),
            cache.get_or_refresh(|| slow_refresh(&calls)),
        );

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_mode_serde() {
        let mode: RefreshMode = serde_json::from_str(r#""single_flight""#).unwrap();
        assert_eq!(mode, RefreshMode::SingleFlight);
        assert_eq!(RefreshMode::default(), RefreshMode::Concurrent);
    }
}
