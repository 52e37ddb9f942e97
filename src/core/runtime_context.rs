use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Clock used by the loader to measure load times.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Instant;

    fn elapsed(&self, since: Instant) -> Duration {
        self.now().saturating_duration_since(since)
    }
}

/// Shared handle to a clock, as stored by the loader.
pub type SharedTimeProvider = Arc<dyn TimeProvider>;

// --- Real implementation ---

/// Reads tokio's clock, so paused test time (`start_paused`) applies.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealTimeProvider;

impl RealTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// --- Fake implementation ---

/// Deterministic clock.
///
/// Every call to [`TimeProvider::now`] moves the clock forward by `step`, so a
/// load measured between two readings always reports exactly `step`.
/// [`FakeTimeProvider::advance`] moves it by an arbitrary amount.
pub struct FakeTimeProvider {
    origin: Instant,
    offset_millis: AtomicU64,
    step_millis: u64,
}

impl FakeTimeProvider {
    pub fn new() -> Self {
        Self::with_step(Duration::ZERO)
    }

    pub fn with_step(step: Duration) -> Self {
        Self {
            origin: Instant::now(),
            offset_millis: AtomicU64::new(0),
            step_millis: u64::try_from(step.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn offset(&self) -> Duration {
        Duration::from_millis(self.offset_millis.load(Ordering::SeqCst))
    }
}

impl Default for FakeTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for FakeTimeProvider {
    fn now(&self) -> Instant {
        let offset = self
            .offset_millis
            .fetch_add(self.step_millis, Ordering::SeqCst);
        self.origin + Duration::from_millis(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_time_provider_steps_on_each_read() {
        let clock = FakeTimeProvider::with_step(Duration::from_millis(5));
        let start = clock.now();
        assert_eq!(clock.elapsed(start), Duration::from_millis(5));
        assert_eq!(clock.elapsed(start), Duration::from_millis(10));
    }

    #[test]
    fn test_fake_time_provider_advance() {
        let clock = FakeTimeProvider::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.elapsed(start), Duration::from_millis(250));
        assert_eq!(clock.offset(), Duration::from_millis(250));
    }

    #[test]
    fn test_elapsed_never_negative() {
        let clock = FakeTimeProvider::new();
        let later = clock.now() + Duration::from_secs(1);
        assert_eq!(clock.elapsed(later), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_time_provider_follows_tokio_clock() {
        let clock = RealTimeProvider::new();
        let start = clock.now();
        tokio::time::advance(Duration::from_millis(40)).await;
        assert!(clock.elapsed(start) >= Duration::from_millis(40));
    }
}
