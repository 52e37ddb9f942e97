use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of a loader's cache, taken by [`PluginLoader::stats`](super::PluginLoader::stats).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    /// Number of completed cache entries.
    pub loaded_count: usize,
    /// Sum of the recorded load times of all cached entries. Serialized as
    /// whole milliseconds under `total_load_time_ms`.
    #[serde(rename = "total_load_time_ms", serialize_with = "serialize_millis")]
    pub total_load_time: Duration,
    /// Cached plugin names, sorted.
    pub names: Vec<String>,
    /// Lifetime counters since construction or the last `clear()`.
    pub counters: CounterSnapshot,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

impl LoaderStats {
    pub fn total_load_time_ms(&self) -> u128 {
        self.total_load_time.as_millis()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Underlying loader invocations started.
    pub attempts: u64,
    pub succeeded: u64,
    /// Loader or factory failures, timeouts excluded.
    pub failed: u64,
    pub timed_out: u64,
    /// Attempts cancelled or panicked.
    pub aborted: u64,
    /// Calls skipped by a closed activation gate.
    pub gated: u64,
    /// Calls answered from the completed cache.
    pub cache_hits: u64,
    /// Calls that joined an attempt already in flight.
    pub shared_waits: u64,
}

#[derive(Debug, Default)]
pub(crate) struct LoadCounters {
    attempts: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    aborted: AtomicU64,
    gated: AtomicU64,
    cache_hits: AtomicU64,
    shared_waits: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Counter {
    Attempt,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
    Gated,
    CacheHit,
    SharedWait,
}

impl LoadCounters {
    fn slot(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Attempt => &self.attempts,
            Counter::Succeeded => &self.succeeded,
            Counter::Failed => &self.failed,
            Counter::TimedOut => &self.timed_out,
            Counter::Aborted => &self.aborted,
            Counter::Gated => &self.gated,
            Counter::CacheHit => &self.cache_hits,
            Counter::SharedWait => &self.shared_waits,
        }
    }

    pub(crate) fn record(&self, counter: Counter) {
        self.slot(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            gated: self.gated.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            shared_waits: self.shared_waits.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            Counter::Attempt,
            Counter::Succeeded,
            Counter::Failed,
            Counter::TimedOut,
            Counter::Aborted,
            Counter::Gated,
            Counter::CacheHit,
            Counter::SharedWait,
        ] {
            self.slot(counter).store(0, Ordering::Relaxed);
        }
    }
}
