//! Single-flight plugin loader.
//!
//! Every load goes through the same path: activation gate, completed cache,
//! in-flight map, then a fresh attempt raced against the configured timeout.
//! An attempt runs as its own tokio task and publishes its outcome through a
//! shared handle, so every caller asking for the same name while it runs
//! observes the identical result and the underlying loader runs once.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::core::runtime_context::{RealTimeProvider, SharedTimeProvider};

use super::config::LoaderConfig;
use super::definition::{LoadDefinition, LoadedPlugin};
use super::error::{ConfigError, LoadError};
use super::gate;
use super::stats::{Counter, LoadCounters, LoaderStats};
use super::timeout::TimeoutGuard;
use super::traits::PluginInstance;

type LoadOutcome = Result<Arc<LoadedPlugin>, LoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

struct InFlight {
    attempt: u64,
    handle: SharedLoad,
    abort: Option<AbortHandle>,
}

#[derive(Default)]
struct LoaderState {
    loaded: HashMap<String, Arc<LoadedPlugin>>,
    loading: HashMap<String, InFlight>,
    /// Attempts cancelled before their task handle was attached.
    cancelled_unattached: HashSet<u64>,
    next_attempt: u64,
}

impl LoaderState {
    fn is_tracked(&self, name: &str, attempt: u64) -> bool {
        self.loading
            .get(name)
            .is_some_and(|in_flight| in_flight.attempt == attempt)
    }
}

struct LoaderInner {
    config: LoaderConfig,
    timeout: TimeoutGuard,
    time_provider: SharedTimeProvider,
    state: Mutex<LoaderState>,
    counters: LoadCounters,
}

enum Lookup {
    Cached(Arc<LoadedPlugin>),
    Pending(SharedLoad),
}

/// Loads plugins on demand, at most once per name.
///
/// Clones share one cache and one in-flight map. Loading requires a tokio
/// runtime.
#[derive(Clone)]
pub struct PluginLoader {
    inner: Arc<LoaderInner>,
}

impl PluginLoader {
    pub fn new(config: LoaderConfig) -> Result<Self, ConfigError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> PluginLoaderBuilder {
        PluginLoaderBuilder::default()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Loads `definition` and returns its instance.
    ///
    /// Returns `Ok(None)` when the definition's activation gate is closed;
    /// nothing is cached or started in that case.
    pub async fn load(
        &self,
        definition: &LoadDefinition,
    ) -> Result<Option<PluginInstance>, LoadError> {
        let plugin = self.load_plugin(definition).await?;
        Ok(plugin.map(|plugin| plugin.instance.clone()))
    }

    /// Same as [`load`](Self::load), returning the cache record with its load time.
    pub async fn load_plugin(
        &self,
        definition: &LoadDefinition,
    ) -> Result<Option<Arc<LoadedPlugin>>, LoadError> {
        if !gate::is_active(definition) {
            self.inner.counters.record(Counter::Gated);
            tracing::debug!(plugin = %definition.name(), "activation gate closed, skipping load");
            return Ok(None);
        }

        match self.lookup_or_start(definition) {
            Lookup::Cached(plugin) => Ok(Some(plugin)),
            Lookup::Pending(handle) => handle.await.map(Some),
        }
    }

    /// Cached record for `name`, regardless of its gate's current state.
    pub fn get(&self, name: &str) -> Option<Arc<LoadedPlugin>> {
        self.inner.state.lock().loaded.get(name).cloned()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.inner.state.lock().loaded.contains_key(name)
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.inner.state.lock().loading.contains_key(name)
    }

    /// Names with an attempt currently in flight, sorted.
    pub fn in_flight_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.state.lock().loading.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> LoaderStats {
        let state = self.inner.state.lock();
        let mut names: Vec<String> = state.loaded.keys().cloned().collect();
        names.sort();
        let total_load_time = state
            .loaded
            .values()
            .map(|plugin| plugin.load_time)
            .sum::<Duration>();
        LoaderStats {
            loaded_count: state.loaded.len(),
            total_load_time,
            names,
            counters: self.inner.counters.snapshot(),
        }
    }

    /// Forgets every cached and in-flight entry and resets the counters.
    ///
    /// Attempts still running are not cancelled. Their callers receive their
    /// outcome, but a success is no longer written to the cache.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        let dropped = state.loading.len();
        state.loaded.clear();
        state.loading.clear();
        drop(state);
        self.inner.counters.reset();
        tracing::debug!(untracked_in_flight = dropped, "plugin loader cleared");
    }

    /// Aborts every attempt in flight. Their callers receive
    /// [`LoadError::Aborted`] and nothing is cached. Returns the number of
    /// attempts aborted.
    pub fn cancel_in_flight(&self) -> usize {
        let aborted: Vec<(String, Option<AbortHandle>)> = {
            let mut state = self.inner.state.lock();
            let drained: Vec<(String, InFlight)> = state.loading.drain().collect();
            for (_, in_flight) in &drained {
                if in_flight.abort.is_none() {
                    state.cancelled_unattached.insert(in_flight.attempt);
                }
            }
            drained
                .into_iter()
                .map(|(name, in_flight)| (name, in_flight.abort))
                .collect()
        };

        for (name, abort) in &aborted {
            self.inner.counters.record(Counter::Aborted);
            tracing::warn!(plugin = %name, "cancelling in-flight load");
            if let Some(abort) = abort {
                abort.abort();
            }
        }
        aborted.len()
    }

    fn lookup_or_start(&self, definition: &LoadDefinition) -> Lookup {
        let name = definition.name();
        let (attempt, sender, handle) = {
            let mut state = self.inner.state.lock();
            if let Some(plugin) = state.loaded.get(name) {
                self.inner.counters.record(Counter::CacheHit);
                tracing::debug!(plugin = %name, "served from cache");
                return Lookup::Cached(plugin.clone());
            }
            if let Some(in_flight) = state.loading.get(name) {
                self.inner.counters.record(Counter::SharedWait);
                tracing::debug!(plugin = %name, "joining in-flight load");
                return Lookup::Pending(in_flight.handle.clone());
            }

            let attempt = state.next_attempt;
            state.next_attempt += 1;
            let (sender, receiver) = oneshot::channel();
            let handle = shared_handle(name.to_string(), receiver);
            state.loading.insert(
                name.to_string(),
                InFlight {
                    attempt,
                    handle: handle.clone(),
                    abort: None,
                },
            );
            (attempt, sender, handle)
        };
        self.inner.counters.record(Counter::Attempt);

        let settlement = Settlement {
            inner: self.inner.clone(),
            name: name.to_string(),
            attempt,
            sender: Some(sender),
        };
        // Spawned outside the lock: a task refused by a shutting-down runtime
        // drops its settlement inline, and that drop takes the lock.
        let task = tokio::spawn(run_attempt(definition.clone(), settlement));
        self.inner.attach_task(name, attempt, task.abort_handle());

        Lookup::Pending(handle)
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self {
            inner: Arc::new(LoaderInner::new(
                LoaderConfig::default(),
                Arc::new(RealTimeProvider::new()),
            )),
        }
    }
}

impl fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PluginLoader")
            .field("config", &self.inner.config)
            .field("loaded", &state.loaded.len())
            .field("loading", &state.loading.len())
            .finish()
    }
}

impl LoaderInner {
    fn new(config: LoaderConfig, time_provider: SharedTimeProvider) -> Self {
        Self {
            timeout: TimeoutGuard::new(config.timeout()),
            config,
            time_provider,
            state: Mutex::new(LoaderState::default()),
            counters: LoadCounters::default(),
        }
    }

    /// Stores the abort handle of a freshly spawned attempt. An attempt that
    /// `cancel_in_flight` drained before its handle arrived is aborted here.
    fn attach_task(&self, name: &str, attempt: u64, abort: AbortHandle) {
        let mut state = self.state.lock();
        if state.cancelled_unattached.remove(&attempt) {
            drop(state);
            abort.abort();
            return;
        }
        if let Some(in_flight) = state.loading.get_mut(name) {
            if in_flight.attempt == attempt {
                in_flight.abort = Some(abort);
            }
        }
    }

    /// Leaves the in-flight map and, on success, enters the cache in one
    /// critical section. Returns false when the attempt was no longer
    /// tracked (cleared or cancelled), in which case nothing is written.
    fn settle(&self, name: &str, attempt: u64, outcome: &LoadOutcome) -> bool {
        let mut state = self.state.lock();
        if !state.is_tracked(name, attempt) {
            return false;
        }
        state.loading.remove(name);
        if let Ok(plugin) = outcome {
            state.loaded.insert(name.to_string(), plugin.clone());
        }
        true
    }
}

fn shared_handle(name: String, receiver: oneshot::Receiver<LoadOutcome>) -> SharedLoad {
    async move {
        receiver.await.unwrap_or_else(|_| {
            Err(LoadError::Aborted {
                name,
                reason: "load task dropped before settling".into(),
            })
        })
    }
    .boxed()
    .shared()
}

/// Owned by the attempt's task. Publishes the outcome exactly once, and on
/// drop without an outcome (abort, panic, runtime shutdown) removes the
/// in-flight entry and reports the attempt as aborted.
struct Settlement {
    inner: Arc<LoaderInner>,
    name: String,
    attempt: u64,
    sender: Option<oneshot::Sender<LoadOutcome>>,
}

impl Settlement {
    fn complete(mut self, outcome: LoadOutcome) {
        let tracked = self.inner.settle(&self.name, self.attempt, &outcome);
        if tracked {
            self.record(&outcome);
        } else {
            tracing::debug!(plugin = %self.name, "discarding outcome of an untracked attempt");
        }
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(outcome);
        }
    }

    fn record(&self, outcome: &LoadOutcome) {
        let counters = &self.inner.counters;
        match outcome {
            Ok(plugin) => {
                counters.record(Counter::Succeeded);
                tracing::info!(
                    plugin = %self.name,
                    load_time_ms = plugin.load_time.as_millis() as u64,
                    "plugin loaded"
                );
            }
            Err(err) if err.is_timeout() => {
                counters.record(Counter::TimedOut);
                tracing::warn!(
                    plugin = %self.name,
                    timeout_ms = self.inner.config.timeout_ms,
                    "plugin load timed out"
                );
            }
            Err(err) => {
                counters.record(Counter::Failed);
                tracing::warn!(plugin = %self.name, error = %err, "plugin load failed");
            }
        }
    }
}

impl Drop for Settlement {
    fn drop(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        let tracked = {
            let mut state = self.inner.state.lock();
            let tracked = state.is_tracked(&self.name, self.attempt);
            if tracked {
                state.loading.remove(&self.name);
            }
            tracked
        };
        if tracked {
            self.inner.counters.record(Counter::Aborted);
            tracing::warn!(plugin = %self.name, "plugin load ended before settling");
        }
        let _ = sender.send(Err(LoadError::Aborted {
            name: self.name.clone(),
            reason: "load task ended before settling".into(),
        }));
    }
}

async fn run_attempt(definition: LoadDefinition, settlement: Settlement) {
    let inner = settlement.inner.clone();
    let name = definition.name();
    let started = inner.time_provider.now();

    let outcome = inner
        .timeout
        .run(name, definition.loader().load())
        .await
        .and_then(|factory| factory.resolve(name, definition.option_value()))
        .map(|instance| {
            Arc::new(LoadedPlugin {
                name: name.to_string(),
                instance,
                load_time: inner.time_provider.elapsed(started),
            })
        });

    settlement.complete(outcome);
}

/// Builder for [`PluginLoader`].
#[derive(Default)]
pub struct PluginLoaderBuilder {
    config: LoaderConfig,
    time_provider: Option<SharedTimeProvider>,
}

impl PluginLoaderBuilder {
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.config.max_parallel = max_parallel;
        self
    }

    /// Sets the per-load deadline. Sub-millisecond remainders round up, so
    /// only `Duration::ZERO` maps to a zero timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.config.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.config.preload = preload;
        self
    }

    pub fn time_provider(mut self, time_provider: SharedTimeProvider) -> Self {
        self.time_provider = Some(time_provider);
        self
    }

    pub fn build(self) -> Result<PluginLoader, ConfigError> {
        self.config.validate()?;
        if self.config.preload {
            tracing::debug!("preload is reserved and has no effect");
        }
        let time_provider = self
            .time_provider
            .unwrap_or_else(|| Arc::new(RealTimeProvider::new()));
        Ok(PluginLoader {
            inner: Arc::new(LoaderInner::new(self.config, time_provider)),
        })
    }
}
