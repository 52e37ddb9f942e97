//! On-demand plugin loading.
//!
//! A [`PluginLoader`] turns caller-supplied [`LoadDefinition`]s into plugin
//! instances. Each call passes through:
//!
//! 1. **Gate**: the definition's [`ActivationGate`], re-evaluated per call.
//! 2. **Single-flight cache**: completed loads are served from the cache and
//!    concurrent callers share one in-flight attempt.
//! 3. **Timeout**: every attempt is raced against [`LoaderConfig::timeout_ms`].
//!
//! Batches go through [`PluginLoader::load_all`] (fail-fast) or
//! [`PluginLoader::load_all_settled`], both bounded by
//! [`LoaderConfig::max_parallel`].

pub mod batch;
pub mod config;
pub mod definition;
pub mod error;
pub mod gate;
pub mod loader;
pub mod ordering;
pub mod stats;
pub mod timeout;
pub mod traits;

pub use batch::{BatchFailure, BatchReport};
pub use config::{ConfigFormat, LoaderConfig};
pub use definition::{LoadDefinition, LoadedPlugin};
pub use error::{BatchError, BoxError, ConfigError, DefinitionError, LoadError};
pub use gate::{is_active, ActivationGate};
pub use loader::{PluginLoader, PluginLoaderBuilder};
pub use ordering::dependency_order;
pub use stats::{CounterSnapshot, LoaderStats};
pub use timeout::TimeoutGuard;
pub use traits::{FactoryLoader, FnLoader, LoadResult, PluginFactory, PluginInstance};
