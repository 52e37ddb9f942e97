//! # XLoader: On-demand Plugin Loader
//!
//! `xloader` loads named, lazily-resolved plugins for tools such as build
//! pipelines. It guarantees:
//!
//! - **Single-flight loading**: at most one underlying load per name at a
//!   time; concurrent callers share the in-flight result, completed loads are
//!   cached.
//! - **Gated loading**: a definition whose activation predicate is false is
//!   skipped without error.
//! - **Per-load timeouts**: every attempt races a configurable deadline.
//! - **Bounded batches**: `load_all` runs definitions in fixed-size groups,
//!   failing fast; `load_all_settled` collects every outcome.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xloader::{LoadDefinition, LoadResult, PluginFactory, PluginLoader};
//!
//! #[tokio::main]
//! async fn main() {
//!     let loader = PluginLoader::default();
//!     let definition = LoadDefinition::from_fn("minify", || async {
//!         LoadResult::Ok(PluginFactory::value("minifier"))
//!     });
//!     let instance = loader.load(&definition).await.unwrap();
//!     println!("{:?}", loader.stats());
//!     assert!(instance.is_some());
//! }
//! ```

pub mod core;
pub mod plugin_system;

pub use crate::core::{FakeTimeProvider, RealTimeProvider, SharedTimeProvider, TimeProvider};
pub use crate::plugin_system::{
    dependency_order, ActivationGate, BatchError, BatchFailure, BatchReport, BoxError,
    ConfigError, ConfigFormat, CounterSnapshot, DefinitionError, FactoryLoader, FnLoader,
    LoadDefinition, LoadError, LoadResult, LoadedPlugin, LoaderConfig, LoaderStats,
    PluginFactory, PluginInstance, PluginLoader, PluginLoaderBuilder,
};
