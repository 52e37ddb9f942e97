//! Error types for the plugin loader.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by loaders and factory invocations.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Failure of a single load attempt.
///
/// Cloneable so that every caller awaiting the same in-flight attempt
/// receives the identical error.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error("Plugin '{name}' failed to load: {cause}")]
    Failed {
        name: String,
        #[source]
        cause: Arc<dyn StdError + Send + Sync>,
    },
    #[error("Plugin '{name}' timed out after {}ms", .timeout.as_millis())]
    Timeout { name: String, timeout: Duration },
    #[error("Plugin '{name}' load aborted: {reason}")]
    Aborted { name: String, reason: String },
}

impl LoadError {
    pub fn failed(name: impl Into<String>, cause: BoxError) -> Self {
        Self::Failed {
            name: name.into(),
            cause: Arc::from(cause),
        }
    }

    /// Name of the definition whose attempt failed.
    pub fn name(&self) -> &str {
        match self {
            Self::Failed { name, .. } | Self::Timeout { name, .. } | Self::Aborted { name, .. } => {
                name
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// First failure of a fail-fast batch.
#[derive(Error, Debug, Clone)]
#[error("Batch aborted in group {group}: {source}")]
pub struct BatchError {
    /// Zero-based index of the group that failed.
    pub group: usize,
    #[source]
    pub source: LoadError,
}

impl BatchError {
    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn into_load_error(self) -> LoadError {
        self.source
    }
}

/// Invalid loader configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_parallel must be at least 1")]
    ZeroMaxParallel,
    #[error("timeout_ms must be at least 1")]
    ZeroTimeout,
    #[error("Config parse error: {0}")]
    Parse(String),
}

/// Inconsistent set of definitions, reported by dependency ordering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Duplicate definition: {0}")]
    Duplicate(String),
    #[error("Plugin '{plugin}' depends on unknown plugin '{dependency}'")]
    UnknownDependency { plugin: String, dependency: String },
    #[error("Dependency cycle detected at plugin '{0}'")]
    Cycle(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        let err = LoadError::failed("alpha", "disk on fire".into());
        let msg = err.to_string();
        assert!(msg.contains("alpha"));
        assert!(msg.contains("disk on fire"));

        let err = LoadError::Timeout {
            name: "beta".into(),
            timeout: Duration::from_millis(50),
        };
        assert!(err.to_string().contains("beta"));
        assert!(err.to_string().contains("50ms"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_load_error_keeps_cause_as_source() {
        let err = LoadError::failed("alpha", "root cause".into());
        let source = err.source().expect("cause should be exposed");
        assert_eq!(source.to_string(), "root cause");
    }

    #[test]
    fn test_load_error_clone_shares_cause() {
        let err = LoadError::failed("alpha", "boom".into());
        let cloned = err.clone();
        match (err, cloned) {
            (LoadError::Failed { cause: a, .. }, LoadError::Failed { cause: b, .. }) => {
                assert!(Arc::ptr_eq(&a, &b));
            }
            other => panic!("Expected two Failed errors, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_error_exposes_member() {
        let err = BatchError {
            group: 2,
            source: LoadError::Aborted {
                name: "gamma".into(),
                reason: "cancelled".into(),
            },
        };
        assert_eq!(err.name(), "gamma");
        assert!(err.to_string().contains("group 2"));
        assert!(matches!(err.into_load_error(), LoadError::Aborted { .. }));
    }

    #[test]
    fn test_config_and_definition_error_display() {
        assert!(ConfigError::Parse("bad yaml".into()).to_string().contains("bad yaml"));
        let err = DefinitionError::UnknownDependency {
            plugin: "a".into(),
            dependency: "b".into(),
        };
        assert!(err.to_string().contains("'a'"));
        assert!(err.to_string().contains("'b'"));
        assert!(DefinitionError::Cycle("c".into()).to_string().contains("c"));
    }
}
