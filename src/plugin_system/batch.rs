//! Bounded batch loading.
//!
//! Definitions are split into consecutive groups of `max_parallel`. A group's
//! members load concurrently and the next group starts only once the whole
//! group has settled, so no more than `max_parallel` loads started by one
//! batch are ever pending at once.

use futures::future::{join_all, try_join_all};

use super::definition::LoadDefinition;
use super::error::{BatchError, LoadError};
use super::loader::PluginLoader;
use super::traits::PluginInstance;

/// A member that failed in a settle-all batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub group: usize,
    pub error: LoadError,
}

impl BatchFailure {
    pub fn name(&self) -> &str {
        self.error.name()
    }
}

/// Outcome of [`PluginLoader::load_all_settled`]. Each list keeps input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub loaded: Vec<(String, PluginInstance)>,
    pub failed: Vec<BatchFailure>,
    /// Definitions whose activation gate was closed.
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn instances(&self) -> Vec<PluginInstance> {
        self.loaded
            .iter()
            .map(|(_, instance)| instance.clone())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn first_error(&self) -> Option<&LoadError> {
        self.failed.first().map(|failure| &failure.error)
    }
}

impl PluginLoader {
    /// Loads every definition, failing fast.
    ///
    /// Gated definitions are left out of the result. The first member to fail
    /// aborts the batch: no further group starts, and entries already cached
    /// stay cached.
    pub async fn load_all(
        &self,
        definitions: &[LoadDefinition],
    ) -> Result<Vec<PluginInstance>, BatchError> {
        let mut instances = Vec::with_capacity(definitions.len());

        for (group, members) in definitions.chunks(self.config().max_parallel).enumerate() {
            tracing::debug!(group, size = members.len(), "loading batch group");
            let results = try_join_all(members.iter().map(|definition| self.load(definition)))
                .await
                .map_err(|source| {
                    tracing::warn!(
                        group,
                        plugin = %source.name(),
                        error = %source,
                        "batch aborted"
                    );
                    BatchError { group, source }
                })?;
            instances.extend(results.into_iter().flatten());
        }

        tracing::info!(
            requested = definitions.len(),
            loaded = instances.len(),
            "batch loaded"
        );
        Ok(instances)
    }

    /// Loads every definition, running all groups even when members fail.
    pub async fn load_all_settled(&self, definitions: &[LoadDefinition]) -> BatchReport {
        let mut report = BatchReport::default();

        for (group, members) in definitions.chunks(self.config().max_parallel).enumerate() {
            tracing::debug!(group, size = members.len(), "loading batch group");
            let outcomes = join_all(members.iter().map(|definition| self.load(definition))).await;
            for (definition, outcome) in members.iter().zip(outcomes) {
                let name = definition.name().to_string();
                match outcome {
                    Ok(Some(instance)) => report.loaded.push((name, instance)),
                    Ok(None) => report.skipped.push(name),
                    Err(error) => report.failed.push(BatchFailure { group, error }),
                }
            }
        }

        tracing::info!(
            requested = definitions.len(),
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "batch settled"
        );
        report
    }
}
