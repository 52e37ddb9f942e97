//! Activation predicates deciding whether a definition is loaded at all.
//!
//! A gate is evaluated on every [`load`](super::PluginLoader::load) call and
//! never cached, so it may reflect environment changes between calls.

use std::fmt;
use std::sync::Arc;

use super::definition::LoadDefinition;

type Predicate = dyn Fn() -> bool + Send + Sync;

/// Zero-argument predicate attached to a definition through `when`.
#[derive(Clone)]
pub struct ActivationGate(Arc<Predicate>);

impl ActivationGate {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn always() -> Self {
        Self::new(|| true)
    }

    pub fn never() -> Self {
        Self::new(|| false)
    }

    /// Open while the environment variable `key` is set.
    pub fn env_present(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move || std::env::var_os(&key).is_some())
    }

    /// Open while the environment variable `key` equals `expected`.
    pub fn env_equals(key: impl Into<String>, expected: impl Into<String>) -> Self {
        let key = key.into();
        let expected = expected.into();
        Self::new(move || std::env::var(&key).map_or(false, |value| value == expected))
    }

    pub fn not(self) -> Self {
        Self::new(move || !self.evaluate())
    }

    pub fn and(self, other: ActivationGate) -> Self {
        Self::new(move || self.evaluate() && other.evaluate())
    }

    pub fn or(self, other: ActivationGate) -> Self {
        Self::new(move || self.evaluate() || other.evaluate())
    }

    pub fn evaluate(&self) -> bool {
        (self.0)()
    }
}

impl fmt::Debug for ActivationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActivationGate(..)")
    }
}

/// A definition without a gate is always active.
pub fn is_active(definition: &LoadDefinition) -> bool {
    definition.gate().map_or(true, ActivationGate::evaluate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_system::traits::{LoadResult, PluginFactory};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn definition(name: &str) -> LoadDefinition {
        LoadDefinition::from_fn(name, || async { LoadResult::Ok(PluginFactory::value(())) })
    }

    #[test]
    fn test_ungated_definition_is_active() {
        assert!(is_active(&definition("plain")));
    }

    #[test]
    fn test_gate_is_reevaluated_each_time() {
        let flag = Arc::new(AtomicBool::new(true));
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = {
            let flag = flag.clone();
            let calls = calls.clone();
            ActivationGate::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                flag.load(Ordering::SeqCst)
            })
        };
        let def = definition("toggled").when(gate);

        assert!(is_active(&def));
        flag.store(false, Ordering::SeqCst);
        assert!(!is_active(&def));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_combinators() {
        assert!(ActivationGate::always().evaluate());
        assert!(!ActivationGate::never().evaluate());
        assert!(ActivationGate::never().not().evaluate());
        assert!(!ActivationGate::always().and(ActivationGate::never()).evaluate());
        assert!(ActivationGate::never().or(ActivationGate::always()).evaluate());
    }

    #[test]
    fn test_env_gates() {
        let key = "XLOADER_GATE_TEST_UNSET_VARIABLE";
        assert!(!ActivationGate::env_present(key).evaluate());
        assert!(!ActivationGate::env_equals(key, "1").evaluate());
        assert!(ActivationGate::env_present(key).not().evaluate());
    }
}
