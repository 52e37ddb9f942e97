use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::gate::ActivationGate;
use super::traits::{FactoryLoader, FnLoader, LoadResult, PluginInstance};

/// Immutable descriptor of one loadable plugin.
///
/// `required` and `dependencies` are advisory: the loader carries them for
/// the caller but never enforces or orders by them.
#[derive(Clone)]
pub struct LoadDefinition {
    name: String,
    loader: Arc<dyn FactoryLoader>,
    options: Option<Value>,
    required: bool,
    dependencies: Vec<String>,
    when: Option<ActivationGate>,
}

impl LoadDefinition {
    pub fn new(name: impl Into<String>, loader: impl FactoryLoader + 'static) -> Self {
        Self::with_shared_loader(name, Arc::new(loader))
    }

    pub fn with_shared_loader(name: impl Into<String>, loader: Arc<dyn FactoryLoader>) -> Self {
        Self {
            name: name.into(),
            loader,
            options: None,
            required: false,
            dependencies: Vec::new(),
            when: None,
        }
    }

    pub fn from_fn<F, Fut>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        Self::new(name, FnLoader::new(loader))
    }

    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn when(mut self, gate: ActivationGate) -> Self {
        self.when = Some(gate);
        self
    }

    pub fn when_fn<F>(self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.when(ActivationGate::new(predicate))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn loader(&self) -> &Arc<dyn FactoryLoader> {
        &self.loader
    }

    pub fn option_value(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn gate(&self) -> Option<&ActivationGate> {
        self.when.as_ref()
    }
}

impl fmt::Debug for LoadDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadDefinition")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("required", &self.required)
            .field("dependencies", &self.dependencies)
            .field("gated", &self.when.is_some())
            .finish()
    }
}

/// A successfully loaded plugin, as held by the loader's cache.
#[derive(Clone)]
pub struct LoadedPlugin {
    pub name: String,
    pub instance: PluginInstance,
    pub load_time: Duration,
}

impl LoadedPlugin {
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.name)
            .field("load_time", &self.load_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_system::traits::PluginFactory;

    #[test]
    fn test_definition_builder() {
        let def = LoadDefinition::from_fn("eslint", || async { LoadResult::Ok(PluginFactory::value(1u8)) })
            .options(serde_json::json!({"fix": true}))
            .required(true)
            .depends_on(["typescript", "babel"])
            .when_fn(|| true);

        assert_eq!(def.name(), "eslint");
        assert!(def.is_required());
        assert_eq!(def.dependencies(), ["typescript", "babel"]);
        assert_eq!(def.option_value(), Some(&serde_json::json!({"fix": true})));
        assert!(def.gate().is_some());
    }

    #[test]
    fn test_definition_defaults() {
        let def = LoadDefinition::from_fn("bare", || async { LoadResult::Ok(PluginFactory::value(())) });
        assert!(!def.is_required());
        assert!(def.dependencies().is_empty());
        assert!(def.option_value().is_none());
        assert!(def.gate().is_none());
    }

    #[test]
    fn test_definition_debug_hides_loader() {
        let def = LoadDefinition::from_fn("dbg", || async { LoadResult::Ok(PluginFactory::value(())) });
        let rendered = format!("{:?}", def);
        assert!(rendered.contains("dbg"));
        assert!(rendered.contains("gated: false"));
    }

    #[test]
    fn test_loaded_plugin_downcast() {
        let plugin = LoadedPlugin {
            name: "p".into(),
            instance: Arc::new(String::from("hello")),
            load_time: Duration::from_millis(3),
        };
        assert_eq!(plugin.downcast::<String>().as_deref().map(String::as_str), Some("hello"));
        assert!(plugin.downcast::<u32>().is_none());
    }
}
