use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::error::{BoxError, LoadError};

/// A loaded plugin value. Callers downcast to the concrete type.
pub type PluginInstance = Arc<dyn Any + Send + Sync>;

type FactoryFn = dyn Fn(Option<&Value>) -> Result<PluginInstance, BoxError> + Send + Sync;

/// What a loader produces: either the instance itself, or a factory that
/// builds the instance from the definition's options.
#[derive(Clone)]
pub enum PluginFactory {
    Value(PluginInstance),
    Invocable(Arc<FactoryFn>),
}

impl PluginFactory {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(Arc::new(value))
    }

    pub fn invocable<F, T>(factory: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<T, BoxError> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Self::Invocable(Arc::new(move |options| {
            factory(options).map(|instance| Arc::new(instance) as PluginInstance)
        }))
    }

    pub fn is_invocable(&self) -> bool {
        matches!(self, Self::Invocable(_))
    }

    /// Turns the factory into an instance, invoking it with `options` when
    /// it is invocable.
    pub(crate) fn resolve(
        self,
        name: &str,
        options: Option<&Value>,
    ) -> Result<PluginInstance, LoadError> {
        match self {
            Self::Value(instance) => Ok(instance),
            Self::Invocable(factory) => {
                factory(options).map_err(|cause| LoadError::failed(name, cause))
            }
        }
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("PluginFactory::Value(..)"),
            Self::Invocable(_) => f.write_str("PluginFactory::Invocable(..)"),
        }
    }
}

/// Outcome of a [`FactoryLoader`].
pub type LoadResult = Result<PluginFactory, BoxError>;

/// Produces the raw factory for one definition.
#[async_trait]
pub trait FactoryLoader: Send + Sync {
    async fn load(&self) -> LoadResult;
}

/// Adapts an async closure into a [`FactoryLoader`].
pub struct FnLoader<F>(F);

impl<F> FnLoader<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> FactoryLoader for FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = LoadResult> + Send,
{
    async fn load(&self) -> LoadResult {
        (self.0)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_factory_resolves_to_itself() {
        let factory = PluginFactory::value(42u32);
        assert!(!factory.is_invocable());
        let instance = factory.resolve("answer", None).unwrap();
        assert_eq!(instance.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn test_invocable_factory_receives_options() {
        let factory = PluginFactory::invocable(|options| {
            let level = options
                .and_then(|o| o.get("level"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Ok(format!("level-{}", level))
        });
        assert!(factory.is_invocable());

        let options = serde_json::json!({"level": 3});
        let instance = factory.resolve("minify", Some(&options)).unwrap();
        assert_eq!(instance.downcast_ref::<String>().map(String::as_str), Some("level-3"));
    }

    #[test]
    fn test_invocable_factory_without_options() {
        let factory = PluginFactory::invocable(|options| Ok(options.is_none()));
        let instance = factory.resolve("bare", None).unwrap();
        assert_eq!(instance.downcast_ref::<bool>(), Some(&true));
    }

    #[test]
    fn test_invocable_factory_error_becomes_load_error() {
        let factory = PluginFactory::invocable::<_, ()>(|_| Err("bad options".into()));
        let err = factory.resolve("strict", None).unwrap_err();
        assert_eq!(err.name(), "strict");
        assert!(err.to_string().contains("bad options"));
    }

    #[tokio::test]
    async fn test_fn_loader() {
        let loader = FnLoader::new(|| async { LoadResult::Ok(PluginFactory::value("ready")) });
        let factory = loader.load().await.unwrap();
        let instance = factory.resolve("fn", None).unwrap();
        assert_eq!(instance.downcast_ref::<&str>(), Some(&"ready"));
    }
}
