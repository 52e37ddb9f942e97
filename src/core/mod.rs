pub mod runtime_context;

pub use runtime_context::{FakeTimeProvider, RealTimeProvider, SharedTimeProvider, TimeProvider};
