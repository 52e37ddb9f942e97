#![allow(dead_code)]

pub mod definition_builders;

use tokio::runtime::Runtime;

use xloader::{FakeTimeProvider, PluginLoader};

pub fn bench_loader(max_parallel: usize) -> PluginLoader {
    PluginLoader::builder()
        .max_parallel(max_parallel)
        .time_provider(std::sync::Arc::new(FakeTimeProvider::new()))
        .build()
        .expect("valid bench config")
}

pub fn bench_runtime() -> Runtime {
    Runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build runtime")
}
