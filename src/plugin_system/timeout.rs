use std::future::Future;
use std::time::Duration;

use super::error::{BoxError, LoadError};

/// Races one load against a deadline.
///
/// When the deadline wins, the load future is dropped inside the race, so
/// nothing it would have produced can reach the caller or the cache.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    timeout: Duration,
}

impl TimeoutGuard {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run<T, F>(&self, name: &str, load: F) -> Result<T, LoadError>
    where
        F: Future<Output = Result<T, BoxError>>,
    {
        match tokio::time::timeout(self.timeout, load).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(cause)) => Err(LoadError::failed(name, cause)),
            Err(_) => Err(LoadError::Timeout {
                name: name.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}
