//! Time bounds and optional retry for external calls.

use crate::RegistryError;
use std::future::Future;
use std::time::Duration;

/// How many times to attempt an external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Delay before the second attempt; grows linearly with each retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `call` until it succeeds or attempts are exhausted, returning the
    /// last error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RegistryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RegistryError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    tracing::warn!(operation, attempt, error = %e, "retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1, Duration::from_millis(250))
    }
}

/// Await `fut`, failing with [`RegistryError::Timeout`] after `after`.
pub async fn with_timeout<T, Fut>(
    after: Duration,
    operation: impl Into<String>,
    fut: Fut,
) -> Result<T, RegistryError>
where
    Fut: Future<Output = Result<T, RegistryError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(RegistryError::Timeout {
            operation: operation.into(),
            after,
        }),
    }
}
