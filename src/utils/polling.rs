//! Waiting on conditions with a timeout
use std::future::Future;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};

/// Timeout, retry interval, and a description of what is being waited on.
pub struct PollingConfig {
    timeout: Duration,
    interval: Duration,
    what: String,
}

impl PollingConfig {
    pub fn new(timeout: Duration, interval: Duration, what: impl Into<String>) -> Self {
        Self {
            timeout,
            interval,
            what: what.into(),
        }
    }

    /// Poll until the condition yields a value or the timeout elapses.
    ///
    /// The condition returns `Ok(Some(T))` when satisfied, `Ok(None)` to keep
    /// waiting, and `Err` to abort immediately.
    pub async fn poll<F, Fut, T>(&self, condition: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        debug!("waiting for {}", self.what);
        let start = Instant::now();

        loop {
            if let Some(value) = condition().await? {
                debug!("{} after {:?}", self.what, start.elapsed());
                return Ok(value);
            }

            if start.elapsed() > self.timeout {
                return Err(Error::Timeout {
                    what: self.what.clone(),
                    timeout: self.timeout,
                });
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    /// Poll until the condition returns `Ok(true)` or the timeout elapses.
    pub async fn poll_until<F, Fut>(&self, condition: F) -> Result<()>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.poll(|| async {
            match condition().await {
                Ok(true) => Ok(Some(())),
                Ok(false) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
    }
}
