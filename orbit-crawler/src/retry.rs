use crate::error::{CrawlError, ProviderError, Result};
use crate::source::{AccountId, ConnectionStream};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Notified before every cooldown wait with the operation name, the error that
/// triggered it and the length of the wait.
pub type WaitFn<'a> = dyn Fn(&str, &ProviderError, Duration) + Send + Sync + 'a;

/// Fixed-cooldown retry for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub cooldown: Duration,
    /// Consecutive failed attempts allowed before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

/// Ids collected from one connection listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drained {
    pub ids: Vec<AccountId>,
    /// The listing ended early on a permanent error (private or missing account).
    pub forbidden: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl RetryPolicy {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Run a one-shot operation, waiting out transient errors.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        mut op: F,
        on_wait: &WaitFn<'_>,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
    {
        let mut failures = 0u32;
        loop {
            match op().await {
                Ok(value) => {
                    if failures > 0 {
                        debug!("{} succeeded after {} failed attempts", operation, failures);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    self.cool_down(operation, e, failures, on_wait).await?;
                }
                Err(e) => return Err(CrawlError::Provider(e)),
            }
        }
    }

    /// Consume a connection listing, keeping at most `cap` ids.
    ///
    /// Transient errors are waited out and the same stream is polled again, so
    /// consumption resumes where it stopped. A permanent error ends the listing
    /// early and keeps whatever was collected before it.
    pub async fn drain(
        &self,
        operation: &str,
        mut stream: ConnectionStream<'_>,
        cap: usize,
        on_wait: &WaitFn<'_>,
    ) -> Result<Drained> {
        let mut ids = Vec::new();
        let mut failures = 0u32;

        while ids.len() < cap {
            match stream.next().await {
                Some(Ok(id)) => {
                    failures = 0;
                    ids.push(id);
                }
                Some(Err(e)) if e.is_transient() => {
                    failures += 1;
                    self.cool_down(operation, e, failures, on_wait).await?;
                }
                Some(Err(e)) => {
                    debug!("{} stopped after {} ids: {}", operation, ids.len(), e);
                    return Ok(Drained {
                        ids,
                        forbidden: true,
                    });
                }
                None => break,
            }
        }

        Ok(Drained {
            ids,
            forbidden: false,
        })
    }

    async fn cool_down(
        &self,
        operation: &str,
        error: ProviderError,
        failures: u32,
        on_wait: &WaitFn<'_>,
    ) -> Result<()> {
        if let Some(max) = self.max_attempts
            && failures >= max
        {
            return Err(CrawlError::RetriesExhausted {
                operation: operation.to_string(),
                attempts: failures,
                last: error,
            });
        }

        warn!(
            "{} failed ({}), retrying in {}s",
            operation,
            error,
            self.cooldown.as_secs()
        );
        on_wait(operation, &error, self.cooldown);
        tokio::time::sleep(self.cooldown).await;
        Ok(())
    }
}
