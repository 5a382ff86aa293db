// Retry logic with capped exponential backoff
use crate::application::worker::constants::{
    DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_RETRY_MAX_BACKOFF,
};
use crate::application::worker::ShutdownToken;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Terminal outcome of a retried operation
#[derive(Error, Debug)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    #[error("{description} failed after {attempts} attempt(s): {last_error}")]
    Exhausted {
        description: String,
        attempts: u32,
        #[source]
        last_error: E,
    },

    #[error("{description} cancelled after {attempts} attempt(s)")]
    Cancelled { description: String, attempts: u32 },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Number of times the operation was invoked
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Retry configuration
///
/// `max_attempts = 0` retries without bound; pair it with a shutdown token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub base_delay: Duration,
    pub max_attempts: u32,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            max_backoff: DEFAULT_RETRY_MAX_BACKOFF,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// Backoff formula:
    /// delay = min(base_delay * 2^(attempt - 1), max_backoff)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts != 0 && attempt >= self.max_attempts
    }
}

/// Runs fallible async operations with retry
pub struct RetryExecutor {
    config: RetryConfig,
    shutdown: Option<ShutdownToken>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            shutdown: None,
        }
    }

    /// Abort backoff waits when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: ShutdownToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Invoke `operation` until it succeeds, attempts run out, or shutdown is signalled
    ///
    /// Intermediate failures are logged, never surfaced.
    ///
    /// # Example
    /// ```text
    /// let executor = RetryExecutor::new(RetryConfig::default());
    /// let receipt = executor
    ///     .run("copy report.pdf", || transfer.transfer(&item))
    ///     .await?;
    /// ```
    pub async fn run<F, Fut, T, E>(&self, description: &str, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let mut attempt: u32 = 0;

        loop {
            if self.is_shutdown() {
                warn!(operation = %description, attempts = attempt, "Shutdown requested before attempt");
                return Err(RetryError::Cancelled {
                    description: description.to_string(),
                    attempts: attempt,
                });
            }

            attempt = attempt.saturating_add(1);

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            operation = %description,
                            failed_attempts = attempt - 1,
                            "Operation recovered after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if self.config.exhausted(attempt) => {
                    error!(
                        operation = %description,
                        attempts = attempt,
                        error = %e,
                        "Retry attempts exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        description: description.to_string(),
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.config.backoff_for(attempt);
                    warn!(
                        operation = %description,
                        attempt = attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying"
                    );

                    if !self.wait(delay).await {
                        warn!(operation = %description, attempts = attempt, "Retry cancelled during backoff");
                        return Err(RetryError::Cancelled {
                            description: description.to_string(),
                            attempts: attempt,
                        });
                    }
                }
            }
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.as_ref().is_some_and(ShutdownToken::is_shutdown)
    }

    /// Sleep for `delay`; returns false if shutdown interrupted the wait
    async fn wait(&self, delay: Duration) -> bool {
        match &self.shutdown {
            Some(token) => {
                let mut token = token.clone();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => true,
                    _ = token.wait() => false,
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }
}
