use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};
use tripgraph_core::config::RetryConfig;
use tripgraph_core::error::Classify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Retry errors classified as permanent too, instead of stopping on them.
    pub retry_all_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(10))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.delay()).retry_all_errors(config.retry_all_errors)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("attempt {attempt} failed with a non-retryable error: {error}")]
    Fatal { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Fatal { attempt, .. } => *attempt,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal { error, .. } => error,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            retry_all_errors: false,
        }
    }

    pub fn retry_all_errors(mut self, enabled: bool) -> Self {
        self.retry_all_errors = enabled;
        self
    }

    /// Runs `operation` until it succeeds, fails with a permanent error, or
    /// uses up `max_attempts`. The attempt number passed in starts at 1.
    /// There is no pause after the last attempt.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, "Succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    warn!(
                        attempt,
                        max_attempts,
                        code = %error.error_code(),
                        "(attempt {}/{}) {}",
                        attempt,
                        max_attempts,
                        error
                    );
                    if !self.retry_all_errors && !error.is_retryable() {
                        return Err(RetryError::Fatal { attempt, error });
                    }
                    if attempt >= max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: error,
                        });
                    }
                    sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
