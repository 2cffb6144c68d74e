//! Optional retry wrapper around the lifecycle executor.
//!
//! When a rate limit was detected on the agent's stderr, the wait is
//! derived from the reported reset time; otherwise a linear backoff
//! applies. Note: retry currently fires on any error, not only on
//! rate-limit hits (see DESIGN.md).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::LifecycleExecutor;
use crate::agent::rate_limit::RateLimitState;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub enabled: bool,
    pub max_retries: u32,
    /// Multiplied by the attempt number for the fallback backoff.
    pub backoff_unit: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 3,
            backoff_unit: Duration::from_secs(30),
        }
    }
}

pub struct RetryingExecutor {
    executor: Arc<LifecycleExecutor>,
    rate_limit: Arc<RateLimitState>,
    options: RetryOptions,
}

impl RetryingExecutor {
    pub fn new(
        executor: Arc<LifecycleExecutor>,
        rate_limit: Arc<RateLimitState>,
        options: RetryOptions,
    ) -> Self {
        Self {
            executor,
            rate_limit,
            options,
        }
    }

    pub fn executor(&self) -> &Arc<LifecycleExecutor> {
        &self.executor
    }

    pub async fn execute(&self, cancel: &CancellationToken, story_key: &str) -> Result<()> {
        if !self.options.enabled {
            return self.executor.execute(cancel, story_key).await;
        }

        let mut retries = 0u32;
        loop {
            let err = match self.executor.execute(cancel, story_key).await {
                Ok(()) => return Ok(()),
                // Retrying a complete story or a cancelled run can
                // never change the outcome.
                Err(err) if matches!(err, Error::AlreadyComplete(_) | Error::Cancelled) => {
                    return Err(err)
                }
                Err(err) => err,
            };

            retries += 1;
            if retries > self.options.max_retries {
                return Err(Error::RetriesExhausted {
                    story_key: story_key.to_string(),
                    attempts: self.options.max_retries,
                    reason: err.to_string(),
                });
            }

            let rate_limit_wait = self.rate_limit.wait_time();
            let wait = if rate_limit_wait > Duration::ZERO {
                rate_limit_wait
            } else {
                self.options.backoff_unit * retries
            };
            warn!(
                %story_key,
                attempt = retries,
                max = self.options.max_retries,
                ?wait,
                error = %err,
                "retrying story after failure"
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return Err(Error::Cancelled),
            }
        }
    }
}
