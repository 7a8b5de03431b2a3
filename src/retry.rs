//! Bounded retry policy with randomized backoff.

use crate::error::{LitReviewError, Result};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Default number of attempts per keyword
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff bounds in seconds (inclusive)
pub const DEFAULT_BACKOFF_SECS: (u64, u64) = (5, 15);

/// How many times a keyword fetch is attempted, and how long to wait between
/// attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Lower backoff bound in seconds
    pub backoff_min_secs: u64,
    /// Upper backoff bound in seconds (inclusive)
    pub backoff_max_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_min_secs: DEFAULT_BACKOFF_SECS.0,
            backoff_max_secs: DEFAULT_BACKOFF_SECS.1,
        }
    }
}

impl RetryPolicy {
    /// Reject policies that can never attempt or have an inverted range.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(LitReviewError::Config(
                "retry count must be at least 1".to_string(),
            ));
        }
        if self.backoff_min_secs > self.backoff_max_secs {
            return Err(LitReviewError::Config(format!(
                "backoff range is inverted: {}..={}",
                self.backoff_min_secs, self.backoff_max_secs
            )));
        }
        Ok(())
    }

    /// Draw a backoff uniformly from the configured range.
    pub fn next_backoff(&self) -> Duration {
        let lo = self.backoff_min_secs.min(self.backoff_max_secs);
        let hi = self.backoff_max_secs.max(self.backoff_min_secs);
        let secs = rand::thread_rng().gen_range(lo..=hi);
        Duration::from_secs(secs)
    }
}

/// Something that can pause the pipeline between attempts.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately; for tests and dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn wait(&self, duration: Duration) {
        debug!(skipped_secs = duration.as_secs(), "Backoff skipped");
    }
}
