//! Exponential backoff retry plugin.

use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Error, RetryDecision};

use crate::context::Snapshot;
use crate::plugin::RetryPlugin;

/// Retry plugin re-attempting transient transport failures with
/// exponentially growing delays.
///
/// Retries connection and timeout errors only; build and decode errors
/// never reach the retry chain, and other transport failures
/// (cancellation, TLS, I/O) are treated as non-transient. The delay
/// doubles per honored retry, capped at the configured maximum.
///
/// # Example
///
/// ```ignore
/// let engine = ExecutionEngine::builder()
///     .plugin(PluginEntry::retry(Arc::new(
///         ExponentialBackoff::new(3).base_delay(Duration::from_millis(250)),
///     )))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    /// Create a backoff policy honoring at most `max_retries` retries,
    /// starting at 100 ms and capped at 10 s.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub const fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the delay ceiling.
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    fn delay_for(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    const fn is_transient(error: &Error) -> bool {
        error.is_connection() || error.is_timeout()
    }
}

#[async_trait]
impl RetryPlugin for ExponentialBackoff {
    async fn should_retry(&self, snapshot: &Snapshot, error: &Error) -> RetryDecision {
        if !Self::is_transient(error) {
            return RetryDecision::DoNotRetry;
        }
        if snapshot.retry_count() >= self.max_retries {
            return RetryDecision::DoNotRetry;
        }
        RetryDecision::RetryAfter(self.delay_for(snapshot.retry_count()))
    }
}

#[cfg(test)]
mod tests {
    use courier_core::RequestSpec;

    use super::*;
    use crate::context::RequestContext;

    fn snapshot_with_retries(count: u32) -> Snapshot {
        let context = RequestContext::new(RequestSpec::get("/test"));
        for _ in 0..count {
            context.increment_retry_count();
        }
        context.snapshot()
    }

    #[tokio::test]
    async fn delay_grows_per_retry() {
        let backoff = ExponentialBackoff::new(5);

        let first = backoff
            .should_retry(&snapshot_with_retries(0), &Error::Timeout)
            .await;
        assert_eq!(
            first,
            RetryDecision::RetryAfter(Duration::from_millis(100))
        );

        let third = backoff
            .should_retry(&snapshot_with_retries(2), &Error::Timeout)
            .await;
        assert_eq!(
            third,
            RetryDecision::RetryAfter(Duration::from_millis(400))
        );
    }

    #[tokio::test]
    async fn delay_is_capped() {
        let backoff = ExponentialBackoff::new(100).max_delay(Duration::from_secs(1));
        let decision = backoff
            .should_retry(&snapshot_with_retries(30), &Error::Timeout)
            .await;
        assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn respects_retry_budget() {
        let backoff = ExponentialBackoff::new(2);
        let decision = backoff
            .should_retry(&snapshot_with_retries(2), &Error::Timeout)
            .await;
        assert_eq!(decision, RetryDecision::DoNotRetry);
    }

    #[tokio::test]
    async fn ignores_non_transient_errors() {
        let backoff = ExponentialBackoff::new(3);
        let snapshot = snapshot_with_retries(0);

        let decision = backoff
            .should_retry(&snapshot, &Error::decode("$", "oops"))
            .await;
        assert_eq!(decision, RetryDecision::DoNotRetry);

        let decision = backoff.should_retry(&snapshot, &Error::Cancelled).await;
        assert_eq!(decision, RetryDecision::DoNotRetry);

        let decision = backoff
            .should_retry(&snapshot, &Error::connection("refused"))
            .await;
        assert!(decision.is_retry());
    }
}
