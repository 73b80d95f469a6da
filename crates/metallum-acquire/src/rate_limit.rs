use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Where the rate limiter goes to wait. Swapped for a recording clock in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real waiting on the tokio timer; only the calling task is suspended.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Backoff policy for HTTP 429 responses.
///
/// A rate-limited request is retried at most once, after waiting for the
/// server's `Retry-After` (or `default_backoff` when the header is missing
/// or not a number of seconds), capped at `max_backoff`.
#[derive(Clone)]
pub struct RateLimiter {
    default_backoff: Duration,
    max_backoff: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BACKOFF, Self::DEFAULT_MAX_BACKOFF)
    }
}

impl RateLimiter {
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(300);

    pub fn new(default_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            default_backoff,
            max_backoff,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// How long to wait given the raw `Retry-After` header value.
    pub fn backoff_for(&self, retry_after: Option<&str>) -> Duration {
        retry_after
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_backoff)
            .min(self.max_backoff)
    }

    pub async fn wait(&self, duration: Duration) {
        self.clock.sleep(duration).await;
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("default_backoff", &self.default_backoff)
            .field("max_backoff", &self.max_backoff)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_uses_retry_after() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.backoff_for(Some("3")), Duration::from_secs(3));
        assert_eq!(limiter.backoff_for(Some(" 42 ")), Duration::from_secs(42));
    }

    #[test]
    fn test_backoff_defaults() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.backoff_for(None), Duration::from_secs(10));
        assert_eq!(
            limiter.backoff_for(Some("Wed, 21 Oct 2015 07:28:00 GMT")),
            Duration::from_secs(10)
        );
        assert_eq!(limiter.backoff_for(Some("-5")), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_ceiling() {
        let limiter = RateLimiter::new(Duration::from_secs(10), Duration::from_secs(60));
        assert_eq!(limiter.backoff_for(Some("3600")), Duration::from_secs(60));
    }
}
