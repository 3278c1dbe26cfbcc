//! Fixed-delay retry for transient backend failures.

use std::future::Future;
use std::time::Duration;

use cloudstash_shared::StorageSettings;
use tracing::{error, warn};

use super::error::{StorageError, StorageResult};

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Default retries after the first attempt.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Default delay between attempts.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(10);

    /// Create a retry policy.
    #[must_use]
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Retry policy configured by the storage settings.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.request_retries, settings.retry_delay())
    }

    /// Maximum number of attempts, the first one included.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only errors for which [`StorageError::is_transient`] holds are
    /// retried. When attempts run out the last error is wrapped in
    /// [`StorageError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= self.max_attempts() => {
                    error!(operation, attempts = attempt, error = %err, "giving up after transient failures");
                    return Err(StorageError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(operation, attempt, error = %err, "transient failure, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay, Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_from_settings() {
        let settings = StorageSettings::new("assets").with_retries(5, 25);
        let policy = RetryPolicy::from_settings(&settings);
        assert_eq!(policy, RetryPolicy::new(5, Duration::from_millis(25)));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast_policy(3)
            .run("public_url", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(StorageError::http(503, "busy"))
                } else {
                    Ok("http://cdn.example.com/c/a.png")
                }
            })
            .await;

        assert_eq!(result.expect("should succeed"), "http://cdn.example.com/c/a.png");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = fast_policy(3)
            .run("public_url", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StorageError::Transport("reset".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(matches!(err, StorageError::RetriesExhausted { attempts: 4, .. }));
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = fast_policy(3)
            .run("public_url", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StorageError::http(403, "forbidden"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, StorageError::Http { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_zero_retries_makes_single_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let err = fast_policy(0)
            .run("public_url", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StorageError::http(500, "boom"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.attempts(), 1);
    }
}
