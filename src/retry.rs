//! Bounded retry with exponential backoff and jitter around a source adapter.
//!
//! [`RetryFetch`] wraps any [`SourceFetch`] and turns its per-attempt
//! [`FetchError`]s into a single per-source [`SourceError`] verdict.
//!
//! # Retry Strategy
//!
//! - At most [`RetryPolicy::max_attempts`] attempts (3 by default)
//! - Backoff before retry `n` is `base_delay * 2^(n-1)`: 2s, then 4s
//! - Random jitter (0-250ms by default) added to each backoff
//! - Only transient failures are retried; parse failures and non-retryable
//!   HTTP statuses end the loop immediately
//! - A successful fetch that yields zero items counts as a parse failure

use crate::error::{FetchError, SourceError};
use crate::models::Item;
use crate::scrapers::SourceFetch;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Backoff parameters shared by every source in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: usize,
    /// Delay before the first retry; doubles with each further retry.
    pub base_delay: Duration,
    /// Upper bound of the uniform random jitter added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based), without jitter.
    pub fn delay_for(&self, retry: usize) -> Duration {
        let exp = retry.saturating_sub(1).min(16) as u32;
        self.base_delay.saturating_mul(1u32 << exp)
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..=max_ms))
    }
}

/// Run-wide cancellation signal.
///
/// Checked before every attempt, and raced against each in-flight attempt
/// and backoff sleep so a cancelled run stops waiting immediately.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(CancellationToken);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once [`CancelFlag::cancel`] has been called.
    pub async fn cancelled(&self) {
        self.0.cancelled().await
    }
}

/// Decorator that adds bounded retries to a [`SourceFetch`].
pub struct RetryFetch<T> {
    inner: T,
    policy: RetryPolicy,
    cancel: CancelFlag,
}

impl<T> RetryFetch<T>
where
    T: SourceFetch,
{
    pub fn new(inner: T, policy: RetryPolicy, cancel: CancelFlag) -> Self {
        Self {
            inner,
            policy,
            cancel,
        }
    }

    /// Fetch with retries, yielding either a non-empty item list or the
    /// source's failure verdict.
    #[instrument(level = "info", skip_all, fields(source = %self.inner.id()))]
    pub async fn fetch(&self) -> Result<Vec<Item>, SourceError> {
        let source_id = self.inner.id();
        let max = self.policy.max_attempts.max(1);
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                warn!(attempt, "Run cancelled; not attempting source");
                return Err(SourceError::Cancelled { source_id });
            }

            attempt += 1;
            let attempt_t0 = Instant::now();
            let outcome = tokio::select! {
                res = self.inner.fetch() => res,
                _ = self.cancel.cancelled() => {
                    warn!(attempt, "Run cancelled; abandoning in-flight request");
                    return Err(SourceError::Cancelled { source_id });
                }
            };
            let err = match outcome {
                Ok(items) if !items.is_empty() => {
                    info!(
                        attempt,
                        count = items.len(),
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        "Source fetched"
                    );
                    return Ok(items);
                }
                Ok(_) => FetchError::Parse("no items".to_string()),
                Err(e) => e,
            };
            let elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64;

            if !err.is_transient() {
                error!(attempt, elapsed_ms_attempt, error = %err, "Source failed; not retryable");
                return Err(match err {
                    FetchError::Parse(reason) => SourceError::Parse { source_id, reason },
                    other => SourceError::Unavailable {
                        source_id,
                        attempts: attempt,
                        reason: other.to_string(),
                    },
                });
            }

            if attempt >= max {
                error!(
                    attempt,
                    max,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %err,
                    "Source exhausted retries"
                );
                return Err(SourceError::Unavailable {
                    source_id,
                    attempts: attempt,
                    reason: err.to_string(),
                });
            }

            let delay = self.policy.delay_for(attempt) + self.policy.jitter();
            warn!(
                attempt,
                max,
                elapsed_ms_attempt,
                ?delay,
                error = %err,
                "Source attempt failed; backing off"
            );
            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.cancel.cancelled() => {
                    warn!(attempt, "Run cancelled during backoff");
                    return Err(SourceError::Cancelled { source_id });
                }
            }
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("policy", &self.policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceId;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    struct Scripted {
        calls: AtomicUsize,
        outcome: fn(usize) -> Result<Vec<Item>, FetchError>,
    }

    impl Scripted {
        fn new(outcome: fn(usize) -> Result<Vec<Item>, FetchError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SourceFetch for Scripted {
        fn id(&self) -> SourceId {
            SourceId::Arxiv
        }

        async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)(n)
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
        }
    }

    fn one_item() -> Vec<Item> {
        vec![
            Item::new(
                "Paper",
                "Abstract",
                "https://arxiv.org/abs/1",
                Utc::now(),
                SourceId::Arxiv,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_default_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_always_transient_stops_at_max_attempts() {
        let source = Scripted::new(|_| Err(FetchError::Timeout { url: "u".into() }));
        let retry = RetryFetch::new(&source, fast_policy(), CancelFlag::new());
        let err = retry.fetch().await.unwrap_err();
        assert_eq!(source.calls(), 3);
        assert!(matches!(err, SourceError::Unavailable { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_parse_failure_not_retried() {
        let source = Scripted::new(|_| Err(FetchError::Parse("markup changed".into())));
        let retry = RetryFetch::new(&source, fast_policy(), CancelFlag::new());
        let err = retry.fetch().await.unwrap_err();
        assert_eq!(source.calls(), 1);
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let source = Scripted::new(|_| {
            Err(FetchError::Status {
                status: 404,
                url: "u".into(),
            })
        });
        let retry = RetryFetch::new(&source, fast_policy(), CancelFlag::new());
        let err = retry.fetch().await.unwrap_err();
        assert_eq!(source.calls(), 1);
        assert!(matches!(err, SourceError::Unavailable { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let source = Scripted::new(|n| {
            if n == 0 {
                Err(FetchError::Status {
                    status: 503,
                    url: "u".into(),
                })
            } else {
                Ok(one_item())
            }
        });
        let retry = RetryFetch::new(&source, fast_policy(), CancelFlag::new());
        let items = retry.fetch().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_parse_failure() {
        let source = Scripted::new(|_| Ok(Vec::new()));
        let retry = RetryFetch::new(&source, fast_policy(), CancelFlag::new());
        let err = retry.fetch().await.unwrap_err();
        assert_eq!(source.calls(), 1);
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let source = Scripted::new(|_| Ok(one_item()));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let retry = RetryFetch::new(&source, fast_policy(), cancel);
        let err = retry.fetch().await.unwrap_err();
        assert_eq!(source.calls(), 0);
        assert!(matches!(err, SourceError::Cancelled { .. }));
    }

    struct Hanging;

    impl SourceFetch for Hanging {
        fn id(&self) -> SourceId {
            SourceId::Reddit
        }

        async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let source = Scripted::new(|_| Err(FetchError::Timeout { url: "u".into() }));
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(60),
            max_jitter: Duration::ZERO,
        };
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let retry = RetryFetch::new(&source, policy, cancel);
        let err = timeout(Duration::from_secs(5), retry.fetch())
            .await
            .expect("backoff was not interrupted")
            .unwrap_err();
        assert!(matches!(err, SourceError::Cancelled { .. }));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_abandons_in_flight_attempt() {
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let retry = RetryFetch::new(Hanging, fast_policy(), cancel);
        let err = timeout(Duration::from_secs(5), retry.fetch())
            .await
            .expect("in-flight attempt was not abandoned")
            .unwrap_err();
        assert!(matches!(err, SourceError::Cancelled { source_id: SourceId::Reddit }));
    }
}
