use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GenerationError;

use super::policy::RetryPolicy;

/// Observer invoked before each backoff wait with the 1-based number of the
/// upcoming attempt and the error that triggered it.
pub type OnRetry<'a> = &'a (dyn Fn(u32, &GenerationError) + Send + Sync);

/// No-op retry observer.
pub fn ignore_retries(_attempt: u32, _error: &GenerationError) {}

/// Injectable delay used between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// `base * 2^attempt_index`, saturating at `Duration::MAX`.
pub fn backoff_delay(base: Duration, attempt_index: u32) -> Duration {
    2u32.checked_pow(attempt_index)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

/// Bookkeeping for a single execution; never outlives it.
#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
    last_error: Option<GenerationError>,
    elapsed_backoff: Duration,
}

/// Run `operation` under `policy`.
///
/// Each attempt is raced against the policy timeout; the losing future is
/// dropped, so a late result from an abandoned attempt is never observed.
/// Only `Server` and `Timeout` failures consume retry budget. Any other
/// failure is returned as-is after the attempt that produced it.
pub async fn execute_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    on_retry: OnRetry<'_>,
    mut operation: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut state = RetryState::default();

    loop {
        let result = match policy.timeout() {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(limit)),
            },
            None => operation().await,
        };

        let error = match result {
            Ok(value) => {
                tracing::debug!(
                    target: "castforge.retry",
                    stage = "retry.success",
                    operation = %label,
                    attempt = state.attempt,
                    backoff_ms = state.elapsed_backoff.as_millis() as u64
                );
                return Ok(value);
            }
            Err(error) => error,
        };

        tracing::warn!(
            target: "castforge.retry",
            stage = "retry.attempt_failed",
            operation = %label,
            attempt = state.attempt,
            kind = error.kind().as_str(),
            error = %error
        );

        if !error.is_retryable() {
            return Err(error);
        }

        if state.attempt >= policy.max_retries {
            let attempts = state.attempt + 1;
            tracing::error!(
                target: "castforge.retry",
                stage = "retry.exhausted",
                operation = %label,
                attempts
            );
            return Err(GenerationError::Exhausted {
                attempts,
                last: Box::new(error),
            });
        }

        let delay = backoff_delay(policy.backoff_base(), state.attempt);
        on_retry(state.attempt + 1, &error);
        tracing::info!(
            target: "castforge.retry",
            stage = "retry.scheduled",
            operation = %label,
            next_attempt = state.attempt + 1,
            delay_ms = delay.as_millis() as u64
        );

        state.last_error = Some(error);
        sleeper.sleep(delay).await;
        state.elapsed_backoff = state.elapsed_backoff.saturating_add(delay);
        state.attempt += 1;
    }
}

/// Retry executor bound to a sleeper, shared by every generation operation.
#[derive(Clone)]
pub struct RetryExecutor {
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(Arc::new(TokioSleeper))
    }
}

impl RetryExecutor {
    pub fn new(sleeper: Arc<dyn Sleeper>) -> Self {
        Self { sleeper }
    }

    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        policy: &RetryPolicy,
        on_retry: OnRetry<'_>,
        operation: F,
    ) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        execute_with_retry(label, policy, self.sleeper.as_ref(), on_retry, operation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn server_error() -> GenerationError {
        GenerationError::Server {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[test]
    fn backoff_is_base_times_power_of_two() {
        let base = Duration::from_millis(3_000);
        for attempt in 0..20u32 {
            assert_eq!(
                backoff_delay(base, attempt),
                Duration::from_millis(3_000 * (1u64 << attempt))
            );
        }
        assert_eq!(backoff_delay(Duration::ZERO, 7), Duration::ZERO);
        assert_eq!(backoff_delay(Duration::from_secs(1), 40), Duration::MAX);
    }

    #[tokio::test]
    async fn always_failing_operation_uses_every_attempt() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, None, 100);

        let result: Result<(), _> = execute_with_retry(
            "test",
            &policy,
            &sleeper,
            &ignore_retries,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(server_error()) }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(GenerationError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert_eq!(*last, server_error());
            }
            other => panic!("expected exhausted, got {other:?}"),
        }
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let retries = Mutex::new(Vec::new());
        let on_retry = |attempt: u32, _err: &GenerationError| retries.lock().unwrap().push(attempt);
        let policy = RetryPolicy::new(2, None, 10);

        let value = execute_with_retry("test", &policy, &sleeper, &on_retry, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*retries.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn zero_retries_still_wraps_in_exhausted() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::single_shot();
        let err = execute_with_retry("test", &policy, &sleeper, &ignore_retries, || async {
            Err::<(), _>(server_error())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, GenerationError::Exhausted { attempts: 1, .. }));
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn auth_and_parse_errors_are_terminal() {
        for terminal in [
            GenerationError::Auth {
                status: 401,
                message: "bad key".into(),
            },
            GenerationError::Parse("not json".into()),
        ] {
            let sleeper = RecordingSleeper::default();
            let calls = AtomicU32::new(0);
            let policy = RetryPolicy::new(3, None, 10);
            let expected = terminal.clone();
            let err = execute_with_retry("test", &policy, &sleeper, &ignore_retries, || {
                calls.fetch_add(1, Ordering::SeqCst);
                let e = terminal.clone();
                async move { Err::<(), _>(e) }
            })
            .await
            .unwrap_err();
            assert_eq!(err, expected);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(sleeper.delays.lock().unwrap().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out_and_is_retried() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(1, Some(1_000), 10);

        let value = execute_with_retry("test", &policy, &sleeper, &ignore_retries, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok("stale")
                } else {
                    Ok("fresh")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_exhaust_into_timeout_error() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::new(1, Some(50), 10);
        let err = execute_with_retry("test", &policy, &sleeper, &ignore_retries, || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, GenerationError>(())
        })
        .await
        .unwrap_err();
        match err {
            GenerationError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert_eq!(*last, GenerationError::Timeout(Duration::from_millis(50)));
            }
            other => panic!("expected exhausted, got {other:?}"),
        }
    }
}
