use async_trait::async_trait;
use std::future::Future;
use tokio::time::Duration;

use crate::errors::AppResult;

const RATE_LIMITED_STATUS: u16 = 429;

/// Result of a single request against the Discord API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    Success(T),
    RateLimited,
    /// `status` is `None` when no response came back (timeout, refused connection, local read error)
    Failed { status: Option<u16>, reason: String },
}

impl<T> CallOutcome<T> {
    /// Classify a non-success HTTP status
    pub fn from_error_status(status: u16, reason: impl Into<String>) -> Self {
        if status == RATE_LIMITED_STATUS {
            CallOutcome::RateLimited
        } else {
            CallOutcome::Failed {
                status: Some(status),
                reason: reason.into(),
            }
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        CallOutcome::Failed {
            status: None,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            CallOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CallOutcome<U> {
        match self {
            CallOutcome::Success(value) => CallOutcome::Success(f(value)),
            CallOutcome::RateLimited => CallOutcome::RateLimited,
            CallOutcome::Failed { status, reason } => CallOutcome::Failed { status, reason },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CallOutcome::Success(_) => "success".to_string(),
            CallOutcome::RateLimited => "rate limited".to_string(),
            CallOutcome::Failed {
                status: Some(status),
                reason,
            } => format!("HTTP {}: {}", status, reason),
            CallOutcome::Failed {
                status: None,
                reason,
            } => format!("no response: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub rate_limit_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            rate_limit_cooldown: Duration::from_secs(120),
        }
    }
}

/// Suspension point for every deliberate wait in the upload pipeline
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `request` until it succeeds or the attempt budget is spent.
///
/// A rate-limited response waits out the cooldown and counts as an attempt,
/// any other failure waits the fixed retry delay. When the budget runs out the
/// last outcome is handed back as-is. An `Err` from `request` means the request
/// could not even be built and is returned immediately.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut request: F,
) -> AppResult<CallOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<CallOutcome<T>>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = request().await?;
        let attempts_left = attempt < max_attempts;

        match &outcome {
            CallOutcome::Success(_) => {
                if attempt > 1 {
                    log::info!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(outcome);
            }
            CallOutcome::RateLimited => {
                log::warn!(
                    "{}: rate limit reached on attempt {}/{}",
                    label,
                    attempt,
                    max_attempts
                );
                if attempts_left {
                    log::warn!(
                        "Waiting {:?} before retrying {}",
                        policy.rate_limit_cooldown,
                        label
                    );
                    sleeper.sleep(policy.rate_limit_cooldown).await;
                }
            }
            CallOutcome::Failed { .. } => {
                log::warn!(
                    "{}: attempt {}/{} failed: {}",
                    label,
                    attempt,
                    max_attempts,
                    outcome.describe()
                );
                if attempts_left {
                    sleeper.sleep(policy.retry_delay).await;
                }
            }
        }

        if !attempts_left {
            log::error!(
                "{} gave up after {} attempt(s): {}",
                label,
                attempt,
                outcome.describe()
            );
            return Ok(outcome);
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            CallOutcome::<()>::from_error_status(429, "slow down"),
            CallOutcome::RateLimited
        );
        assert_eq!(
            CallOutcome::<()>::from_error_status(503, "unavailable"),
            CallOutcome::Failed {
                status: Some(503),
                reason: "unavailable".to_string()
            }
        );
        assert_eq!(
            CallOutcome::<()>::transport("timed out").describe(),
            "no response: timed out"
        );
    }

    #[tokio::test]
    async fn test_constant_failure_uses_every_attempt() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let outcome = execute(&policy(3), &sleeper, "test", || {
            calls += 1;
            let n = calls;
            async move { Ok(CallOutcome::<()>::from_error_status(500, format!("boom {}", n))) }
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(
            outcome,
            CallOutcome::Failed {
                status: Some(500),
                reason: "boom 3".to_string()
            }
        );
        assert_eq!(
            *sleeper.waits.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_success_on_second_attempt_stops_retrying() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let outcome = execute(&policy(3), &sleeper, "test", || {
            calls += 1;
            let n = calls;
            async move {
                if n == 2 {
                    Ok(CallOutcome::Success("done"))
                } else {
                    Ok(CallOutcome::from_error_status(502, "bad gateway"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(outcome, CallOutcome::Success("done"));
        assert_eq!(sleeper.waits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_consumes_attempts() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let outcome = execute(&policy(2), &sleeper, "test", || {
            calls += 1;
            async { Ok(CallOutcome::<()>::RateLimited) }
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(outcome, CallOutcome::RateLimited);
        assert_eq!(
            *sleeper.waits.lock().unwrap(),
            vec![Duration::from_secs(120)]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let outcome = execute(&policy(3), &sleeper, "test", || {
            calls += 1;
            let n = calls;
            async move {
                if n == 1 {
                    Ok(CallOutcome::RateLimited)
                } else {
                    Ok(CallOutcome::Success(n))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome, CallOutcome::Success(2));
        assert_eq!(
            *sleeper.waits.lock().unwrap(),
            vec![Duration::from_secs(120)]
        );
    }

    #[tokio::test]
    async fn test_request_error_is_not_retried() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let result = execute(&policy(3), &sleeper, "test", || {
            calls += 1;
            async { Err::<CallOutcome<()>, _>(AppError::Internal("bad request".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(calls, 1);
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let outcome = execute(&policy(0), &sleeper, "test", || {
            calls += 1;
            async { Ok(CallOutcome::<()>::transport("refused")) }
        })
        .await
        .unwrap();

        assert_eq!(calls, 1);
        assert!(!outcome.is_success());
    }
}
