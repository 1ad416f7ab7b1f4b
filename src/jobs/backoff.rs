// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;
use std::time::Duration;

use crate::errors::ComputeError;

/// Retry schedule for calls to the compute service.
///
/// Delays grow geometrically from `initial_delay` by `multiplier`, capped at
/// `max_delay`. A call gives up after `max_attempts` attempts or once `timeout`
/// has elapsed, whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl BackoffPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(64) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        if !factor.is_finite() || self.initial_delay.as_secs_f64() * factor >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        self.initial_delay.mul_f64(factor)
    }
}

/// Why a retried call gave up.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryFailure {
    /// The service refused the request.
    Rejected(String),
    /// Attempts or time ran out on transient errors.
    Exhausted { attempts: u32, last_error: String },
}

/// Run `operation` until it succeeds, fails permanently, or the policy is exhausted.
pub async fn retry_with_backoff<T, F, Fut>(policy: &BackoffPolicy, mut operation: F) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ComputeError>>,
{
    let mut attempts = 0u32;
    let mut last_error = String::from("no attempt completed before timeout");

    let outcome = tokio::time::timeout(policy.timeout, async {
        loop {
            attempts += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(ComputeError::Rejected(reason)) => return Err(RetryFailure::Rejected(reason)),
                Err(ComputeError::Transient(reason)) => {
                    last_error = reason;
                    if attempts >= policy.max_attempts.max(1) {
                        return Err(RetryFailure::Exhausted {
                            attempts,
                            last_error: last_error.clone(),
                        });
                    }
                    tokio::time::sleep(policy.delay_for(attempts)).await;
                }
            }
        }
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_elapsed) => Err(RetryFailure::Exhausted { attempts, last_error }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
            max_attempts,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let p = policy(5);
        assert_eq!(p.delay_for(1), Duration::from_millis(1));
        assert_eq!(p.delay_for(2), Duration::from_millis(2));
        assert_eq!(p.delay_for(3), Duration::from_millis(4));
        assert_eq!(p.delay_for(9), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&policy(5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ComputeError::Transient("busy".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&policy(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ComputeError::Rejected("bad spec".into())) }
        })
        .await;
        assert_eq!(result, Err(RetryFailure::Rejected("bad spec".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_ceiling_reports_exhaustion() {
        let result: Result<(), _> =
            retry_with_backoff(&policy(3), || async { Err(ComputeError::Transient("down".into())) }).await;
        assert_eq!(
            result,
            Err(RetryFailure::Exhausted {
                attempts: 3,
                last_error: "down".into()
            })
        );
    }

    #[tokio::test]
    async fn test_overall_timeout_stops_retrying() {
        let mut p = policy(u32::MAX);
        p.timeout = Duration::from_millis(30);
        let result: Result<(), _> =
            retry_with_backoff(&p, || async { Err(ComputeError::Transient("down".into())) }).await;
        assert!(matches!(result, Err(RetryFailure::Exhausted { .. })));
    }
}
