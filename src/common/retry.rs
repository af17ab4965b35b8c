// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry an async operation with linearly growing backoff (delay, 2*delay,
/// 3*delay, ...). `should_retry` inspects the error; anything it rejects
/// propagates immediately.
pub async fn retry_async<F, Fut, T, E, P>(
    mut op: F,
    attempts: usize,
    step: Duration,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts && should_retry(&e) => {
                sleep(step.saturating_mul(attempt as u32)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let counter = AtomicUsize::new(0);
        let res: Result<u32, ()> = retry_async(
            |_| {
                let current = counter.fetch_add(1, Ordering::Relaxed);
                async move { if current < 2 { Err(()) } else { Ok(7) } }
            },
            4,
            Duration::from_millis(1),
            |_| true,
        )
        .await;

        assert_eq!(res.unwrap(), 7);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_propagate_immediately() {
        let counter = AtomicUsize::new(0);
        let res: Result<u32, &str> = retry_async(
            |_| {
                counter.fetch_add(1, Ordering::Relaxed);
                async move { Err("fatal") }
            },
            4,
            Duration::from_millis(1),
            |e| *e != "fatal",
        )
        .await;

        assert!(res.is_err());
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn attempt_budget_is_respected() {
        let counter = AtomicUsize::new(0);
        let res: Result<u32, ()> = retry_async(
            |_| {
                counter.fetch_add(1, Ordering::Relaxed);
                async move { Err(()) }
            },
            3,
            Duration::from_millis(1),
            |_| true,
        )
        .await;

        assert!(res.is_err());
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }
}
