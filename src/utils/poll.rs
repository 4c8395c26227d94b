// Fixed-delay polling for asynchronous upstream jobs

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }
}

/// Outcome of a bounded poll
#[derive(Debug, PartialEq)]
pub enum PollOutcome<T> {
    /// `is_done` accepted this value
    Done(T),
    /// Budget ran out; carries the last observed value
    Exhausted(Option<T>),
}

/// Call `check` until `is_done` accepts its value, sleeping `policy.interval`
/// between attempts and giving up after `policy.max_attempts` calls.
/// Errors from `check` end polling immediately.
pub async fn poll_until<F, Fut, T, E, P>(
    policy: PollPolicy,
    mut check: F,
    is_done: P,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let mut last = None;

    for attempt in 1..=policy.max_attempts {
        let value = check().await?;
        if is_done(&value) {
            return Ok(PollOutcome::Done(value));
        }
        debug!(attempt, max_attempts = policy.max_attempts, "Not done yet");
        last = Some(value);

        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }

    Ok(PollOutcome::Exhausted(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), max_attempts)
    }

    #[tokio::test]
    async fn test_stops_when_done() {
        let calls = AtomicU32::new(0);
        let outcome: Result<_, ()> = poll_until(
            fast(10),
            || async { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) },
            |n| *n == 3,
        )
        .await;

        assert_eq!(outcome, Ok(PollOutcome::Done(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let outcome: Result<_, ()> = poll_until(
            fast(4),
            || async { Ok(calls.fetch_add(1, Ordering::SeqCst)) },
            |_| false,
        )
        .await;

        assert_eq!(outcome, Ok(PollOutcome::Exhausted(Some(3))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_error_aborts() {
        let calls = AtomicU32::new(0);
        let outcome: Result<PollOutcome<u32>, &str> = poll_until(
            fast(5),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("boom")
            },
            |_| true,
        )
        .await;

        assert_eq!(outcome, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_never_calls() {
        let calls = AtomicU32::new(0);
        let outcome: Result<PollOutcome<u32>, ()> = poll_until(
            fast(0),
            || async { Ok(calls.fetch_add(1, Ordering::SeqCst)) },
            |_| true,
        )
        .await;

        assert_eq!(outcome, Ok(PollOutcome::Exhausted(None)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
