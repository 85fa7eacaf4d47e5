use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{Instant, sleep};

/// Outcome of a bounded poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The predicate held before the deadline
    Satisfied,
    /// The deadline passed with the predicate never holding
    DeadlineElapsed,
}

impl PollStatus {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, PollStatus::Satisfied)
    }
}

/// Run `probe` at a fixed cadence until it returns true or `deadline` passes.
///
/// Pauses for `interval` before each probe, so a condition that is already
/// true is still observed one interval in. Probe errors propagate immediately;
/// deadline expiry is a normal result, not an error. The cadence is fixed,
/// never backed off.
pub async fn poll_until<F, Fut>(
    deadline: Instant,
    interval: Duration,
    mut probe: F,
) -> Result<PollStatus>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    while Instant::now() < deadline {
        sleep(interval).await;
        if probe().await? {
            return Ok(PollStatus::Satisfied);
        }
    }
    Ok(PollStatus::DeadlineElapsed)
}

/// Convenience wrapper for "within the next `budget`" polls.
pub async fn poll_for<F, Fut>(budget: Duration, interval: Duration, probe: F) -> Result<PollStatus>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    poll_until(Instant::now() + budget, interval, probe).await
}

#[cfg(test)]
#[path = "poll_test.rs"]
mod poll_test;
