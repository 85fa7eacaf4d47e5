use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::poll::{self, PollStatus};
use crate::site::GenerationSite;

/// Fixed scan cadence. Generation completion time is unpredictable and the
/// page is cheap to re-scan, so no backoff.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What the wait stage observed before its deadline.
#[derive(Debug, Clone, Copy)]
pub struct WaitResult {
    /// At least one anchor matching a preferred format appeared
    pub found: bool,
}

/// Poll the page until a candidate download link for any preferred format
/// appears or `budget` elapses.
///
/// Deadline expiry is a reportable outcome, not an error: the caller decides
/// what an empty-handed run means.
pub async fn run(
    site: &dyn GenerationSite,
    formats: &[String],
    budget: Duration,
) -> Result<WaitResult> {
    info!("Waiting for generation and download links ...");
    let deadline = Instant::now() + budget;

    let status = poll::poll_until(deadline, POLL_INTERVAL, || async move {
        let links = site.scan_links().await?;
        Ok(links.iter().any(|link| link.matches_any(formats)))
    })
    .await?;

    if status == PollStatus::DeadlineElapsed {
        warn!("No download links appeared before timeout.");
    }
    Ok(WaitResult {
        found: status.is_satisfied(),
    })
}
