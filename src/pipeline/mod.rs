//! The generation pipeline: upload an image, wait for the remote service to
//! produce a model, download the artifacts in preference order.

pub mod download;
pub mod upload;
pub mod wait;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::site::GenerationSite;
use crate::types::{PipelineOutcome, PipelineRequest};
use crate::webdriver::{Browser, BrowserType};

pub use wait::WaitResult;

/// Run one full pipeline invocation against a fresh browser session.
///
/// The session is closed on every exit path before the outcome (or error)
/// reaches the caller; stage failures never leak the browser process.
pub async fn run(request: &PipelineRequest, browser_type: BrowserType) -> Result<PipelineOutcome> {
    std::fs::create_dir_all(&request.output_dir).context(format!(
        "Failed to create output directory {}",
        request.output_dir.display()
    ))?;

    let browser = Browser::new(browser_type, request.headless).await?;
    let result = run_stages(&browser, request).await;
    if let Err(e) = browser.close().await {
        warn!("Browser session close failed: {:#}", e);
    }
    result
}

/// Sequence the stages against an already-open site session.
pub async fn run_stages(
    site: &dyn GenerationSite,
    request: &PipelineRequest,
) -> Result<PipelineOutcome> {
    upload::run(site, &request.target_url, &request.image_path).await?;

    let budget = Duration::from_secs(request.wait_minutes * 60);
    let waited = wait::run(site, &request.formats, budget).await?;
    if !waited.found {
        return Ok(PipelineOutcome::deadline_elapsed());
    }

    let results = download::run(site, &request.formats, &request.output_dir).await?;
    let outcome = PipelineOutcome::from_downloads(&results);
    info!(
        "Pipeline finished with {} artifact(s)",
        outcome.downloaded_paths.len()
    );
    Ok(outcome)
}

#[cfg(test)]
#[path = "../pipeline_test.rs"]
mod pipeline_test;
