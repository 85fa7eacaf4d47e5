use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};
use url::Url;

use crate::site::{ATTACH_BUDGET, GenerationSite, UPLOAD_CONTROL_STRATEGIES};

/// Navigate to the target page and submit the source image to the first
/// upload control that attaches.
///
/// Strategies are probed in order, each with its own attach budget; the site
/// renders the control lazily so a miss on one selector is not conclusive
/// until the whole list is exhausted. Submitting triggers the site's own
/// upload/generation workflow, which is opaque from here on.
pub async fn run(site: &dyn GenerationSite, target: &Url, image: &Path) -> Result<()> {
    site.open(target).await?;

    info!("Looking for upload control ...");
    for strategy in UPLOAD_CONTROL_STRATEGIES {
        if site.wait_attached(strategy.css, ATTACH_BUDGET).await? {
            debug!("Attached via {} strategy", strategy.name);
            site.submit_image(strategy.css, image).await?;
            return Ok(());
        }
        debug!("{} never attached, trying next strategy", strategy.name);
    }

    anyhow::bail!(
        "No upload control attached on {}; run with --no-headless to inspect the page",
        target
    )
}
