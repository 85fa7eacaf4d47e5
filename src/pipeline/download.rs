use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::site::GenerationSite;
use crate::types::DownloadResult;

/// Attempt every preferred format in caller order, isolating failures.
///
/// A format with no matching anchor is skipped without a result (the site
/// simply does not offer it). A capture that fails is recorded and logged,
/// and the loop moves on: one broken download must not forfeit the others.
pub async fn run(
    site: &dyn GenerationSite,
    formats: &[String],
    output_dir: &Path,
) -> Result<Vec<DownloadResult>> {
    let mut results = Vec::new();
    let mut tried = HashSet::new();

    for ext in formats {
        let ext = ext.trim().to_lowercase();
        if ext.is_empty() || !tried.insert(ext.clone()) {
            continue;
        }

        let dest = artifact_path(output_dir, &ext);
        match attempt(site, &ext, &dest).await {
            Ok(true) => results.push(DownloadResult::ok(&ext, &dest)),
            Ok(false) => debug!("No .{} link offered, skipping", ext),
            Err(e) => {
                warn!("Download {} failed: {:#}", ext, e);
                results.push(DownloadResult::failed(&ext, &dest, format!("{:#}", e)));
            }
        }
    }

    Ok(results)
}

/// Fixed, predictable destination for one format's artifact.
pub fn artifact_path(output_dir: &Path, ext: &str) -> PathBuf {
    output_dir.join(format!("model.{}", ext))
}

async fn attempt(site: &dyn GenerationSite, ext: &str, dest: &Path) -> Result<bool> {
    let links = site.scan_links().await?;
    if !links.iter().any(|link| link.matches_format(ext)) {
        return Ok(false);
    }
    site.capture_download(ext, dest).await?;
    Ok(true)
}
