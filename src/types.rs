use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use url::Url;

/// Generation site the pipeline drives by default.
pub const DEFAULT_TARGET_URL: &str = "https://hitem3d.ai/";

/// Formats attempted when the caller does not specify any.
pub const DEFAULT_FORMATS: &[&str] = &["glb", "obj", "stl"];

/// Output format for CLI results
#[derive(Clone, Copy, Debug, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format for programmatic consumption
    Json,
    /// Human-readable simple format
    Simple,
}

/// One pipeline invocation, built once by the caller and immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRequest {
    /// Source image submitted to the generation site
    pub image_path: PathBuf,
    /// Directory artifacts are saved into (created if absent)
    pub output_dir: PathBuf,
    /// Normalized format preference order
    pub formats: Vec<String>,
    /// Overall generation-wait budget in minutes
    pub wait_minutes: u64,
    /// Run the browser without a visible window
    pub headless: bool,
    /// Page the upload control lives on
    #[serde(serialize_with = "serialize_url")]
    pub target_url: Url,
}

fn serialize_url<S: serde::Serializer>(url: &Url, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(url.as_str())
}

impl PipelineRequest {
    /// Validate and normalize the caller's inputs.
    ///
    /// The image must already exist; formats are lowercased, deduplicated
    /// preserving first occurrence, and blank tokens dropped. An empty
    /// format list falls back to [`DEFAULT_FORMATS`].
    pub fn new(
        image_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        formats: &[String],
        wait_minutes: u64,
        headless: bool,
    ) -> Result<Self> {
        let image_path = image_path.into();
        if !image_path.is_file() {
            anyhow::bail!("Image file does not exist: {}", image_path.display());
        }
        if wait_minutes == 0 {
            anyhow::bail!("Wait budget must be at least one minute");
        }

        let mut normalized = normalize_formats(formats);
        if normalized.is_empty() {
            normalized = DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect();
        }

        Ok(PipelineRequest {
            image_path,
            output_dir: output_dir.into(),
            formats: normalized,
            wait_minutes,
            headless,
            target_url: Url::parse(DEFAULT_TARGET_URL)?,
        })
    }

    /// Point the pipeline at a different page (staging and test fixtures).
    pub fn with_target_url(mut self, url: Url) -> Self {
        self.target_url = url;
        self
    }
}

/// Lowercase, trim, drop blanks, and deduplicate preserving first occurrence.
pub fn normalize_formats(raw: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for token in raw {
        let token = token.trim().to_lowercase();
        if token.is_empty() || seen.contains(&token) {
            continue;
        }
        seen.push(token);
    }
    seen
}

/// Split a comma-separated format list as passed on the command line.
pub fn parse_format_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.to_string()).collect()
}

/// An anchor scraped from the generation page, re-scanned on every poll tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateLink {
    /// Absolute URL the anchor points at
    #[serde(default)]
    pub href: String,
    /// Visible anchor text
    #[serde(default)]
    pub text: String,
}

impl CandidateLink {
    /// Case-insensitive `.{ext}` suffix test against the href.
    pub fn matches_format(&self, ext: &str) -> bool {
        self.href
            .to_lowercase()
            .ends_with(&format!(".{}", ext.to_lowercase()))
    }

    /// True if the href ends in any of the given extensions.
    pub fn matches_any(&self, formats: &[String]) -> bool {
        formats.iter().any(|ext| self.matches_format(ext))
    }
}

/// Outcome of one per-format download attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    /// Format extension that was attempted
    pub format: String,
    /// Where the artifact was (or would have been) saved
    pub saved_path: PathBuf,
    /// Whether the file landed on disk
    pub succeeded: bool,
    /// Failure description for unsuccessful attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn ok(format: &str, saved_path: &Path) -> Self {
        DownloadResult {
            format: format.to_string(),
            saved_path: saved_path.to_path_buf(),
            succeeded: true,
            error: None,
        }
    }

    pub fn failed(format: &str, saved_path: &Path, error: impl ToString) -> Self {
        DownloadResult {
            format: format.to_string(),
            saved_path: saved_path.to_path_buf(),
            succeeded: false,
            error: Some(error.to_string()),
        }
    }
}

/// The value a pipeline run always returns to its caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineOutcome {
    /// Successfully saved artifacts, in attempted-format order
    pub downloaded_paths: Vec<PathBuf>,
    /// True when the wait stage never saw a matching link before its deadline
    pub timed_out: bool,
}

impl PipelineOutcome {
    /// Outcome for a run whose wait deadline elapsed with no candidate link.
    pub fn deadline_elapsed() -> Self {
        PipelineOutcome {
            downloaded_paths: Vec::new(),
            timed_out: true,
        }
    }

    /// Outcome built from the download stage's per-format results.
    pub fn from_downloads(results: &[DownloadResult]) -> Self {
        PipelineOutcome {
            downloaded_paths: results
                .iter()
                .filter(|r| r.succeeded)
                .map(|r| r.saved_path.clone())
                .collect(),
            timed_out: false,
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
