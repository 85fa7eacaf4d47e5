use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::types::CandidateLink;

/// One way of locating a page control, tried with its own attach budget.
#[derive(Debug, Clone, Copy)]
pub struct LocatorStrategy {
    /// Human-readable tag for logs and failure messages
    pub name: &'static str,
    /// CSS selector the strategy probes for
    pub css: &'static str,
}

/// Ordered upload-control strategies. The first selector that attaches wins;
/// the list tolerates the site swapping between a bare file input and one
/// carrying an accept filter.
pub const UPLOAD_CONTROL_STRATEGIES: &[LocatorStrategy] = &[
    LocatorStrategy {
        name: "file input",
        css: r#"input[type="file"]"#,
    },
    LocatorStrategy {
        name: "file input with accept filter",
        css: r#"input[type="file"][accept]"#,
    },
];

/// Attach budget granted to each locator strategy before the next is tried.
pub const ATTACH_BUDGET: Duration = Duration::from_secs(30);

/// The page capabilities the pipeline stages rely on. `Browser` implements
/// this against a live WebDriver session; tests implement it with scripted
/// fakes.
#[async_trait]
pub trait GenerationSite: Send + Sync {
    /// Navigate to the upload page, waiting only for the DOM-ready milestone
    /// (the target is a dynamic single-page application; network idle never
    /// arrives).
    async fn open(&self, url: &Url) -> Result<()>;

    /// Wait up to `budget` for `selector` to attach to the page.
    /// Returns false on budget expiry; errors only on session failure.
    async fn wait_attached(&self, selector: &str, budget: Duration) -> Result<bool>;

    /// Submit the image file to the attached upload control, triggering the
    /// site's own upload/generation workflow.
    async fn submit_image(&self, selector: &str, image: &Path) -> Result<()>;

    /// Scan every anchor currently on the page.
    async fn scan_links(&self) -> Result<Vec<CandidateLink>>;

    /// Click the first anchor whose href ends in `.{ext}` and persist the
    /// captured browser download to `dest`, overwriting any existing file.
    async fn capture_download(&self, ext: &str, dest: &Path) -> Result<()>;
}
