use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use url::Url;

use crate::poll;
use crate::site::GenerationSite;
use crate::types::CandidateLink;
use crate::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;

/// Default timeout inherited by every wait-style page operation.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Cadence for attach and download-capture polls.
const PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// In-flight download suffixes that must settle before a capture counts.
const PARTIAL_SUFFIXES: &[&str] = &["part", "crdownload", "tmp"];

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Name of the WebDriver binary for this browser type.
    pub fn driver_command(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }
}

/// One browser session with download capture enabled.
///
/// Downloads are steered into a session-private temp directory by browser
/// preferences so they never open in-page; [`Browser::capture_download`]
/// diffs that directory around a click to pick up the saved file. The
/// directory is removed when the session is dropped.
pub struct Browser {
    pub(crate) client: Client,
    browser_type: BrowserType,
    capture_dir: TempDir,
    default_timeout: Duration,
}

impl Browser {
    /// Launch a browser session for one pipeline run.
    ///
    /// Runtime acquisition goes through the global driver manager, which
    /// installs the runtime and retries once if the launch fails for lack of
    /// one.
    pub async fn new(browser_type: BrowserType, headless: bool) -> Result<Self> {
        info!("Connecting to {:?} WebDriver", browser_type);

        let webdriver_url = GLOBAL_WEBDRIVER_MANAGER.ensure_runtime(&browser_type).await?;

        let capture_dir = tempfile::Builder::new()
            .prefix("meshgrab-downloads-")
            .tempdir()
            .context("Failed to create download capture directory")?;

        let caps = build_capabilities(&browser_type, headless, capture_dir.path());

        debug!("Connecting to WebDriver at {}", webdriver_url);
        let client = match ClientBuilder::rustls()
            .capabilities(caps.clone())
            .connect(&webdriver_url)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("session not created")
                    || error_str.contains("Session is already started")
                {
                    // Driver is in a bad state; restart it and connect once more
                    info!("WebDriver appears to be in a bad state, restarting it ...");
                    GLOBAL_WEBDRIVER_MANAGER.stop_all();
                    let new_url = GLOBAL_WEBDRIVER_MANAGER
                        .ensure_driver(&browser_type)
                        .await
                        .context("Failed to restart WebDriver after bad session")?;
                    ClientBuilder::rustls()
                        .capabilities(caps)
                        .connect(&new_url)
                        .await
                        .context("Failed to connect to WebDriver after restart")?
                } else {
                    return Err(e).context("Failed to connect to WebDriver");
                }
            }
        };

        Ok(Browser {
            client,
            browser_type,
            capture_dir,
            default_timeout: DEFAULT_ACTION_TIMEOUT,
        })
    }

    /// Directory the browser saves captured downloads into.
    pub fn capture_dir(&self) -> &Path {
        self.capture_dir.path()
    }

    /// Get browser type
    pub fn browser_type(&self) -> BrowserType {
        self.browser_type
    }

    /// Navigate and wait for the DOM-ready milestone (not full load).
    async fn goto_dom_ready(&self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        self.client
            .goto(url)
            .await
            .context(format!("Failed to navigate to {}", url))?;

        // The target is a dynamic SPA; readyState leaving "loading" is all we
        // can wait for.
        for _ in 0..20 {
            match self.client.execute("return document.readyState;", vec![]).await {
                Ok(val) if val.as_str().map(|s| s != "loading").unwrap_or(false) => break,
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
        Ok(())
    }

    /// Names currently present in the capture directory.
    fn capture_snapshot(&self) -> Result<HashSet<OsString>> {
        let mut names = HashSet::new();
        for entry in std::fs::read_dir(self.capture_dir.path())? {
            names.insert(entry?.file_name());
        }
        Ok(names)
    }

    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

#[async_trait]
impl GenerationSite for Browser {
    async fn open(&self, url: &Url) -> Result<()> {
        self.goto_dom_ready(url.as_str()).await
    }

    async fn wait_attached(&self, selector: &str, budget: Duration) -> Result<bool> {
        debug!("Waiting for {} to attach", selector);
        let client = &self.client;
        let status = poll::poll_for(budget, PROBE_INTERVAL, || async move {
            Ok(client.find(Locator::Css(selector)).await.is_ok())
        })
        .await?;
        Ok(status.is_satisfied())
    }

    async fn submit_image(&self, selector: &str, image: &Path) -> Result<()> {
        let absolute = std::fs::canonicalize(image)
            .context(format!("Image file is not readable: {}", image.display()))?;

        let control = self
            .client
            .find(Locator::Css(selector))
            .await
            .context(format!("Upload control vanished: {}", selector))?;

        info!("Uploading {} ...", absolute.display());
        // WebDriver file upload: the input receives the local path as keys
        control
            .send_keys(&absolute.to_string_lossy())
            .await
            .context("Failed to submit image to upload control")?;
        Ok(())
    }

    async fn scan_links(&self) -> Result<Vec<CandidateLink>> {
        const SCAN_SCRIPT: &str = "return Array.from(document.querySelectorAll('a'))\
            .map(a => ({href: a.href || '', text: a.innerText || ''}));";

        let value = self
            .client
            .execute(SCAN_SCRIPT, vec![])
            .await
            .context("Failed to scan page anchors")?;
        let links: Vec<CandidateLink> =
            serde_json::from_value(value).context("Anchor scan returned unexpected shape")?;
        Ok(links)
    }

    async fn capture_download(&self, ext: &str, dest: &Path) -> Result<()> {
        let before = self.capture_snapshot()?;

        let selector = format!(r#"a[href$=".{}"]"#, ext);
        let anchor = self
            .client
            .find(Locator::Css(&selector))
            .await
            .context(format!("No anchor matching {}", selector))?;
        anchor
            .click()
            .await
            .context(format!("Click on {} download link failed", ext))?;

        // The browser saves into the capture dir on its own schedule; wait
        // for a new file to appear and its size to stop moving.
        let sizes: Arc<Mutex<HashMap<PathBuf, u64>>> = Arc::new(Mutex::new(HashMap::new()));
        let settled: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));

        let capture_dir = self.capture_dir.path().to_path_buf();
        let status = poll::poll_for(self.default_timeout, PROBE_INTERVAL, || {
            let sizes = sizes.clone();
            let settled = settled.clone();
            let capture_dir = capture_dir.clone();
            let before = before.clone();
            async move {
                let mut sizes = sizes.lock().unwrap();
                if let Some(path) = settled_new_file(&capture_dir, &before, &mut sizes)? {
                    *settled.lock().unwrap() = Some(path);
                    return Ok(true);
                }
                Ok(false)
            }
        })
        .await?;

        if !status.is_satisfied() {
            anyhow::bail!(
                "Browser never finished a .{} download within {:?}",
                ext,
                self.default_timeout
            );
        }

        let captured = settled
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow::anyhow!("Download poll finished without a settled file"))?;
        persist_download(&captured, dest)?;
        info!("Downloaded {} -> {}", ext.to_uppercase(), dest.display());
        Ok(())
    }
}

/// Build W3C capabilities: headless args plus auto-download preferences
/// pointed at the capture directory, so downloads are captured instead of
/// opened in-page or dropped.
fn build_capabilities(
    browser_type: &BrowserType,
    headless: bool,
    capture_dir: &Path,
) -> serde_json::Map<String, serde_json::Value> {
    let mut caps = serde_json::Map::new();
    let capture_dir = capture_dir.display().to_string();

    match browser_type {
        BrowserType::Firefox => {
            let mut args = Vec::new();
            if headless {
                args.push("--headless".to_string());
            }

            let mut firefox_opts = serde_json::Map::new();
            firefox_opts.insert("args".to_string(), json!(args));
            firefox_opts.insert(
                "prefs".to_string(),
                json!({
                    "browser.download.folderList": 2,
                    "browser.download.dir": capture_dir,
                    "browser.download.useDownloadDir": true,
                    "browser.download.manager.showWhenStarting": false,
                    "browser.helperApps.neverAsk.saveToDisk":
                        "application/octet-stream,application/sla,application/zip,\
                         model/stl,model/obj,model/gltf-binary",
                    "pdfjs.disabled": true,
                }),
            );
            caps.insert("moz:firefoxOptions".to_string(), json!(firefox_opts));
        }
        BrowserType::Chrome => {
            let mut args = vec!["--no-sandbox".to_string()];
            if headless {
                args.push("--headless=new".to_string());
                args.push("--disable-gpu".to_string());
                args.push("--disable-dev-shm-usage".to_string());
            }

            let mut chrome_opts = serde_json::Map::new();
            chrome_opts.insert("args".to_string(), json!(args));
            chrome_opts.insert(
                "prefs".to_string(),
                json!({
                    "download.default_directory": capture_dir,
                    "download.prompt_for_download": false,
                    "download.directory_upgrade": true,
                }),
            );
            caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
        }
    }

    caps
}

/// Find a file in `dir` that is not in `before`, is not an in-flight partial,
/// and whose size matches the previous observation. `sizes` carries the
/// observations between poll ticks.
pub(crate) fn settled_new_file(
    dir: &Path,
    before: &HashSet<OsString>,
    sizes: &mut HashMap<PathBuf, u64>,
) -> Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if before.contains(&name) {
            continue;
        }
        let path = entry.path();
        let is_partial = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| PARTIAL_SUFFIXES.contains(&e))
            .unwrap_or(false);
        if is_partial || !path.is_file() {
            continue;
        }

        let len = entry.metadata()?.len();
        match sizes.get(&path) {
            Some(&seen) if seen == len && len > 0 => return Ok(Some(path)),
            _ => {
                sizes.insert(path, len);
            }
        }
    }
    Ok(None)
}

/// Move a captured download to its final destination, overwriting any prior
/// artifact of the same name. Falls back to copy+remove across filesystems.
pub(crate) fn persist_download(src: &Path, dest: &Path) -> Result<()> {
    if std::fs::rename(src, dest).is_err() {
        std::fs::copy(src, dest).context(format!(
            "Failed to persist download to {}",
            dest.display()
        ))?;
        if let Err(e) = std::fs::remove_file(src) {
            warn!("Could not remove capture file {}: {}", src.display(), e);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "webdriver_test.rs"]
mod webdriver_test;
