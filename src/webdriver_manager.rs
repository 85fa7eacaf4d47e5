use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::webdriver::BrowserType;

/// Marker embedded in launch failures caused by an absent driver binary.
/// Only failures carrying it are eligible for automatic provisioning.
const MISSING_RUNTIME_MARKER: &str = "not found in PATH";

/// Manages WebDriver processes (geckodriver, chromedriver) and provisions
/// the browser runtime when a launch fails because it is not installed.
pub struct WebDriverManager {
    processes: Arc<Mutex<Vec<WebDriverProcess>>>,
}

struct WebDriverProcess {
    child: Child,
    port: u16,
    url: String,
}

impl Default for WebDriverManager {
    fn default() -> Self {
        Self {
            processes: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl WebDriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a WebDriver is reachable for the given browser type, installing
    /// the runtime if the first launch attempt fails for lack of one.
    ///
    /// A launch failure that signals a missing driver binary triggers one
    /// installation pass and exactly one launch retry. Every other failure
    /// propagates unchanged.
    pub async fn ensure_runtime(&self, browser_type: &BrowserType) -> Result<String> {
        match self.ensure_driver(browser_type).await {
            Ok(url) => Ok(url),
            Err(err) if Self::is_missing_runtime(&err) => {
                info!("Browser runtime missing, attempting installation ...");
                self.provision_runtime(browser_type)?;
                self.ensure_driver(browser_type)
                    .await
                    .context("WebDriver launch failed even after installing the runtime")
            }
            Err(err) => Err(err),
        }
    }

    /// Ensure a WebDriver is running for the given browser type.
    /// Returns the URL to connect to.
    pub async fn ensure_driver(&self, browser_type: &BrowserType) -> Result<String> {
        // First check if we already have a managed driver running
        let managed_urls: Vec<String> = {
            let processes = self.processes.lock().unwrap();
            processes.iter().map(|p| p.url.clone()).collect()
        };

        for url in managed_urls {
            if Self::verify_driver_working(&url).await {
                debug!("Using existing managed WebDriver at {}", url);
                return Ok(url);
            }
        }

        // Check the standard port for an externally managed driver
        let standard_url = match browser_type {
            BrowserType::Firefox => "http://localhost:4444",
            BrowserType::Chrome => "http://localhost:9515",
        };
        if Self::is_driver_running(standard_url).await
            && Self::verify_driver_working(standard_url).await
        {
            debug!("Found external WebDriver at {}", standard_url);
            return Ok(standard_url.to_string());
        }

        info!("WebDriver not detected, attempting to start automatically...");
        self.start_driver(browser_type).await
    }

    /// Start a WebDriver process
    async fn start_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let command = browser_type.driver_command();
        let port = Self::find_free_port_for_browser(browser_type)?;

        if !Self::command_exists(command) {
            anyhow::bail!("{} {}", command, MISSING_RUNTIME_MARKER);
        }

        info!("Starting {} on port {}", command, port);
        let args = match browser_type {
            BrowserType::Firefox => vec!["--port".to_string(), port.to_string()],
            BrowserType::Chrome => vec![format!("--port={}", port)],
        };

        let child = Command::new(command)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context(format!("Failed to start {}", command))?;

        let url = format!("http://localhost:{}", port);

        {
            let mut processes = self.processes.lock().unwrap();
            processes.push(WebDriverProcess {
                child,
                port,
                url: url.clone(),
            });
        }

        // Wait for driver to be ready (with timeout)
        let max_attempts = 30; // 3 seconds total
        for attempt in 1..=max_attempts {
            if Self::is_driver_running(&url).await {
                info!("WebDriver started successfully on port {}", port);
                return Ok(url);
            }
            if attempt < max_attempts {
                sleep(Duration::from_millis(100)).await;
            }
        }

        self.cleanup_failed_process(port);
        anyhow::bail!("WebDriver failed to start within timeout")
    }

    /// Install the browser runtime and its driver through whichever supported
    /// package manager is present. Failure carries manual instructions.
    pub fn provision_runtime(&self, browser_type: &BrowserType) -> Result<()> {
        let driver = browser_type.driver_command();

        for (manager, args) in Self::install_candidates(browser_type) {
            if !Self::command_exists(manager) {
                continue;
            }
            info!("Installing {} via {} ...", driver, manager);
            let status = Command::new(manager)
                .args(args)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match status {
                Ok(status) if status.success() && Self::command_exists(driver) => {
                    info!("Installed {} successfully", driver);
                    return Ok(());
                }
                Ok(status) => {
                    warn!("{} install exited with {}", manager, status);
                }
                Err(err) => {
                    warn!("{} could not be run: {}", manager, err);
                }
            }
        }

        anyhow::bail!(
            "Browser runtime could not be provisioned automatically.\n\
            Install {} manually:\n\
              macOS: brew install {}\n\
              Debian/Ubuntu: apt-get install {}\n\
              Or download a release from https://github.com/mozilla/geckodriver/releases\n\
            and ensure it is on PATH.",
            driver,
            driver,
            match browser_type {
                BrowserType::Firefox => "firefox-esr firefox-geckodriver",
                BrowserType::Chrome => "chromium chromium-driver",
            }
        )
    }

    fn install_candidates(browser_type: &BrowserType) -> Vec<(&'static str, Vec<&'static str>)> {
        match browser_type {
            BrowserType::Firefox => vec![
                (
                    "apt-get",
                    vec!["install", "-y", "firefox-esr", "firefox-geckodriver"],
                ),
                ("dnf", vec!["install", "-y", "firefox", "geckodriver"]),
                ("brew", vec!["install", "geckodriver"]),
            ],
            BrowserType::Chrome => vec![
                ("apt-get", vec!["install", "-y", "chromium", "chromium-driver"]),
                ("dnf", vec!["install", "-y", "chromium", "chromedriver"]),
                ("brew", vec!["install", "chromedriver"]),
            ],
        }
    }

    /// True when the error came from [`start_driver`] finding no binary.
    pub fn is_missing_runtime(err: &anyhow::Error) -> bool {
        format!("{:#}", err).contains(MISSING_RUNTIME_MARKER)
    }

    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        #[cfg(unix)]
        {
            Command::new("which")
                .arg(command)
                .output()
                .map(|output| output.status.success())
                .unwrap_or(false)
        }

        #[cfg(windows)]
        {
            Command::new("where")
                .arg(command)
                .output()
                .map(|output| output.status.success())
                .unwrap_or(false)
        }
    }

    /// Find a free port to use
    pub fn find_free_port_for_browser(browser_type: &BrowserType) -> Result<u16> {
        // Try browser-specific ports first to avoid conflicts
        let preferred_ports = match browser_type {
            BrowserType::Firefox => vec![4444, 4445, 4446],
            BrowserType::Chrome => vec![9515, 9516, 9517],
        };

        for port in preferred_ports {
            if !Self::is_port_in_use(port) {
                debug!("Found free port {} for {:?}", port, browser_type);
                return Ok(port);
            }
        }

        // Fall back to letting OS assign a port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }

    /// Check if a port is in use
    pub fn is_port_in_use(port: u16) -> bool {
        std::net::TcpListener::bind(("127.0.0.1", port)).is_err()
    }

    /// Check if WebDriver is running at the given URL
    pub async fn is_driver_running(url: &str) -> bool {
        let status_url = format!("{}/status", url);

        match reqwest::Client::new()
            .get(&status_url)
            .timeout(Duration::from_secs(1))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Verify that WebDriver is actually working (not just running)
    async fn verify_driver_working(url: &str) -> bool {
        let status_url = format!("{}/status", url);

        match reqwest::Client::new()
            .get(&status_url)
            .timeout(Duration::from_secs(1))
            .send()
            .await
        {
            Ok(response) => {
                if let Ok(body) = response.json::<serde_json::Value>().await {
                    body.get("value")
                        .and_then(|v| v.get("ready"))
                        .and_then(|r| r.as_bool())
                        .unwrap_or(false)
                } else {
                    false
                }
            }
            Err(_) => false,
        }
    }

    /// Clean up a process whose driver never became ready
    fn cleanup_failed_process(&self, port: u16) {
        let mut processes = self.processes.lock().unwrap();
        if let Some(index) = processes.iter().position(|p| p.port == port) {
            let mut process = processes.remove(index);
            let _ = process.child.kill();
        }
    }

    /// Stop all managed WebDriver processes
    pub fn stop_all(&self) {
        let mut processes = self.processes.lock().unwrap();
        for process in processes.iter_mut() {
            debug!("Stopping WebDriver on port {}", process.port);
            let _ = process.child.kill();
        }
        processes.clear();
    }
}

impl Drop for WebDriverManager {
    fn drop(&mut self) {
        // Clean up any processes we started
        self.stop_all();
    }
}

// Global WebDriver manager instance
lazy_static::lazy_static! {
    pub static ref GLOBAL_WEBDRIVER_MANAGER: WebDriverManager = WebDriverManager::new();
}

#[cfg(test)]
#[path = "webdriver_manager_test.rs"]
mod webdriver_manager_test;
