//! # meshgrab
#![allow(clippy::uninlined_format_args)]
//!
//! Browser-automation pipeline that turns a generated 2D image into
//! downloadable 3D model files by driving a generation website: upload the
//! image, wait for the remote service to finish, download the artifacts in a
//! preferred-format order.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Generate an idea + image, then fetch the model files
//! meshgrab run --out-dir output --formats glb,obj,stl --wait-minutes 20
//!
//! # Convert an existing image instead of generating one
//! meshgrab run --image imagen.png --out-dir output
//!
//! # Watch the browser work
//! meshgrab run --image imagen.png --no-headless
//!
//! # Expose the job trigger endpoint (POST /run, GET /logs)
//! meshgrab serve --port 8000
//! ```
//!
//! Artifacts land at `output/model.<format>`, one per format the site
//! offered and the browser managed to download. A run that sees no download
//! links before the deadline reports `timed_out` instead of failing.
//!
//! ## Library Usage
//!
//! ```no_run
//! use meshgrab::{BrowserType, PipelineRequest, pipeline};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let formats = vec!["glb".to_string(), "stl".to_string()];
//! let request = PipelineRequest::new("imagen.png", "output", &formats, 20, true)?;
//! let outcome = pipeline::run(&request, BrowserType::Firefox).await?;
//! println!("{:?}", outcome.downloaded_paths);
//! # Ok(())
//! # }
//! ```

/// Upstream text/image generation client
pub mod gemini;

/// Marketplace stub collaborators and the deal dashboard
pub mod market;

/// Pipeline stages and orchestrator
pub mod pipeline;

/// Bounded deadline/interval polling
pub mod poll;

/// Job-trigger HTTP server
pub mod server;

/// The generation-site seam the stages drive
pub mod site;

/// Request, link, and outcome types
pub mod types;

/// WebDriver browser session with download capture
pub mod webdriver;

/// Automatic WebDriver process management and runtime provisioning
pub mod webdriver_manager;

pub use site::{GenerationSite, LocatorStrategy, UPLOAD_CONTROL_STRATEGIES};
pub use types::{
    CandidateLink, DownloadResult, OutputFormat, PipelineOutcome, PipelineRequest,
};
pub use webdriver::{Browser, BrowserType};
