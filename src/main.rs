#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod errors;
pub mod gemini;
pub mod market;
pub mod pipeline;
pub mod poll;
mod server;
pub mod site;
pub mod types;
pub mod webdriver;
mod webdriver_manager;

use market::{
    Dashboard, Deal, ListingAnalysis, NegotiationTerms, Negotiator, ResaleValueCalculator,
    SearchAutomation, SearchFilters,
};
use types::{OutputFormat, PipelineOutcome, PipelineRequest, parse_format_list};
use webdriver::BrowserType;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const _EXIT_COMMAND_ERROR: i32 = 1;
const _EXIT_UPLOAD_CONTROL_NOT_FOUND: i32 = 2;
const _EXIT_ENVIRONMENT_UNAVAILABLE: i32 = 3;
const _EXIT_WEBDRIVER_FAILED: i32 = 4;
const _EXIT_TIMEOUT: i32 = 5;

/// Name of the run log inside the output directory, tailed by `GET /logs`.
const RUN_LOG_FILE: &str = "run.log";

#[derive(Parser)]
#[command(name = "meshgrab")]
#[command(about = "Image to 3D model pipeline via browser automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Pipeline options shared by `run` and `serve`.
#[derive(clap::Args, Clone)]
struct PipelineArgs {
    /// Directory artifacts and the run log are written into
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Comma-separated preferred formats, tried in order
    #[arg(long, default_value = "glb,obj,stl")]
    formats: String,

    /// How long to wait for generation before giving up
    #[arg(long, default_value = "20")]
    wait_minutes: u64,

    /// Browser to use
    #[arg(short, long, default_value = "firefox")]
    browser: String,

    /// Run browser in visible mode (disables headless)
    #[arg(long = "no-headless")]
    no_headless: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: idea, image, upload, wait, download
    Run {
        /// Existing image to convert (skips idea and image generation)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Idea text override (skips idea generation, still renders an image)
        #[arg(long)]
        idea: Option<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Generate a model idea and print it
    Idea,

    /// Render a prompt to an image file
    Image {
        /// Image generation prompt
        prompt: String,

        /// Where to write the image
        #[arg(long, default_value = "output/imagen.png")]
        out: PathBuf,
    },

    /// Run the marketplace demo flow and print dashboard stats
    Deals,

    /// Serve the job-trigger endpoint (POST /run, GET /logs)
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value = "8000")]
        port: u16,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[tokio::main]
async fn main() {
    let result = run().await;

    // Always clean up WebDriver processes before exiting
    webdriver_manager::GLOBAL_WEBDRIVER_MANAGER.stop_all();

    // Handle exit codes based on error type
    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            let meshgrab_err: errors::MeshgrabError = err.into();

            // JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": meshgrab_err.to_string(),
                "exit_code": meshgrab_err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            // Also log to stderr for human reading
            eprintln!("Error: {}", meshgrab_err);
            std::process::exit(meshgrab_err.exit_code());
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Tracing goes to stderr so JSON output on stdout stays clean; pipeline
    // commands additionally write the run log for the /logs endpoint.
    let _log_guard = match &cli.command {
        Commands::Run { pipeline, .. } | Commands::Serve { pipeline, .. } => {
            init_tracing(Some(&pipeline.out_dir))?
        }
        _ => init_tracing(None)?,
    };

    match cli.command {
        Commands::Run {
            image,
            idea,
            pipeline,
            format,
        } => {
            let outcome = run_pipeline(image, idea, &pipeline).await?;
            print_outcome(&outcome, format)?;
        }

        Commands::Idea => {
            let client = gemini::GeminiClient::from_env()?;
            let idea = client.generate_idea(&gemini::load_idea_prompt()).await?;
            println!("{}", idea);
        }

        Commands::Image { prompt, out } => {
            let client = gemini::GeminiClient::from_env()?;
            let path = client.generate_image(&prompt, &out).await?;
            println!("{}", path.display());
        }

        Commands::Deals => run_deals_demo()?,

        Commands::Serve { port, pipeline } => {
            let log_path = pipeline.out_dir.join(RUN_LOG_FILE);
            let state = server::JobState::new(log_path, move || {
                let args = pipeline.clone();
                async move {
                    match run_pipeline(None, None, &args).await {
                        Ok(outcome) if outcome.timed_out => {
                            warn!("Pipeline run timed out without artifacts")
                        }
                        Ok(outcome) => {
                            info!("Pipeline run finished: {:?}", outcome.downloaded_paths)
                        }
                        Err(e) => error!("Pipeline run failed: {:#}", e),
                    }
                }
            });
            server::serve(port, state).await?;
        }
    }

    Ok(())
}

/// Generate the source image if needed, then drive the browser pipeline.
async fn run_pipeline(
    image: Option<PathBuf>,
    idea_override: Option<String>,
    args: &PipelineArgs,
) -> Result<PipelineOutcome> {
    let browser_type = BrowserType::from_str(&args.browser)?;

    let image_path = match image {
        Some(path) => path,
        None => {
            let client = gemini::GeminiClient::from_env()?;
            let idea = match idea_override {
                Some(text) => text,
                None => client.generate_idea(&gemini::load_idea_prompt()).await?,
            };
            info!("Model idea: {}", idea);
            client
                .generate_image(&idea, &args.out_dir.join("imagen.png"))
                .await?
        }
    };

    let request = PipelineRequest::new(
        image_path,
        &args.out_dir,
        &parse_format_list(&args.formats),
        args.wait_minutes,
        !args.no_headless,
    )?;

    let outcome = pipeline::run(&request, browser_type).await?;
    if outcome.timed_out {
        warn!("No download links appeared within {} minutes", args.wait_minutes);
    }
    Ok(outcome)
}

fn print_outcome(outcome: &PipelineOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Simple => {
            if outcome.timed_out {
                println!("Timed out waiting for generation; nothing downloaded.");
            } else if outcome.downloaded_paths.is_empty() {
                println!("No artifacts could be downloaded.");
            } else {
                for path in &outcome.downloaded_paths {
                    println!("Downloaded {}", path.display());
                }
            }
        }
    }
    Ok(())
}

/// The example marketplace flow over the stub collaborators.
fn run_deals_demo() -> Result<()> {
    let searcher = SearchAutomation;
    let analyzer = ListingAnalysis;
    let negotiator = Negotiator::default();
    let calculator = ResaleValueCalculator;
    let mut dashboard = Dashboard::new();

    let listings = searcher.search(&SearchFilters {
        price_min: 0,
        price_max: 100,
        radius_km: 10,
        keywords: vec!["bike".to_string()],
        categories: vec!["fietsen".to_string()],
    })?;

    for listing in listings {
        let terms = NegotiationTerms {
            budget: 50.0,
            location: "Amsterdam".to_string(),
            payment_method: "cash".to_string(),
            persona: negotiator.personas[0].to_string(),
        };
        dashboard.add_deal(Deal {
            score: analyzer.rate(&listing),
            resale: calculator.estimate(&listing),
            message: negotiator.negotiate(&listing, &terms),
            listing,
            recorded_at: chrono::Utc::now(),
        });
    }

    println!("{}", serde_json::to_string(&dashboard.summary())?);
    Ok(())
}

/// Initialize tracing to stderr, plus a plain-text file layer for pipeline
/// commands so the job server can tail the run log.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "meshgrab=info".into());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .context(format!("Failed to create output directory {}", dir.display()))?;
            let log_file = std::fs::File::create(dir.join(RUN_LOG_FILE))
                .context("Failed to create run log")?;
            let (writer, guard) = tracing_appender::non_blocking(log_file);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            Ok(None)
        }
    }
}
