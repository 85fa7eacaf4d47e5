//! Thin job-trigger wrapper around the pipeline: start a run, tail its log.
//!
//! At most one run is in flight at a time; a second trigger while one is
//! active reports `running` instead of starting another (the pipeline owns
//! a browser session exclusively, so runs must be serialized).

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::{get, post};
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

type RunFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Shared state: the pipeline launcher, the single in-flight task, and the
/// log file the pipeline writes.
pub struct JobState {
    run: RunFn,
    active: Mutex<Option<JoinHandle<()>>>,
    log_path: PathBuf,
}

impl JobState {
    pub fn new<F, Fut>(log_path: PathBuf, run: F) -> Arc<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runner: RunFn = Arc::new(move || -> Pin<Box<dyn Future<Output = ()> + Send>> {
            Box::pin(run())
        });
        Arc::new(JobState {
            run: runner,
            active: Mutex::new(None),
            log_path,
        })
    }
}

/// Build the job-trigger router.
pub fn router(state: Arc<JobState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/run", post(trigger_run))
        .route("/logs", get(logs))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(port: u16, state: Arc<JobState>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind job server on {}", addr))?;
    info!("Job server listening on {}", addr);
    axum::serve(listener, router(state))
        .await
        .context("Job server failed")?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn trigger_run(State(state): State<Arc<JobState>>) -> Json<serde_json::Value> {
    let mut active = state.active.lock().await;
    if let Some(handle) = active.as_ref()
        && !handle.is_finished()
    {
        return Json(json!({"status": "running"}));
    }

    let job_id = Uuid::new_v4();
    info!("Starting pipeline job {}", job_id);
    *active = Some(tokio::spawn((state.run)()));
    Json(json!({"status": "started", "job": job_id.to_string()}))
}

async fn logs(State(state): State<Arc<JobState>>) -> impl IntoResponse {
    match tokio::fs::read_to_string(&state.log_path).await {
        Ok(contents) => (StatusCode::OK, contents).into_response(),
        Err(_) => StatusCode::NO_CONTENT.into_response(),
    }
}

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>meshgrab</title></head>
<body>
  <h1>meshgrab</h1>
  <button id="run">Run pipeline</button>
  <pre id="log"></pre>
  <script>
    document.getElementById('run').onclick = async () => {
      const res = await fetch('/run', {method: 'POST'});
      document.getElementById('log').textContent = JSON.stringify(await res.json());
    };
    setInterval(async () => {
      const res = await fetch('/logs');
      if (res.status === 200) {
        document.getElementById('log').textContent = await res.text();
      }
    }, 2000);
  </script>
</body>
</html>
"#;

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
