// Integration tests for the job-trigger server over a real socket

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use meshgrab::server::{JobState, router};

async fn spawn_server(state: Arc<JobState>) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_single_in_flight_run_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let launches = Arc::new(AtomicUsize::new(0));
    let counter = launches.clone();

    let state = JobState::new(dir.path().join("run.log"), move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
    });
    let addr = spawn_server(state).await;
    let client = reqwest::Client::new();

    let first: serde_json::Value = client
        .post(format!("http://{}/run", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["status"], "started");

    let second: serde_json::Value = client
        .post(format!("http://{}/run", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["status"], "running");

    // Only one launch despite two triggers
    assert_eq!(launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_logs_endpoint_tails_run_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("run.log");
    let state = JobState::new(log_path.clone(), || async {});
    let addr = spawn_server(state).await;
    let client = reqwest::Client::new();

    // Nothing has run: no content
    let response = client
        .get(format!("http://{}/logs", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    std::fs::write(&log_path, "Opening site ...\nUploading imagen.png ...\n").unwrap();
    let response = client
        .get(format!("http://{}/logs", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Uploading imagen.png"));
}

#[tokio::test]
async fn test_index_page_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let state = JobState::new(dir.path().join("run.log"), || async {});
    let addr = spawn_server(state).await;

    let body = reqwest::get(format!("http://{}/", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("meshgrab"));
}
