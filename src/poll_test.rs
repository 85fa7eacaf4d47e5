// Unit tests for the bounded poll loop

use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::test]
async fn test_poll_satisfied_before_deadline() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let probe_ticks = ticks.clone();

    let status = poll_for(Duration::from_millis(500), Duration::from_millis(5), || {
        let ticks = probe_ticks.clone();
        async move { Ok(ticks.fetch_add(1, Ordering::SeqCst) + 1 >= 3) }
    })
    .await
    .unwrap();

    assert!(status.is_satisfied());
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_poll_deadline_elapsed() {
    let status = poll_for(Duration::from_millis(40), Duration::from_millis(5), || async {
        Ok(false)
    })
    .await
    .unwrap();

    assert_eq!(status, PollStatus::DeadlineElapsed);
    assert!(!status.is_satisfied());
}

#[tokio::test]
async fn test_poll_propagates_probe_error() {
    let result = poll_for(Duration::from_millis(100), Duration::from_millis(5), || async {
        anyhow::bail!("page went away")
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_poll_pauses_before_first_probe() {
    // An already-true condition is seen on the first tick, one interval in.
    let start = Instant::now();
    let status = poll_for(Duration::from_millis(200), Duration::from_millis(20), || async {
        Ok(true)
    })
    .await
    .unwrap();

    assert!(status.is_satisfied());
    assert!(start.elapsed() >= Duration::from_millis(20));
}
