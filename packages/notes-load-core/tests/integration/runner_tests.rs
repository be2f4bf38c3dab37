//! Executor stop conditions against the stub service.

use std::time::Duration;

use notes_load_core::{Check, LoadConfig, Runner};
use notes_stub_api::config::StubConfig;
use tokio::sync::watch;

use super::helpers::start_stub;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_iteration_budget_is_shared_across_vus() {
    let stub = start_stub(StubConfig::default()).await;
    let runner = Runner::new(LoadConfig {
        base_url: stub.base_url.clone(),
        vus: 4,
        duration: None,
        iterations: Some(12),
        pace: Duration::from_millis(5),
        email_modulus: 5,
        ..Default::default()
    })
    .unwrap();
    let (_tx, rx) = watch::channel(false);

    let summary = runner.run(rx).await;
    assert_eq!(summary.iterations, 12);
    assert_eq!(summary.early_returns, 0);
    assert_eq!(summary.total_fails(), 0);
    assert_eq!(summary.total_passes(), 12 * Check::ALL.len() as u64);
    assert!(summary.meets_threshold(Some(1.0)));
    // Emails cycle through five accounts.
    assert_eq!(stub.store.user_count(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duration_bounds_the_run() {
    let stub = start_stub(StubConfig::default()).await;
    let runner = Runner::new(LoadConfig {
        base_url: stub.base_url.clone(),
        vus: 2,
        duration: Some(Duration::from_millis(300)),
        iterations: None,
        pace: Duration::from_millis(50),
        ..Default::default()
    })
    .unwrap();
    let (_tx, rx) = watch::channel(false);

    let summary = runner.run(rx).await;
    assert!(summary.iterations >= 2);
    assert!(summary.elapsed_ms < 5_000);
    assert!(!summary.interrupted);
    assert_eq!(summary.total_fails(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_interrupts_pacing() {
    let stub = start_stub(StubConfig::default()).await;
    let runner = Runner::new(LoadConfig {
        base_url: stub.base_url.clone(),
        vus: 1,
        duration: Some(Duration::from_secs(60)),
        pace: Duration::from_secs(30),
        ..Default::default()
    })
    .unwrap();
    let (tx, rx) = watch::channel(false);

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(true).unwrap();
    });

    let summary = tokio::time::timeout(Duration::from_secs(10), runner.run(rx))
        .await
        .expect("run should stop on shutdown");
    stopper.await.unwrap();

    assert_eq!(summary.iterations, 1);
    assert!(summary.interrupted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_checks_break_threshold_and_write_summary() {
    let stub = start_stub(StubConfig {
        health_status: 500,
        ..Default::default()
    })
    .await;
    let runner = Runner::new(LoadConfig {
        base_url: stub.base_url.clone(),
        vus: 1,
        duration: None,
        iterations: Some(2),
        pace: Duration::from_millis(1),
        min_check_rate: Some(0.95),
        ..Default::default()
    })
    .unwrap();
    let (_tx, rx) = watch::channel(false);

    let summary = runner.run(rx).await;
    let health = &summary.checks[0];
    assert_eq!(health.name, "health 204");
    assert_eq!(health.fails, 2);
    assert_eq!(health.first_failure.as_deref(), Some("unexpected status 500"));
    // 16 of 18 checks pass.
    assert!(!summary.meets_threshold(runner.config().min_check_rate));
    assert!(summary.meets_threshold(Some(0.8)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");
    summary.write_json(&path).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["iterations"], 2);
    assert_eq!(json["checks"][0]["first_failure"], "unexpected status 500");
}
