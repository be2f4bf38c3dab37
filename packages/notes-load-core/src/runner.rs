//! Constant-VU executor.
//!
//! Starts `vus` tasks. Each task runs iterations back to back, sleeping for
//! the pace interval in between, until the run deadline passes, the shared
//! iteration budget is used up, or shutdown is signalled. An iteration that
//! has started always runs to completion.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::check::CheckRegistry;
use crate::client::NotesClient;
use crate::config::LoadConfig;
use crate::error::LoadError;
use crate::report::RunSummary;
use crate::workload::{IterationOutcome, Workload};

#[derive(Debug, Default)]
struct RunCounters {
    next_index: AtomicU64,
    iterations: AtomicU64,
    early_returns: AtomicU64,
    interrupted: AtomicBool,
}

/// Drives the workload with a fixed number of virtual users.
pub struct Runner {
    config: Arc<LoadConfig>,
    workload: Arc<Workload>,
    registry: Arc<CheckRegistry>,
}

impl Runner {
    /// Validates `config` and builds the shared HTTP client.
    pub fn new(config: LoadConfig) -> Result<Self, LoadError> {
        config.validate()?;
        let client = NotesClient::new(&config)?;
        let workload = Workload::new(client, &config);
        Ok(Self {
            config: Arc::new(config),
            workload: Arc::new(workload),
            registry: Arc::new(CheckRegistry::new()),
        })
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<CheckRegistry> {
        Arc::clone(&self.registry)
    }

    /// Runs until a stop condition is met. Setting `shutdown` to `true` stops
    /// new iterations and cuts pacing sleeps short.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> RunSummary {
        let started = Instant::now();
        // A duration too long to represent as an instant never expires.
        let deadline = self.config.duration.and_then(|d| started.checked_add(d));
        let counters = Arc::new(RunCounters::default());

        tracing::info!(
            base_url = self.workload.client().base_url(),
            vus = self.config.vus,
            duration = ?self.config.duration,
            iterations = ?self.config.iterations,
            "starting load run"
        );

        let mut vus = JoinSet::new();
        for vu in 1..=self.config.vus {
            let vu_loop = VuLoop {
                vu,
                workload: Arc::clone(&self.workload),
                registry: Arc::clone(&self.registry),
                counters: Arc::clone(&counters),
                max_iterations: self.config.iterations,
                deadline,
                shutdown: shutdown.clone(),
            };
            vus.spawn(vu_loop.run());
        }

        while let Some(joined) = vus.join_next().await {
            if let Err(e) = joined {
                tracing::error!("virtual user task failed: {}", e);
            }
        }

        let summary = RunSummary::new(
            self.workload.client().base_url().to_string(),
            self.config.vus,
            counters.iterations.load(Ordering::Relaxed),
            counters.early_returns.load(Ordering::Relaxed),
            started.elapsed(),
            counters.interrupted.load(Ordering::Relaxed),
            self.registry.snapshot(),
        );

        tracing::info!(
            iterations = summary.iterations,
            early_returns = summary.early_returns,
            elapsed_ms = summary.elapsed_ms,
            "load run finished"
        );
        summary
    }
}

struct VuLoop {
    vu: usize,
    workload: Arc<Workload>,
    registry: Arc<CheckRegistry>,
    counters: Arc<RunCounters>,
    max_iterations: Option<u64>,
    deadline: Option<Instant>,
    shutdown: watch::Receiver<bool>,
}

impl VuLoop {
    async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() {
                self.counters.interrupted.store(true, Ordering::Relaxed);
                break;
            }
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }

            let index = self.counters.next_index.fetch_add(1, Ordering::Relaxed);
            if self.max_iterations.is_some_and(|max| index >= max) {
                break;
            }

            let outcome = self
                .workload
                .run_iteration(index, self.registry.as_ref())
                .await;
            self.counters.iterations.fetch_add(1, Ordering::Relaxed);
            if let IterationOutcome::EarlyReturn { step, reason } = outcome {
                self.counters.early_returns.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    vu = self.vu,
                    iteration = index,
                    step = step.name(),
                    "iteration returned early: {}",
                    reason
                );
            }

            if !self.pace().await {
                self.counters.interrupted.store(true, Ordering::Relaxed);
                break;
            }
        }
        tracing::debug!(vu = self.vu, "virtual user stopped");
    }

    /// Sleeps for the pace interval, clipped to the deadline. Returns false
    /// when shutdown was signalled during the sleep.
    async fn pace(&mut self) -> bool {
        let wake = match (Instant::now().checked_add(self.workload.pace()), self.deadline) {
            (Some(wake), Some(deadline)) => Some(wake.min(deadline)),
            (wake, deadline) => wake.or(deadline),
        };

        tokio::select! {
            _ = sleep_until(wake) => true,
            changed = self.shutdown.changed() => match changed {
                Ok(()) if *self.shutdown.borrow() => false,
                _ => {
                    // Sender gone or flag cleared: finish the sleep normally.
                    sleep_until(wake).await;
                    true
                }
            },
        }
    }
}

/// Sleeps until `wake`, or forever when there is no representable wake time.
async fn sleep_until(wake: Option<Instant>) {
    match wake {
        Some(wake) => tokio::time::sleep_until(wake).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = LoadConfig {
            vus: 0,
            ..Default::default()
        };
        assert!(matches!(Runner::new(config), Err(LoadError::Config(_))));
    }

    #[tokio::test]
    async fn test_iteration_budget_against_unreachable_target() {
        let config = LoadConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            vus: 3,
            duration: None,
            iterations: Some(7),
            pace: Duration::from_millis(1),
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let runner = Runner::new(config).unwrap();
        let (_tx, rx) = watch::channel(false);

        let summary = runner.run(rx).await;
        assert_eq!(summary.iterations, 7);
        assert_eq!(summary.early_returns, 7);
        assert!(!summary.interrupted);
        assert_eq!(summary.checks[0].fails, 7);
        assert_eq!(summary.total_passes(), 0);
    }

    #[tokio::test]
    async fn test_unrepresentable_duration_means_no_deadline() {
        let config = LoadConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            vus: 2,
            duration: Some(Duration::from_secs(u64::MAX)),
            iterations: Some(4),
            pace: Duration::from_millis(1),
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let runner = Runner::new(config).unwrap();
        let (_tx, rx) = watch::channel(false);

        let summary = runner.run(rx).await;
        assert_eq!(summary.iterations, 4);
        assert!(!summary.interrupted);
    }

    #[tokio::test]
    async fn test_unrepresentable_pace_waits_for_shutdown() {
        let config = LoadConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            vus: 1,
            duration: None,
            iterations: Some(1),
            pace: Duration::MAX,
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let runner = Runner::new(config).unwrap();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(true);
        });

        let summary = runner.run(rx).await;
        assert_eq!(summary.iterations, 1);
        assert!(summary.interrupted);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_runs_nothing() {
        let config = LoadConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            iterations: Some(100),
            ..Default::default()
        };
        let runner = Runner::new(config).unwrap();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let summary = runner.run(rx).await;
        assert_eq!(summary.iterations, 0);
        assert!(summary.interrupted);
    }
}
