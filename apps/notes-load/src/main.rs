//! Load-test driver for the auth + notes API.
//!
//! Subcommands:
//! - `run`: constant-VU load run with a check summary
//! - `smoke`: one iteration with per-check output
//! - `wait-ready`: block until the service reports ready

mod cli;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use notes_load_core::check::RecordedChecks;
use notes_load_core::{CheckOutcome, IterationOutcome, LoadConfig, NotesClient, Runner, Workload};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, TargetArgs, WorkloadArgs};

fn build_config(target: &TargetArgs, workload: &WorkloadArgs) -> anyhow::Result<LoadConfig> {
    let base_url = LoadConfig::resolve_base_url(target.base_url.as_deref())
        .context("Failed to resolve base url")?;
    Ok(LoadConfig {
        base_url,
        request_timeout: target.timeout,
        email_modulus: workload.email_modulus,
        password: workload.password.clone(),
        note_title: workload.note_title.clone(),
        note_body: workload.note_body.clone(),
        ..Default::default()
    })
}

#[allow(clippy::too_many_arguments)]
async fn run_load(
    target: TargetArgs,
    workload: WorkloadArgs,
    vus: usize,
    duration: Option<Duration>,
    iterations: Option<u64>,
    pace: Duration,
    min_check_rate: Option<f64>,
    summary_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let duration = match (duration, iterations) {
        (None, None) => Some(Duration::from_secs(30)),
        (d, _) => d,
    };
    let config = LoadConfig {
        vus,
        duration,
        iterations,
        pace,
        min_check_rate,
        ..build_config(&target, &workload)?
    };
    let runner = Runner::new(config).context("Invalid load configuration")?;

    println!("Running notes workload...");
    println!("  Target: {}", runner.config().base_url);
    println!("  VUs: {}", runner.config().vus);
    if let Some(d) = runner.config().duration {
        println!("  Duration: {:?}", d);
    }
    if let Some(n) = runner.config().iterations {
        println!("  Iterations: {}", n);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nStopping after in-flight iterations...");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = runner.run(shutdown_rx).await;

    println!("\n{}", "=".repeat(60));
    print!("{}", summary.render());

    if let Some(path) = summary_out {
        summary
            .write_json(&path)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        println!("Summary written to {}", path.display());
    }

    let min = runner.config().min_check_rate;
    if !summary.meets_threshold(min) {
        bail!(
            "check pass rate {:.2}% is below the required {:.2}%",
            summary.pass_rate() * 100.0,
            min.unwrap_or_default() * 100.0
        );
    }
    if let Some(min) = min {
        println!("✅ PASS: check pass rate meets {:.2}%", min * 100.0);
    }
    Ok(())
}

async fn run_smoke(target: TargetArgs, workload: WorkloadArgs, index: u64) -> anyhow::Result<()> {
    let config = LoadConfig {
        vus: 1,
        iterations: Some(1),
        ..build_config(&target, &workload)?
    };
    config.validate()?;
    let client = NotesClient::new(&config)?;
    let workload = Workload::new(client, &config);
    let recorded = RecordedChecks::new();

    println!("Smoke iteration {} against {}", index, config.base_url);
    let outcome = workload.run_iteration(index, &recorded).await;

    let mut failures = 0;
    for (check, outcome) in recorded.entries() {
        match outcome {
            CheckOutcome::Pass => println!("  ✅ {}", check),
            CheckOutcome::Fail(reason) => {
                failures += 1;
                println!("  ❌ {} ({})", check, reason);
            }
        }
    }
    if let IterationOutcome::EarlyReturn { step, reason } = outcome {
        println!("  Iteration returned early at {}: {}", step.name(), reason);
    }

    if failures > 0 {
        bail!("{} check(s) failed", failures);
    }
    Ok(())
}

async fn wait_ready(target: TargetArgs, within: Duration, interval: Duration) -> anyhow::Result<()> {
    let config = LoadConfig {
        request_timeout: target.timeout,
        base_url: LoadConfig::resolve_base_url(target.base_url.as_deref())?,
        ..Default::default()
    };
    let client = NotesClient::new(&config)?;
    let deadline = tokio::time::Instant::now().checked_add(within);

    loop {
        match client.ready().await {
            Ok(res) if res.status == 204 => {
                println!("{} is ready", client.base_url());
                return Ok(());
            }
            Ok(res) => tracing::debug!("readyz returned {}", res.status),
            Err(e) => tracing::debug!("readyz failed: {}", e),
        }
        // No representable deadline means wait indefinitely.
        let out_of_time = deadline.is_some_and(|deadline| {
            tokio::time::Instant::now()
                .checked_add(interval)
                .map_or(true, |next| next > deadline)
        });
        if out_of_time {
            bail!("{} not ready within {:?}", client.base_url(), within);
        }
        tokio::time::sleep(interval).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run {
            target,
            workload,
            vus,
            duration,
            iterations,
            pace,
            min_check_rate,
            summary_out,
        } => {
            run_load(
                target,
                workload,
                vus,
                duration,
                iterations,
                pace,
                min_check_rate,
                summary_out,
            )
            .await
        }
        Commands::Smoke {
            target,
            workload,
            index,
        } => run_smoke(target, workload, index).await,
        Commands::WaitReady {
            target,
            within,
            interval,
        } => wait_ready(target, within, interval).await,
    }
}
