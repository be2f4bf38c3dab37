use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use notes_load_core::config::parse_duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where to send requests.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Service root URL (falls back to $BASE_URL, then http://localhost:8080)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request timeout (e.g. 10s, 500ms)
    #[arg(long, default_value = "10s", value_parser = parse_duration_arg)]
    pub timeout: Duration,
}

/// Shape of the synthetic accounts and notes.
#[derive(Args, Debug, Clone)]
pub struct WorkloadArgs {
    /// Number of distinct accounts (emails are u{n % modulus}@t.io)
    #[arg(long, default_value_t = 1000)]
    pub email_modulus: u64,

    /// Password for every synthetic account
    #[arg(long, default_value = "Password1!")]
    pub password: String,

    /// Title of each created note
    #[arg(long, default_value = "t")]
    pub note_title: String,

    /// Body of each created note
    #[arg(long, default_value = "b")]
    pub note_body: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the workload with a fixed number of virtual users
    Run {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        workload: WorkloadArgs,

        /// Number of concurrent virtual users
        #[arg(short, long, default_value_t = 5)]
        vus: usize,

        /// Stop starting iterations after this long (default 30s when no --iterations)
        #[arg(short, long, value_parser = parse_duration_arg)]
        duration: Option<Duration>,

        /// Total iterations across all virtual users
        #[arg(short, long)]
        iterations: Option<u64>,

        /// Sleep between iterations of one virtual user
        #[arg(long, default_value = "1s", value_parser = parse_duration_arg)]
        pace: Duration,

        /// Fail the run when the check pass rate is below this (0.0-1.0)
        #[arg(long)]
        min_check_rate: Option<f64>,

        /// Write the run summary as JSON to this file
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },

    /// Run a single iteration and print every check
    Smoke {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        workload: WorkloadArgs,

        /// Sequence index used to derive the account email
        #[arg(long, default_value_t = 0)]
        index: u64,
    },

    /// Poll /readyz until the service answers 204
    WaitReady {
        #[command(flatten)]
        target: TargetArgs,

        /// Give up after this long
        #[arg(long, default_value = "30s", value_parser = parse_duration_arg)]
        within: Duration,

        /// Delay between polls
        #[arg(long, default_value = "500ms", value_parser = parse_duration_arg)]
        interval: Duration,
    },
}

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}
