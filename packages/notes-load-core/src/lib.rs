//! Load-test driver for an auth + notes HTTP API.
//!
//! Each iteration runs a fixed pipeline of named steps (health, register,
//! login, create note, fetch, conditional fetch) and records the outcome of
//! every step as a non-fatal check. A constant-VU executor runs iterations
//! concurrently and produces a run summary.

pub mod api;
pub mod check;
pub mod client;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod workload;

pub use check::{Check, CheckOutcome, CheckRegistry, CheckSink, FailReason};
pub use client::NotesClient;
pub use config::LoadConfig;
pub use error::LoadError;
pub use report::RunSummary;
pub use runner::Runner;
pub use workload::{IterationOutcome, IterationState, Step, Workload};
