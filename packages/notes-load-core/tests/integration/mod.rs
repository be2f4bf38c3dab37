//! Driver-against-stub integration tests.
//!
//! 1. Workload pipeline against a healthy service
//! 2. Degraded responses (missing id, missing ETag, failing health)
//! 3. Executor stop conditions and summary output

pub mod helpers;
pub mod runner_tests;
pub mod workload_tests;
