//! In-memory auth + notes REST service.
//!
//! Implements the HTTP contract the load driver exercises (health, register,
//! login, notes with ETag revalidation) on top of a process-local store, so
//! the driver can be smoke-tested without the real service.

pub mod config;
pub mod handlers;
pub mod router;
pub mod server;
pub mod store;
