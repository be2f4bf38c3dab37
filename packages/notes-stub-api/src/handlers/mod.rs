//! HTTP endpoint implementations for health, auth and notes.

pub mod auth;
pub mod health;
pub mod notes;
pub mod request_utils;
pub mod response;

pub use response::error_response;
