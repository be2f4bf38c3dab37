//! Liveness, readiness and info endpoints.

use std::time::Duration;

use hyper::{body::Bytes, Request, Response};

use crate::router::{AppState, RouterError};

use super::request_utils::{build_empty_response, json_response};

/// `GET /healthz`: 204 unless overridden by configuration.
pub async fn live(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    if state.config.health_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(state.config.health_delay_ms)).await;
    }
    build_empty_response(state.config.health_status)
}

/// `GET /readyz`: the store is in-process, so always ready.
pub async fn ready(
    _req: Request<hyper::body::Incoming>,
    _state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    build_empty_response(204)
}

/// `GET /info`
pub async fn info(
    _req: Request<hyper::body::Incoming>,
    _state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    json_response(200, &serde_json::json!({ "ok": true }), None)
}
