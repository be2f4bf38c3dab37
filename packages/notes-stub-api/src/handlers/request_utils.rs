//! Request utilities for HTTP endpoints.

use http_body_util::BodyExt;
use hyper::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, ETAG};
use hyper::{body::Bytes, Request, Response};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time;

use crate::router::{AppState, RouterError};
use crate::store::StoreError;

/// Type alias for matchit parameters with explicit lifetimes
pub type MatchitParams<'a, 'b> = matchit::Params<'a, 'b>;

/// Read the request body with timeout and size limit
pub async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
    max_bytes: usize,
) -> Result<Bytes, RouterError> {
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let body = time::timeout(timeout_duration, req.collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| RouterError::InternalError(format!("Failed to read request body: {}", e)))?
        .to_bytes();
    if body.len() > max_bytes {
        return Err(RouterError::PayloadTooLarge);
    }
    Ok(body)
}

/// Read and decode a JSON request body
pub async fn read_json<T: DeserializeOwned>(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<T, RouterError> {
    let body = read_request_body_with_timeout(
        req,
        state.config.request_timeout_ms,
        state.config.max_body_bytes,
    )
    .await?;
    serde_json::from_slice(&body)
        .map_err(|e| RouterError::BadRequest(format!("Failed to parse request: {}", e)))
}

/// Helper to build a JSON response, optionally carrying an ETag
pub fn json_response<T: Serialize>(
    status: u16,
    value: &T,
    etag: Option<String>,
) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;
    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json");
    if let Some(etag) = etag {
        builder = builder
            .header(ETAG, etag)
            .header(CACHE_CONTROL, "private, max-age=0, must-revalidate");
    }
    builder
        .body(Bytes::from(json))
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Helper to build empty HTTP response (204 No Content, 304 Not Modified)
pub fn build_empty_response(status: u16) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .body(Bytes::new())
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap<HeaderValue>) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the bearer token to a user id
pub fn authenticate(headers: &HeaderMap<HeaderValue>, state: &AppState) -> Result<i64, RouterError> {
    bearer_token(headers)
        .and_then(|token| state.store.authenticate(token))
        .ok_or_else(|| RouterError::Unauthorized("missing or invalid bearer token".to_string()))
}

/// True when `If-None-Match` names `etag` (or is `*`)
pub fn if_none_match_hits(headers: &HeaderMap<HeaderValue>, etag: &str) -> bool {
    headers
        .get_all(hyper::header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|candidate| candidate == etag || candidate == "*")
}

/// Parse `a=1&b=x` into decoded pairs
pub fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Map store errors onto HTTP errors
pub fn map_store_error(e: StoreError) -> RouterError {
    match e {
        StoreError::DuplicateEmail(_) => RouterError::Conflict(e.to_string()),
        StoreError::InvalidCredentials | StoreError::InvalidToken | StoreError::TokenReused => {
            RouterError::Unauthorized(e.to_string())
        }
        StoreError::NoteNotFound(_) => RouterError::NotFound(e.to_string()),
    }
}
