//! Registration, login, token refresh and logout.

use hyper::{body::Bytes, Request, Response};
use serde::Deserialize;

use crate::router::{AppState, RouterError};

use super::request_utils::{
    bearer_token, build_empty_response, json_response, map_store_error, read_json,
};

/// Credentials accepted by register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

/// Registers a user.
///
/// # Endpoint
/// `POST /auth/register`
///
/// # Response
/// - **200 OK**: `{"id": 1}`
/// - **400 Bad Request**: malformed JSON
/// - **409 Conflict**: email already registered
/// - **422 Unprocessable Entity**: invalid email or password length
pub async fn register(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let creds: CredentialsRequest = read_json(req, &state).await?;
    validate_credentials(&creds, &state)?;

    let id = state
        .store
        .register(creds.email.trim(), &creds.password)
        .map_err(map_store_error)?;
    tracing::debug!(user_id = id, "registered user");

    json_response(200, &serde_json::json!({ "id": id }), None)
}

/// Issues tokens for valid credentials.
///
/// # Endpoint
/// `POST /auth/login`
///
/// # Response
/// - **200 OK**: `{"access": "...", "refresh": "..."}`
/// - **400 Bad Request**: malformed JSON
/// - **401 Unauthorized**: unknown email or wrong password
pub async fn login(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let creds: CredentialsRequest = read_json(req, &state).await?;
    let tokens = state
        .store
        .login(creds.email.trim(), &creds.password)
        .map_err(map_store_error)?;
    json_response(200, &tokens, None)
}

/// `POST /auth/refresh`: rotates the refresh token.
pub async fn refresh(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let body: RefreshRequest = read_json(req, &state).await?;
    let tokens = state
        .store
        .refresh(&body.refresh)
        .map_err(map_store_error)?;
    json_response(200, &tokens, None)
}

/// `POST /auth/logout`: revokes the presented access token.
pub async fn logout(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| RouterError::Unauthorized("missing bearer token".to_string()))?;
    state.store.logout(token).map_err(map_store_error)?;
    build_empty_response(204)
}

fn validate_credentials(creds: &CredentialsRequest, state: &AppState) -> Result<(), RouterError> {
    let email = creds.email.trim();
    let email_ok = !email.is_empty()
        && email.len() <= state.config.max_email_len
        && email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && !domain.is_empty());
    if !email_ok {
        return Err(RouterError::Unprocessable("invalid email".to_string()));
    }

    let len = creds.password.chars().count();
    if len < state.config.min_password_len || len > state.config.max_password_len {
        return Err(RouterError::Unprocessable(format!(
            "password must be {}-{} characters",
            state.config.min_password_len, state.config.max_password_len
        )));
    }
    Ok(())
}
