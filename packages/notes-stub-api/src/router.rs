//! Matchit routing configuration.

use std::sync::Arc;

use hyper::{body::Bytes, Method, Request, Response};
use matchit::Router as MatchitRouter;
use thiserror::Error;

use crate::config::StubConfig;
use crate::handlers::{self, auth, health, notes};
use crate::store::NotesStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Users, tokens and notes
    pub store: Arc<NotesStore>,
    /// Service configuration
    pub config: Arc<StubConfig>,
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a new router with default routes.
    pub fn new(store: Arc<NotesStore>, config: Arc<StubConfig>) -> Self {
        let mut router = MatchitRouter::new();

        let routes = [
            ("/healthz", RouteHandler::Live),
            ("/readyz", RouteHandler::Ready),
            ("/info", RouteHandler::Info),
            ("/auth/register", RouteHandler::Register),
            ("/auth/login", RouteHandler::Login),
            ("/auth/refresh", RouteHandler::Refresh),
            ("/auth/logout", RouteHandler::Logout),
            ("/notes", RouteHandler::Notes),
            ("/notes/{id}", RouteHandler::Note),
        ];
        for (path, handler) in routes {
            router
                .insert(path, handler)
                .unwrap_or_else(|e| panic!("Failed to insert {} route: {}", path, e));
        }

        Self {
            inner: router,
            state: AppState { store, config },
        }
    }

    /// Shared state, for inspection in tests and tooling.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Routes an incoming request to the appropriate handler.
    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Bytes>, RouterError> {
        let path = req.uri().path().to_string();
        tracing::debug!(method = %req.method(), path = %path, "request");

        match self.inner.at(&path) {
            Ok(matched) => {
                matched
                    .value
                    .handle(req, matched.params, self.state.clone())
                    .await
            }
            Err(_) => Err(RouterError::NotFound(format!("No route found for {}", path))),
        }
    }
}

/// Route handler function.
#[derive(Debug, Clone, Copy)]
enum RouteHandler {
    Live,
    Ready,
    Info,
    Register,
    Login,
    Refresh,
    Logout,
    Notes,
    Note,
}

impl RouteHandler {
    /// Handles a request with the given route parameters.
    async fn handle(
        &self,
        req: Request<hyper::body::Incoming>,
        params: matchit::Params<'_, '_>,
        state: AppState,
    ) -> Result<Response<Bytes>, RouterError> {
        let method = req.method().clone();
        match (self, method) {
            (RouteHandler::Live, Method::GET) => health::live(req, state).await,
            (RouteHandler::Ready, Method::GET) => health::ready(req, state).await,
            (RouteHandler::Info, Method::GET) => health::info(req, state).await,
            (RouteHandler::Register, Method::POST) => auth::register(req, state).await,
            (RouteHandler::Login, Method::POST) => auth::login(req, state).await,
            (RouteHandler::Refresh, Method::POST) => auth::refresh(req, state).await,
            (RouteHandler::Logout, Method::POST) => auth::logout(req, state).await,
            (RouteHandler::Notes, Method::GET) => notes::list_notes(req, state).await,
            (RouteHandler::Notes, Method::POST) => notes::create_note(req, state).await,
            (RouteHandler::Note, Method::GET) => notes::get_note(req, params, state).await,
            (RouteHandler::Note, Method::PUT) => notes::update_note(req, params, state).await,
            (RouteHandler::Note, Method::DELETE) => notes::delete_note(req, params, state).await,
            _ => Err(RouterError::MethodNotAllowed),
        }
    }
}

/// Router error type.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Internal Error: {0}")]
    InternalError(String),
    #[error("Request Timeout")]
    Timeout,
    #[error("Payload Too Large")]
    PayloadTooLarge,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unprocessable: {0}")]
    Unprocessable(String),
}

impl RouterError {
    pub fn status(&self) -> u16 {
        match self {
            RouterError::MethodNotAllowed => 405,
            RouterError::InternalError(_) => 500,
            RouterError::Timeout => 408,
            RouterError::PayloadTooLarge => 413,
            RouterError::BadRequest(_) => 400,
            RouterError::Unauthorized(_) => 401,
            RouterError::NotFound(_) => 404,
            RouterError::Conflict(_) => 409,
            RouterError::Unprocessable(_) => 422,
        }
    }
}

impl From<RouterError> for Response<Bytes> {
    fn from(err: RouterError) -> Self {
        let status = err.status();
        let message = match &err {
            RouterError::MethodNotAllowed => "Method Not Allowed".to_string(),
            RouterError::Timeout => "Request Timeout".to_string(),
            RouterError::PayloadTooLarge => "Payload Too Large".to_string(),
            RouterError::InternalError(msg)
            | RouterError::BadRequest(msg)
            | RouterError::Unauthorized(msg)
            | RouterError::NotFound(msg)
            | RouterError::Conflict(msg)
            | RouterError::Unprocessable(msg) => msg.clone(),
        };

        let error_response = handlers::error_response(status, message, None);
        let body = serde_json::to_vec(&error_response)
            .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":{{\"code\":\"500\",\"message\":\"Failed to serialize error: {}\"}}}}", e).into_bytes());

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Bytes::from(body))
            .unwrap_or_else(|_| {
                let mut fallback = Response::new(Bytes::from("Internal Server Error"));
                *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let response: Response<Bytes> = RouterError::Conflict("email taken".to_string()).into();
        assert_eq!(response.status(), 409);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "409");
        assert_eq!(body["error"]["message"], "email taken");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(RouterError::MethodNotAllowed.status(), 405);
        assert_eq!(RouterError::Unauthorized(String::new()).status(), 401);
        assert_eq!(RouterError::Unprocessable(String::new()).status(), 422);
        assert_eq!(RouterError::PayloadTooLarge.status(), 413);
    }

    #[test]
    fn test_routes_register() {
        let router = Router::new(Arc::new(NotesStore::new()), Arc::new(StubConfig::default()));
        assert!(router.inner.at("/notes/42").is_ok());
        assert_eq!(
            router.inner.at("/notes/42").unwrap().params.get("id"),
            Some("42")
        );
        assert!(router.inner.at("/healthz").is_ok());
        assert!(router.inner.at("/nope").is_err());
    }
}
