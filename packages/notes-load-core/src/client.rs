//! HTTP client for the notes API.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, RequestBuilder};

use crate::api::{Credentials, NewNote, NoteId};
use crate::config::LoadConfig;
use crate::error::LoadError;

/// Bytes escaped in a path segment: everything but RFC 3986 unreserved.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Status, ETag and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub body: Vec<u8>,
}

/// Thin typed wrapper over a pooled `reqwest::Client`.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct NotesClient {
    http: Client,
    base_url: String,
}

impl NotesClient {
    /// Creates a client for `config.base_url` with the configured timeout.
    pub fn new(config: &LoadConfig) -> Result<Self, LoadError> {
        let base_url = crate::config::normalize_base_url(&config.base_url)?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.vus.max(1))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /healthz`
    pub async fn health(&self) -> Result<RawResponse, LoadError> {
        self.send(self.http.get(self.url("/healthz"))).await
    }

    /// `GET /readyz`
    pub async fn ready(&self) -> Result<RawResponse, LoadError> {
        self.send(self.http.get(self.url("/readyz"))).await
    }

    /// `POST /auth/register`
    pub async fn register(&self, creds: &Credentials) -> Result<RawResponse, LoadError> {
        self.send(self.http.post(self.url("/auth/register")).json(creds))
            .await
    }

    /// `POST /auth/login`
    pub async fn login(&self, creds: &Credentials) -> Result<RawResponse, LoadError> {
        self.send(self.http.post(self.url("/auth/login")).json(creds))
            .await
    }

    /// `POST /notes` with a bearer token.
    pub async fn create_note(&self, token: &str, note: &NewNote) -> Result<RawResponse, LoadError> {
        self.send(
            self.http
                .post(self.url("/notes"))
                .bearer_auth(token)
                .json(note),
        )
        .await
    }

    /// `GET /notes/{id}`, conditional when `if_none_match` is given.
    pub async fn get_note(
        &self,
        token: &str,
        id: &NoteId,
        if_none_match: Option<&str>,
    ) -> Result<RawResponse, LoadError> {
        let mut request = self
            .http
            .get(self.url(&note_path(id)))
            .bearer_auth(token);
        if let Some(etag) = if_none_match {
            request = request.header(IF_NONE_MATCH, etag);
        }
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<RawResponse, LoadError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        tracing::debug!(status, etag = etag.as_deref(), bytes = body.len(), "response received");

        Ok(RawResponse { status, etag, body })
    }
}

/// `/notes/{id}` with the id escaped as a single path segment.
fn note_path(id: &NoteId) -> String {
    format!(
        "/notes/{}",
        utf8_percent_encode(&id.to_string(), PATH_SEGMENT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_path_escapes_text_ids() {
        assert_eq!(note_path(&NoteId::Number(42)), "/notes/42");
        assert_eq!(note_path(&NoteId::Text("n-9_x.y~".to_string())), "/notes/n-9_x.y~");
        assert_eq!(note_path(&NoteId::Text("a/b".to_string())), "/notes/a%2Fb");
        assert_eq!(note_path(&NoteId::Text("x?y#z".to_string())), "/notes/x%3Fy%23z");
        assert_eq!(note_path(&NoteId::Text("a b%".to_string())), "/notes/a%20b%25");
    }
}
