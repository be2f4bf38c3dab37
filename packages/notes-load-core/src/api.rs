//! Request and response bodies of the notes API.
//!
//! Response fields are all optional: a body that is missing a field, or is
//! not JSON at all, yields `None` instead of an error so that the workload
//! can fail the dependent checks deterministically.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Domain used for synthetic accounts.
pub const EMAIL_DOMAIN: &str = "t.io";

/// Credentials sent to `/auth/register` and `/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Builds the synthetic account for a sequence index.
    ///
    /// The email is `u{index % modulus}@t.io`, so at most `modulus` distinct
    /// accounts are ever registered. `modulus` must be non-zero.
    pub fn for_index(index: u64, modulus: u64, password: &str) -> Self {
        Self {
            email: format!("u{}@{}", index % modulus, EMAIL_DOMAIN),
            password: password.to_string(),
        }
    }
}

/// Body of `POST /notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNote {
    pub title: String,
    pub body: String,
}

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl LoginResponse {
    /// Access token, if present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.access.as_deref().filter(|t| !t.is_empty())
    }
}

/// Note identifier. The service returns numbers, but strings are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NoteId {
    Number(i64),
    Text(String),
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteId::Number(n) => write!(f, "{}", n),
            NoteId::Text(s) => f.write_str(s),
        }
    }
}

/// Body of a successful `POST /notes`.
#[derive(Debug, Default, Deserialize)]
pub struct CreatedNote {
    #[serde(default)]
    pub id: Option<NoteId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl CreatedNote {
    /// Note id, if present. Empty string ids count as absent.
    pub fn note_id(&self) -> Option<&NoteId> {
        match &self.id {
            Some(NoteId::Text(s)) if s.is_empty() => None,
            other => other.as_ref(),
        }
    }
}

/// Decodes a response body, treating anything undecodable as an empty object.
pub fn parse_body<T: DeserializeOwned + Default>(bytes: &[u8]) -> T {
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Response body is not the expected JSON: {}", e);
            T::default()
        }
    }
}
