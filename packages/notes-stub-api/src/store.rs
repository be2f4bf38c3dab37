//! Process-local user, token and note storage.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Store operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Email already registered
    #[error("email '{0}' already registered")]
    DuplicateEmail(String),

    /// Unknown email or wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Access or refresh token not recognised
    #[error("invalid token")]
    InvalidToken,

    /// Refresh token presented a second time
    #[error("refresh token reuse detected")]
    TokenReused,

    /// Note absent or owned by another user
    #[error("note {0} not found")]
    NoteNotFound(i64),
}

/// A stored note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub title: String,
    pub body: String,
    /// Incremented on every update
    pub version: u64,
}

/// Weak validator of a note's current content.
pub fn note_etag(note: &Note) -> String {
    let sum = crc32fast::hash(format!("{}|{}", note.title, note.body).as_bytes());
    format!("W/\"n-{}-{}-{:08x}\"", note.id, note.version, sum)
}

/// Weak validator of one page of a note listing.
pub fn collection_etag(page: usize, size: usize, q: &str, items: &[Note]) -> String {
    let max_id = items.iter().map(|n| n.id).max().unwrap_or(0);
    let sum = crc32fast::hash(q.to_lowercase().as_bytes());
    format!(
        "W/\"notes-{}-{}-{}-{}-{:08x}\"",
        max_id,
        items.len(),
        page,
        size,
        sum
    )
}

/// Tokens issued by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug)]
struct User {
    id: i64,
    salt: String,
    password_hash: u32,
}

#[derive(Debug)]
struct RefreshToken {
    user_id: i64,
    used: bool,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, User>,
    access_tokens: HashMap<String, i64>,
    refresh_tokens: HashMap<String, RefreshToken>,
    notes: BTreeMap<i64, Note>,
    next_user_id: i64,
    next_note_id: i64,
}

impl Inner {
    fn issue_tokens(&mut self, user_id: i64) -> TokenPair {
        let access = new_token();
        let refresh = new_token();
        self.access_tokens.insert(access.clone(), user_id);
        self.refresh_tokens.insert(
            refresh.clone(),
            RefreshToken {
                user_id,
                used: false,
            },
        );
        TokenPair { access, refresh }
    }

    fn owned_note_mut(&mut self, user_id: i64, id: i64) -> Result<&mut Note, StoreError> {
        self.notes
            .get_mut(&id)
            .filter(|n| n.user_id == user_id)
            .ok_or(StoreError::NoteNotFound(id))
    }
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

// Not a password hash in any security sense; the stub only needs equality.
fn hash_password(salt: &str, password: &str) -> u32 {
    crc32fast::hash(format!("{}|{}", salt, password).as_bytes())
}

/// Thread-safe in-memory store behind the stub routes.
#[derive(Debug, Default)]
pub struct NotesStore {
    inner: RwLock<Inner>,
}

impl NotesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a user and returns its id.
    pub fn register(&self, email: &str, password: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.write();
        if inner.users.contains_key(email) {
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }
        inner.next_user_id += 1;
        let id = inner.next_user_id;
        let salt = new_token();
        let password_hash = hash_password(&salt, password);
        inner.users.insert(
            email.to_string(),
            User {
                id,
                salt,
                password_hash,
            },
        );
        Ok(id)
    }

    /// Verifies credentials and issues an access/refresh pair.
    pub fn login(&self, email: &str, password: &str) -> Result<TokenPair, StoreError> {
        let mut inner = self.inner.write();
        let user_id = match inner.users.get(email) {
            Some(user) if hash_password(&user.salt, password) == user.password_hash => user.id,
            _ => return Err(StoreError::InvalidCredentials),
        };
        Ok(inner.issue_tokens(user_id))
    }

    /// Rotates a refresh token. Presenting a spent token is reported as reuse.
    pub fn refresh(&self, refresh: &str) -> Result<TokenPair, StoreError> {
        let mut inner = self.inner.write();
        let entry = inner
            .refresh_tokens
            .get_mut(refresh)
            .ok_or(StoreError::InvalidToken)?;
        if entry.used {
            return Err(StoreError::TokenReused);
        }
        entry.used = true;
        let user_id = entry.user_id;
        Ok(inner.issue_tokens(user_id))
    }

    /// Revokes an access token.
    pub fn logout(&self, access: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .access_tokens
            .remove(access)
            .map(|_| ())
            .ok_or(StoreError::InvalidToken)
    }

    /// Resolves an access token to its user id.
    pub fn authenticate(&self, access: &str) -> Option<i64> {
        self.inner.read().access_tokens.get(access).copied()
    }

    pub fn create_note(&self, user_id: i64, title: &str, body: &str) -> Note {
        let mut inner = self.inner.write();
        inner.next_note_id += 1;
        let note = Note {
            id: inner.next_note_id,
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            version: 1,
        };
        inner.notes.insert(note.id, note.clone());
        note
    }

    pub fn get_note(&self, user_id: i64, id: i64) -> Result<Note, StoreError> {
        self.inner
            .read()
            .notes
            .get(&id)
            .filter(|n| n.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NoteNotFound(id))
    }

    pub fn update_note(
        &self,
        user_id: i64,
        id: i64,
        title: &str,
        body: &str,
    ) -> Result<Note, StoreError> {
        let mut inner = self.inner.write();
        let note = inner.owned_note_mut(user_id, id)?;
        note.title = title.to_string();
        note.body = body.to_string();
        note.version += 1;
        Ok(note.clone())
    }

    pub fn delete_note(&self, user_id: i64, id: i64) -> Result<Note, StoreError> {
        let mut inner = self.inner.write();
        inner.owned_note_mut(user_id, id)?;
        inner.notes.remove(&id).ok_or(StoreError::NoteNotFound(id))
    }

    /// One page (1-based) of the user's notes, newest first, optionally
    /// filtered by a case-insensitive substring of title or body. Also
    /// returns the total number of matches.
    pub fn list_notes(&self, user_id: i64, page: usize, size: usize, q: &str) -> (Vec<Note>, usize) {
        let needle = q.to_lowercase();
        let inner = self.inner.read();
        let matches: Vec<&Note> = inner
            .notes
            .values()
            .rev()
            .filter(|n| n.user_id == user_id)
            .filter(|n| {
                needle.is_empty()
                    || n.title.to_lowercase().contains(&needle)
                    || n.body.to_lowercase().contains(&needle)
            })
            .collect();
        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(page.saturating_sub(1) * size)
            .take(size)
            .cloned()
            .collect();
        (items, total)
    }

    pub fn user_count(&self) -> usize {
        self.inner.read().users.len()
    }
}
