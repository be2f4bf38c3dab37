//! Note CRUD with ETag revalidation.

use hyper::{body::Bytes, Request, Response};
use serde::Deserialize;

use crate::router::{AppState, RouterError};
use crate::store::{collection_etag, note_etag, Note};

use super::request_utils::{
    authenticate, build_empty_response, if_none_match_hits, json_response, map_store_error,
    parse_query, read_json, MatchitParams,
};

/// Body of `POST /notes` and `PUT /notes/{id}`.
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Creates a note for the authenticated user.
///
/// # Endpoint
/// `POST /notes`
///
/// # Response
/// - **200 OK**: the stored note, with `ETag`
/// - **400 Bad Request**: malformed JSON or blank title
/// - **401 Unauthorized**: missing or unknown bearer token
pub async fn create_note(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let user_id = authenticate(req.headers(), &state)?;
    let input = parse_note_request(req, &state).await?;

    let note = state.store.create_note(user_id, &input.title, &input.body);
    tracing::debug!(note_id = note.id, user_id, "created note");

    let mut value = serde_json::to_value(&note)
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize note: {}", e)))?;
    if state.config.omit_note_id {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("id");
        }
    }
    json_response(200, &value, etag_for(&state, &note))
}

/// Fetches one note.
///
/// # Endpoint
/// `GET /notes/{id}`
///
/// # Response
/// - **200 OK**: the note, with `ETag` and `Cache-Control`
/// - **304 Not Modified**: `If-None-Match` equals the current ETag
/// - **400 Bad Request**: non-numeric id
/// - **404 Not Found**: absent or owned by someone else
pub async fn get_note(
    req: Request<hyper::body::Incoming>,
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let user_id = authenticate(req.headers(), &state)?;
    let id = note_id_param(&params)?;
    let note = state.store.get_note(user_id, id).map_err(map_store_error)?;

    let etag = note_etag(&note);
    if if_none_match_hits(req.headers(), &etag) {
        return build_empty_response(304);
    }
    json_response(200, &note, etag_for(&state, &note))
}

/// `PUT /notes/{id}`: replaces title and body, bumping the version.
///
/// Unlike create, a blank title is stored as given.
pub async fn update_note(
    req: Request<hyper::body::Incoming>,
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let user_id = authenticate(req.headers(), &state)?;
    let id = note_id_param(&params)?;
    let mut input: NoteRequest = read_json(req, &state).await?;
    input.title = input.title.trim().to_string();

    let note = state
        .store
        .update_note(user_id, id, &input.title, &input.body)
        .map_err(map_store_error)?;
    json_response(200, &note, etag_for(&state, &note))
}

/// `DELETE /notes/{id}`: returns the removed note and its last ETag.
pub async fn delete_note(
    req: Request<hyper::body::Incoming>,
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let user_id = authenticate(req.headers(), &state)?;
    let id = note_id_param(&params)?;
    let note = state
        .store
        .delete_note(user_id, id)
        .map_err(map_store_error)?;
    json_response(200, &note, etag_for(&state, &note))
}

/// Lists the user's notes.
///
/// # Endpoint
/// `GET /notes?page=1&size=20&q=text`
///
/// `page` defaults to 1; `size` outside 1-100 becomes 20. Responds 304 when
/// `If-None-Match` equals the page's collection ETag.
pub async fn list_notes(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let user_id = authenticate(req.headers(), &state)?;

    let mut page = 1usize;
    let mut size = 20usize;
    let mut q = String::new();
    for (key, value) in parse_query(req.uri().query()) {
        match key.as_str() {
            "page" => page = value.parse().ok().filter(|p| *p >= 1).unwrap_or(1),
            "size" => {
                size = value
                    .parse()
                    .ok()
                    .filter(|s| (1..=100).contains(s))
                    .unwrap_or(20)
            }
            "q" => q = value,
            _ => {}
        }
    }

    let (items, total) = state.store.list_notes(user_id, page, size, &q);
    let etag = collection_etag(page, size, &q, &items);
    if if_none_match_hits(req.headers(), &etag) {
        return build_empty_response(304);
    }

    let body = serde_json::json!({
        "items": items,
        "total": total,
        "page": page,
        "size": size,
    });
    let etag = (!state.config.omit_etag).then_some(etag);
    json_response(200, &body, etag)
}

async fn parse_note_request(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<NoteRequest, RouterError> {
    let mut input: NoteRequest = read_json(req, state).await?;
    input.title = input.title.trim().to_string();
    if input.title.is_empty() {
        return Err(RouterError::BadRequest("title is required".to_string()));
    }
    Ok(input)
}

fn note_id_param(params: &MatchitParams<'_, '_>) -> Result<i64, RouterError> {
    let raw = params.get("id").unwrap_or("");
    raw.parse()
        .map_err(|_| RouterError::BadRequest(format!("invalid note id '{}'", raw)))
}

fn etag_for(state: &AppState, note: &Note) -> Option<String> {
    (!state.config.omit_etag).then(|| note_etag(note))
}
