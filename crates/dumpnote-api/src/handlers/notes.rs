//! Note HTTP handlers.
//!
//! Every route is scoped to the authenticated user: notes owned by someone
//! else are reported as missing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use dumpnote_core::{Note, NoteChanges, NoteRepository, NoteSet, NoteSetRepository};

use crate::auth::RequireAuth;
use crate::filters::NotesQuery;
use crate::{ApiError, AppState};

/// Request body for posting a note.
#[derive(Debug, Deserialize)]
pub struct PostNoteRequest {
    pub body: String,
    /// Set to file the note in; omitted or `null` for none.
    #[serde(default)]
    pub set: Option<i64>,
}

/// Fetch a note owned by `owner`, or 404.
async fn owned_note(state: &AppState, owner: i64, id: i64) -> Result<Note, ApiError> {
    state
        .db
        .notes
        .get(id)
        .await?
        .filter(|note| note.owner == owner)
        .ok_or_else(|| ApiError::NotFound(format!("Note {} not found", id)))
}

/// Resolve a set the caller wants to file a note in. Unknown or foreign
/// sets are a bad request here, not a 404: the note route itself exists.
async fn target_set(state: &AppState, owner: i64, id: i64) -> Result<NoteSet, ApiError> {
    state
        .db
        .sets
        .get(id)
        .await?
        .filter(|set| set.owner == owner)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown set {}", id)))
}

/// List the caller's notes.
///
/// # Query Parameters
/// - `id`, `set`, `timestamp`: optional operator prefix then value
/// - `marked`: `true` or `false`
/// - `search`: body substring
/// - `offset`, `order` (`asc` | `desc`)
pub async fn list_notes(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(query): Query<NotesQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let request = query.into_request()?;
    let notes = state.db.notes.list_for_owner(auth.user.id, request).await?;
    Ok(Json(notes))
}

pub async fn post_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<PostNoteRequest>,
) -> Result<Json<Note>, ApiError> {
    let set = match body.set {
        Some(id) => Some(target_set(&state, auth.user.id, id).await?),
        None => None,
    };
    let note = state
        .db
        .notes
        .post(auth.user.id, &body.body, set.as_ref())
        .await?;
    Ok(Json(note))
}

pub async fn get_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(owned_note(&state, auth.user.id, id).await?))
}

/// Apply a partial update and return the note as stored.
pub async fn update_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
    Json(changes): Json<NoteChanges>,
) -> Result<Json<Note>, ApiError> {
    owned_note(&state, auth.user.id, id).await?;
    if let Some(Some(set)) = changes.set {
        target_set(&state, auth.user.id, set).await?;
    }
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    state.db.notes.edit(id, changes).await?;
    Ok(Json(owned_note(&state, auth.user.id, id).await?))
}

pub async fn delete_note(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    owned_note(&state, auth.user.id, id).await?;
    state.db.notes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
