//! Note set HTTP handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use dumpnote_core::{Note, NoteSet, NoteSetChanges, NoteSetRepository, NoteSetType};

use crate::auth::RequireAuth;
use crate::filters::PageQuery;
use crate::{ApiError, AppState};

/// Request body for creating a set.
#[derive(Debug, Deserialize)]
pub struct CreateSetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub set_type: NoteSetType,
}

async fn owned_set(state: &AppState, owner: i64, id: i64) -> Result<NoteSet, ApiError> {
    state
        .db
        .sets
        .get(id)
        .await?
        .filter(|set| set.owner == owner)
        .ok_or_else(|| ApiError::NotFound(format!("Set {} not found", id)))
}

pub async fn list_sets(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<NoteSet>>, ApiError> {
    let sets = state
        .db
        .sets
        .list_for_owner(auth.user.id, page.offset()?)
        .await?;
    Ok(Json(sets))
}

pub async fn create_set(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateSetRequest>,
) -> Result<Json<NoteSet>, ApiError> {
    let set = state
        .db
        .sets
        .create(auth.user.id, &body.name, body.set_type)
        .await?;
    Ok(Json(set))
}

pub async fn get_set(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<NoteSet>, ApiError> {
    Ok(Json(owned_set(&state, auth.user.id, id).await?))
}

/// Notes filed in a set, one page at a time.
pub async fn list_set_notes(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    owned_set(&state, auth.user.id, id).await?;
    let notes = state.db.sets.notes(id, page.offset()?).await?;
    Ok(Json(notes))
}

pub async fn update_set(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
    Json(changes): Json<NoteSetChanges>,
) -> Result<Json<NoteSet>, ApiError> {
    owned_set(&state, auth.user.id, id).await?;
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    state.db.sets.edit(id, changes).await?;
    Ok(Json(owned_set(&state, auth.user.id, id).await?))
}

/// Delete a set together with every note filed in it.
pub async fn delete_set(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    owned_set(&state, auth.user.id, id).await?;
    state.db.sets.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
