//! HTTP handlers for dumpnote-api.

pub mod notes;
pub mod sets;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::auth::Auth;

/// Liveness check.
pub async fn ping() -> StatusCode {
    StatusCode::OK
}

/// Whether the request carries an authenticated identity.
pub async fn auth_status(auth: Auth) -> Json<Value> {
    Json(json!({ "authed": auth.user.is_some() }))
}
