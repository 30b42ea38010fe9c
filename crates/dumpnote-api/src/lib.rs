//! # dumpnote-api
//!
//! HTTP surface for dumpnote: notes and note sets for the user identified
//! by the authenticating proxy.

pub mod auth;
pub mod config;
pub mod error;
pub mod filters;
pub mod handlers;

use axum::{
    routing::get,
    Router,
};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use dumpnote_db::Database;

pub use config::ServerConfig;
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    use handlers::{notes, sets};

    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/authstatus", get(handlers::auth_status))
        .route("/notes", get(notes::list_notes).post(notes::post_note))
        .route(
            "/notes/:id",
            get(notes::get_note)
                .patch(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/sets", get(sets::list_sets).post(sets::create_set))
        .route(
            "/sets/:id",
            get(sets::get_set)
                .patch(sets::update_set)
                .delete(sets::delete_set),
        )
        .route("/sets/:id/notes", get(sets::list_set_notes))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}
