//! Request authentication.
//!
//! OAuth runs in an authenticating proxy in front of this server. The proxy
//! forwards the provider's subject, display name and email in the
//! `X-Auth-*` headers; the first request for a subject creates the user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use dumpnote_core::{NewUser, User, UserRepository};

use crate::{ApiError, AppState};

pub const SUBJECT_HEADER: &str = "x-auth-subject";
pub const NAME_HEADER: &str = "x-auth-name";
pub const EMAIL_HEADER: &str = "x-auth-email";

/// Body of the 401 returned for anonymous requests.
pub const UNAUTHENTICATED: &str = "Unauthenticated!";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Identity forwarded by the proxy, if any.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<NewUser> {
    let gid = header(headers, SUBJECT_HEADER)?;
    Some(NewUser {
        name: header(headers, NAME_HEADER).unwrap_or_else(|| gid.clone()),
        email: header(headers, EMAIL_HEADER).unwrap_or_default(),
        gid,
    })
}

/// The requesting user, or `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct Auth {
    pub user: Option<User>,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match identity_from_headers(&parts.headers) {
            Some(identity) => Some(state.db.users.create_or_get(identity).await?),
            None => None,
        };
        Ok(Auth { user })
    }
}

/// Extractor that requires an authenticated user.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub user: User,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = Auth::from_request_parts(parts, state).await?;
        match auth.user {
            Some(user) => Ok(RequireAuth { user }),
            None => Err(ApiError::Unauthorized(UNAUTHENTICATED.to_string())),
        }
    }
}
