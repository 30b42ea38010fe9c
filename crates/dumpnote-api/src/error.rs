//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use dumpnote_core::{logging, Error};

/// Error returned by handlers. Renders as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    Internal(Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_unique_violation() {
            return ApiError::Conflict(err.to_string());
        }
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(err) => {
                error!(
                    { logging::SUBSYSTEM } = "api",
                    { logging::ERROR_MSG } = %err,
                    "Request failed"
                );
                err.to_string()
            }
            ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg) => msg,
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_core_errors_map_to_status() {
        assert_eq!(status_of(Error::NotFound("n".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::InvalidInput("i".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::Conflict("c".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Error::Statement("s".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(Error::Database(sqlx::Error::PoolTimedOut)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unique_violation_is_conflict() {
        assert_eq!(
            status_of(dumpnote_db::test_fixtures::unique_violation()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_bad_request_keeps_message() {
        match ApiError::from(Error::InvalidInput("Expected boolean at marked=yes".into())) {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Expected boolean at marked=yes"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
