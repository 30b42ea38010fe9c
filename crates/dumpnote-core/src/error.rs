//! Error types for dumpnote.

use thiserror::Error;

/// Result type alias using dumpnote's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// SQLSTATE reported by PostgreSQL for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Core error type for dumpnote operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Statement text and parameter list disagree
    #[error("Statement error: {0}")]
    Statement(String),

    /// A result row could not be mapped to an entity
    #[error("Decode error: {0}")]
    Decode(String),

    /// Concurrent writers kept colliding on the same identifier
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error is a unique constraint violation raised by the database.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("note 7".to_string());
        assert_eq!(err.to_string(), "Not found: note 7");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("unknown column".to_string());
        assert_eq!(err.to_string(), "Invalid input: unknown column");
    }

    #[test]
    fn test_error_display_statement() {
        let err = Error::Statement("2 placeholders, 3 parameters".to_string());
        assert_eq!(
            err.to_string(),
            "Statement error: 2 placeholders, 3 parameters"
        );
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict("id allocation".to_string());
        assert_eq!(err.to_string(), "Conflict: id allocation");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!Error::Conflict("x".to_string()).is_unique_violation());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_unique_violation());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
