//! Structured logging field name constants for dumpnote.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic retry applied |
//! | INFO  | Lifecycle events (startup, shutdown, pool established) |
//! | DEBUG | Executed statements, entity creation and deletion |
//! | TRACE | Statement text, cache hits and misses |
//!
//! Bound parameter values are never logged.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "executor", "pool", "table", "users", "notes", "sets"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "select", "insert", "create_or_get", "cascade_delete"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// User id being operated on.
pub const USER_ID: &str = "user_id";

/// Note id being operated on.
pub const NOTE_ID: &str = "note_id";

/// Note set id being operated on.
pub const SET_ID: &str = "set_id";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of bound parameters in a statement.
pub const PARAM_COUNT: &str = "param_count";

/// Number of rows returned or affected.
pub const ROW_COUNT: &str = "row_count";

/// Retry attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_distinct() {
        let mut names = vec![
            SUBSYSTEM,
            COMPONENT,
            OPERATION,
            USER_ID,
            NOTE_ID,
            SET_ID,
            DB_TABLE,
            DURATION_MS,
            PARAM_COUNT,
            ROW_COUNT,
            ATTEMPT,
            ERROR_MSG,
        ];
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
