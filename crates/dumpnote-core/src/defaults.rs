//! Default values shared across dumpnote crates.

/// Notes and note sets returned per listing page.
pub const PAGE_SIZE: u64 = 50;

/// Maximum number of users held by the identity cache.
pub const USER_CACHE_CAPACITY: usize = 1000;

/// How many times an id allocation is retried after colliding with a
/// concurrent insert.
pub const ID_ALLOCATION_ATTEMPTS: u32 = 5;

/// Connections the pool may open.
pub const POOL_MAX_CONNECTIONS: u32 = 10;

/// Connections the pool keeps open while idle.
pub const POOL_MIN_CONNECTIONS: u32 = 1;

/// Seconds a request waits for a free connection.
pub const POOL_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Seconds before an idle connection above the minimum is closed.
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 600;

/// Seconds before any connection is recycled.
pub const POOL_MAX_LIFETIME_SECS: u64 = 1800;

/// Stored in `notes.set` for a note that belongs to no set.
pub const NO_SET: i64 = -1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_not_a_valid_id() {
        // Ids are allocated from COALESCE(MAX(id), -1) + 1, so they start at 0.
        assert!(NO_SET < 0);
    }

    #[test]
    fn test_pool_floor_fits_under_ceiling() {
        assert!(POOL_MIN_CONNECTIONS <= POOL_MAX_CONNECTIONS);
    }

    #[test]
    fn test_retry_budget_is_positive() {
        assert!(ID_ALLOCATION_ATTEMPTS >= 1);
    }
}
