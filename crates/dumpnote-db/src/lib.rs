//! # dumpnote-db
//!
//! PostgreSQL database layer for dumpnote.
//!
//! This crate provides:
//! - Connection pool management
//! - The execution boundary ([`Executor`]) and statement finalization
//! - [`Table`] and [`QueryBuilder`] on top of the predicate compiler
//! - Repository implementations for users, notes and note sets
//! - A bounded identity cache for users
//!
//! ## Example
//!
//! ```rust,ignore
//! use dumpnote_db::{Database, NewUser, NoteRepository, UserRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/dumpnote").await?;
//!
//!     let user = db.users.create_or_get(NewUser {
//!         gid: "google-oauth2|123".to_string(),
//!         name: "Ada".to_string(),
//!         email: "ada@example.com".to_string(),
//!     }).await?;
//!     let note = db.notes.post(user.id, "Hello, world!", None).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod executor;
pub mod notes;
pub mod pool;
pub mod query;
pub mod row;
pub mod schema;
pub mod sets;
pub mod statement;
pub mod table;
pub mod users;

// Always compiled so integration tests (in tests/) can use the fixtures.
pub mod test_fixtures;

use std::sync::Arc;

use sqlx::PgPool;

// Re-export core types
pub use dumpnote_core::*;

pub use cache::IdentityCache;
pub use executor::{Executor, PgExecutor};
pub use notes::PgNoteRepository;
pub use pool::{
    create_lazy_pool, create_pool, create_pool_with_config, log_pool_metrics, PoolConfig,
};
pub use query::QueryBuilder;
pub use row::{DecodeRow, QueryResult, Row};
pub use sets::PgNoteSetRepository;
pub use statement::{Statement, StatementKind};
pub use table::Table;
pub use users::PgUserRepository;

/// Escape LIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Tuning shared by the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Rows per listing page.
    pub page_size: u64,
    /// Users held in the identity cache.
    pub user_cache_capacity: usize,
    /// Insert attempts before id allocation gives up.
    pub id_allocation_attempts: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::PAGE_SIZE,
            user_cache_capacity: defaults::USER_CACHE_CAPACITY,
            id_allocation_attempts: defaults::ID_ALLOCATION_ATTEMPTS,
        }
    }
}

impl RepositoryConfig {
    pub fn page_size(mut self, n: u64) -> Self {
        self.page_size = n;
        self
    }

    pub fn user_cache_capacity(mut self, n: usize) -> Self {
        self.user_cache_capacity = n;
        self
    }

    pub fn id_allocation_attempts(mut self, n: u32) -> Self {
        self.id_allocation_attempts = n;
        self
    }
}

/// Combined database context with all repositories.
///
/// Clones share the pool and the user identity cache.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: PgPool,
    /// User repository with the identity cache.
    pub users: PgUserRepository,
    /// Note repository.
    pub notes: PgNoteRepository,
    /// Note set repository.
    pub sets: PgNoteSetRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, RepositoryConfig::default())
    }

    pub fn with_config(pool: PgPool, config: RepositoryConfig) -> Self {
        let executor: Arc<dyn Executor> = Arc::new(PgExecutor::new(pool.clone()));
        Self {
            users: PgUserRepository::new(executor.clone(), config),
            notes: PgNoteRepository::new(executor.clone(), config),
            sets: PgNoteSetRepository::new(executor, config),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool and repository configuration.
    pub async fn connect_with_config(
        url: &str,
        pool_config: PoolConfig,
        config: RepositoryConfig,
    ) -> Result<Self> {
        let pool = create_pool_with_config(url, pool_config).await?;
        Ok(Self::with_config(pool, config))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
