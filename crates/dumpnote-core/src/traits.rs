//! Repository traits for dumpnote entities.
//!
//! These traits define the interfaces the PostgreSQL implementations in
//! `dumpnote-db` satisfy, so the HTTP layer can depend on behavior rather
//! than on a concrete backend.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::*;
use crate::predicate::Predicate;

/// Sort direction for listings. Listings sort by id, which follows
/// allocation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Request for listing a user's notes.
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// Extra predicates, each ANDed onto the owner scope.
    pub filters: Vec<Predicate>,
    /// Rows to skip. Ignored unless paging is active.
    pub offset: Option<u64>,
    pub order: SortOrder,
}

/// Repository for users and their identity cache.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user by id, consulting the identity cache first.
    async fn resolve(&self, id: i64) -> Result<Option<User>>;

    /// Return the user with this external id, creating it on first login.
    async fn create_or_get(&self, new_user: NewUser) -> Result<User>;

    /// Update a user's profile and drop it from the identity cache.
    async fn edit(&self, id: i64, changes: UserChanges) -> Result<()>;

    /// Next free user id (`MAX(id) + 1`, or 0 for an empty table).
    async fn next_id(&self) -> Result<i64>;
}

/// Repository for notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Notes owned by `owner` matching every extra filter, one page at a time.
    async fn list_for_owner(&self, owner: i64, req: ListNotesRequest) -> Result<Vec<Note>>;

    /// Create a note stamped with the current time and unmarked.
    async fn post(&self, owner: i64, body: &str, set: Option<&NoteSet>) -> Result<Note>;

    /// Fetch a note by id.
    async fn get(&self, id: i64) -> Result<Option<Note>>;

    /// Apply a partial update scoped to `id = id`.
    async fn edit(&self, id: i64, changes: NoteChanges) -> Result<()>;

    /// Delete a note by id.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Next free note id.
    async fn next_id(&self) -> Result<i64>;
}

/// Repository for note sets.
#[async_trait]
pub trait NoteSetRepository: Send + Sync {
    /// Sets owned by `owner`, one page at a time.
    async fn list_for_owner(&self, owner: i64, offset: Option<u64>) -> Result<Vec<NoteSet>>;

    /// Create a set.
    async fn create(&self, owner: i64, name: &str, set_type: NoteSetType) -> Result<NoteSet>;

    /// Fetch a set by id.
    async fn get(&self, id: i64) -> Result<Option<NoteSet>>;

    /// Notes filed in the set, one page at a time.
    async fn notes(&self, id: i64, offset: Option<u64>) -> Result<Vec<Note>>;

    /// Apply a partial update scoped to `id = id`.
    async fn edit(&self, id: i64, changes: NoteSetChanges) -> Result<()>;

    /// Delete the set and every note filed in it.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Next free set id.
    async fn next_id(&self) -> Result<i64>;
}
