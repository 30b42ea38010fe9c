//! Note repository implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tracing::debug;

use dumpnote_core::defaults::NO_SET;
use dumpnote_core::{
    logging, Error, ListNotesRequest, Note, NoteChanges, NoteRepository, NoteSet, Predicate,
    Result, SortOrder, SqlValue,
};

use crate::executor::Executor;
use crate::schema::NOTES;
use crate::table::Table;
use crate::RepositoryConfig;

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    executor: Arc<dyn Executor>,
    config: RepositoryConfig,
}

impl PgNoteRepository {
    pub fn new(executor: Arc<dyn Executor>, config: RepositoryConfig) -> Self {
        Self { executor, config }
    }

    fn table(&self) -> Table<'_> {
        Table::new(self.executor.as_ref(), &NOTES)
    }
}

/// One page of notes matching `predicate`, ordered by id.
pub(crate) async fn list_page(
    table: Table<'_>,
    predicate: Predicate,
    order: SortOrder,
    page_size: u64,
    offset: Option<u64>,
) -> Result<Vec<Note>> {
    table
        .select(&["*"])
        .filter(predicate)
        .order_by("id", order)
        .limit(page_size)
        .offset(offset.unwrap_or(0))
        .execute()
        .await?
        .decode_all()
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list_for_owner(&self, owner: i64, req: ListNotesRequest) -> Result<Vec<Note>> {
        let predicate = Predicate::eq("owner", owner).and_all(req.filters);
        list_page(
            self.table(),
            predicate,
            req.order,
            self.config.page_size,
            req.offset,
        )
        .await
    }

    async fn post(&self, owner: i64, body: &str, set: Option<&NoteSet>) -> Result<Note> {
        // Postgres keeps microseconds; truncate so the returned note matches a re-fetch.
        let timestamp = Utc::now().trunc_subsecs(6);
        let set = set.map(|s| s.id);

        let id = self
            .table()
            .insert_with_next_id(self.config.id_allocation_attempts, |id| {
                vec![
                    SqlValue::Int(id),
                    SqlValue::Int(owner),
                    SqlValue::Int(set.unwrap_or(NO_SET)),
                    SqlValue::Timestamp(timestamp),
                    SqlValue::from(body),
                    SqlValue::Bool(false),
                ]
            })
            .await?;

        debug!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "notes",
            { logging::OPERATION } = "post",
            { logging::NOTE_ID } = id,
            { logging::USER_ID } = owner,
            "Note posted"
        );
        Ok(Note {
            id,
            owner,
            set,
            timestamp,
            body: body.to_string(),
            marked: false,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Note>> {
        self.table()
            .select(&["*"])
            .filter(Predicate::eq("id", id))
            .limit(1)
            .execute()
            .await?
            .decode_first()
    }

    async fn edit(&self, id: i64, changes: NoteChanges) -> Result<()> {
        let result = self
            .table()
            .update(&Predicate::eq("id", id), &changes.assignments())
            .await?;
        if result.row_count == 0 {
            return Err(Error::NotFound(format!("Note {} not found", id)));
        }
        debug!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "notes",
            { logging::OPERATION } = "edit",
            { logging::NOTE_ID } = id,
            "Note updated"
        );
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = self.table().delete(&Predicate::eq("id", id)).await?;
        debug!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "notes",
            { logging::OPERATION } = "delete",
            { logging::NOTE_ID } = id,
            { logging::ROW_COUNT } = result.row_count,
            "Note deleted"
        );
        Ok(())
    }

    async fn next_id(&self) -> Result<i64> {
        self.table().next_id().await
    }
}
