//! Note set repository implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use dumpnote_core::{
    logging, Error, Note, NoteSet, NoteSetChanges, NoteSetRepository, NoteSetType, Predicate,
    Result, SortOrder, SqlValue,
};

use crate::executor::Executor;
use crate::notes::list_page;
use crate::schema::{NOTES, SETS};
use crate::table::Table;
use crate::RepositoryConfig;

/// PostgreSQL implementation of NoteSetRepository.
#[derive(Clone)]
pub struct PgNoteSetRepository {
    executor: Arc<dyn Executor>,
    config: RepositoryConfig,
}

impl PgNoteSetRepository {
    pub fn new(executor: Arc<dyn Executor>, config: RepositoryConfig) -> Self {
        Self { executor, config }
    }

    fn table(&self) -> Table<'_> {
        Table::new(self.executor.as_ref(), &SETS)
    }

    fn notes_table(&self) -> Table<'_> {
        Table::new(self.executor.as_ref(), &NOTES)
    }
}

#[async_trait]
impl NoteSetRepository for PgNoteSetRepository {
    async fn list_for_owner(&self, owner: i64, offset: Option<u64>) -> Result<Vec<NoteSet>> {
        self.table()
            .select(&["*"])
            .filter(Predicate::eq("owner", owner))
            .order_by("id", SortOrder::Asc)
            .limit(self.config.page_size)
            .offset(offset.unwrap_or(0))
            .execute()
            .await?
            .decode_all()
    }

    async fn create(&self, owner: i64, name: &str, set_type: NoteSetType) -> Result<NoteSet> {
        let id = self
            .table()
            .insert_with_next_id(self.config.id_allocation_attempts, |id| {
                vec![
                    SqlValue::Int(id),
                    SqlValue::Int(owner),
                    SqlValue::from(name),
                    SqlValue::from(set_type.as_str()),
                ]
            })
            .await?;

        info!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "sets",
            { logging::OPERATION } = "create",
            { logging::SET_ID } = id,
            { logging::USER_ID } = owner,
            "Note set created"
        );
        Ok(NoteSet {
            id,
            owner,
            name: name.to_string(),
            set_type,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<NoteSet>> {
        self.table()
            .select(&["*"])
            .filter(Predicate::eq("id", id))
            .limit(1)
            .execute()
            .await?
            .decode_first()
    }

    async fn notes(&self, id: i64, offset: Option<u64>) -> Result<Vec<Note>> {
        list_page(
            self.notes_table(),
            Predicate::eq("set", id),
            SortOrder::Asc,
            self.config.page_size,
            offset,
        )
        .await
    }

    async fn edit(&self, id: i64, changes: NoteSetChanges) -> Result<()> {
        let result = self
            .table()
            .update(&Predicate::eq("id", id), &changes.assignments())
            .await?;
        if result.row_count == 0 {
            return Err(Error::NotFound(format!("Set {} not found", id)));
        }
        debug!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "sets",
            { logging::OPERATION } = "edit",
            { logging::SET_ID } = id,
            "Note set updated"
        );
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // Notes first, then the set, in one transaction.
        let statements = [
            self.notes_table()
                .delete_statement(&Predicate::eq("set", id))?,
            self.table().delete_statement(&Predicate::eq("id", id))?,
        ];
        let results = self.executor.execute_atomic(&statements).await?;

        let notes_deleted = results.first().map_or(0, |r| r.row_count);
        info!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "sets",
            { logging::OPERATION } = "delete",
            { logging::SET_ID } = id,
            { logging::ROW_COUNT } = notes_deleted,
            "Note set deleted with its notes"
        );
        Ok(())
    }

    async fn next_id(&self) -> Result<i64> {
        self.table().next_id().await
    }
}
