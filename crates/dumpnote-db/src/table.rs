//! Table bindings: SELECT via [`QueryBuilder`], plus INSERT, UPDATE, DELETE
//! and dense id allocation.

use tracing::warn;

use dumpnote_core::{logging, quote_identifier, Error, Predicate, Result, SqlValue};

use crate::executor::Executor;
use crate::query::QueryBuilder;
use crate::row::QueryResult;
use crate::schema::TableSchema;
use crate::statement::{Statement, StatementKind};

const NEXT_ID_COLUMN: &str = "next_id";
const NEXT_ID_EXPR: &str = r#"COALESCE(MAX("id"), -1) + 1 AS next_id"#;

/// One table bound to an executor.
#[derive(Clone, Copy)]
pub struct Table<'a> {
    executor: &'a dyn Executor,
    schema: &'static TableSchema,
}

impl<'a> Table<'a> {
    pub fn new(executor: &'a dyn Executor, schema: &'static TableSchema) -> Self {
        Self { executor, schema }
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    pub fn executor(&self) -> &'a dyn Executor {
        self.executor
    }

    /// Start a SELECT of the given columns or expressions.
    pub fn select(&self, columns: &[&str]) -> QueryBuilder<'a> {
        QueryBuilder::new(*self, columns)
    }

    /// Build `INSERT INTO t VALUES (...)`.
    ///
    /// Values are positional and must follow the table's declared column
    /// order. Only the arity is checked.
    pub fn insert_statement(&self, values: Vec<SqlValue>) -> Result<Statement> {
        if values.len() != self.schema.columns.len() {
            return Err(Error::InvalidInput(format!(
                "Table '{}' has {} columns, got {} values",
                self.schema.name,
                self.schema.columns.len(),
                values.len()
            )));
        }
        let markers = vec!["?"; values.len()].join(", ");
        let text = format!(
            "INSERT INTO {} VALUES ({})",
            quote_identifier(self.schema.name),
            markers
        );
        Statement::finalize(StatementKind::Mutation, self.schema.name, &text, values)
    }

    /// Build `UPDATE t SET ... WHERE ...`.
    ///
    /// Parameters are the field values in the given order, then the
    /// predicate's parameters.
    pub fn update_statement(
        &self,
        predicate: &Predicate,
        fields: &[(&str, SqlValue)],
    ) -> Result<Statement> {
        if fields.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Update of '{}' sets no columns",
                self.schema.name
            )));
        }
        self.schema.check_predicate(predicate)?;

        let mut assignments = Vec::with_capacity(fields.len());
        let mut params = Vec::with_capacity(fields.len() + 1);
        for (column, value) in fields {
            self.schema.check_column(column)?;
            assignments.push(format!("{} = ?", quote_identifier(column)));
            params.push(value.clone());
        }

        let compiled = predicate.compile();
        params.extend(compiled.params);
        let text = format!(
            "UPDATE {} SET {} WHERE {}",
            quote_identifier(self.schema.name),
            assignments.join(", "),
            compiled.fragment
        );
        Statement::finalize(StatementKind::Mutation, self.schema.name, &text, params)
    }

    /// Build `DELETE FROM t WHERE ...`.
    pub fn delete_statement(&self, predicate: &Predicate) -> Result<Statement> {
        self.schema.check_predicate(predicate)?;
        let compiled = predicate.compile();
        let text = format!(
            "DELETE FROM {} WHERE {}",
            quote_identifier(self.schema.name),
            compiled.fragment
        );
        Statement::finalize(
            StatementKind::Mutation,
            self.schema.name,
            &text,
            compiled.params,
        )
    }

    pub async fn insert(&self, values: Vec<SqlValue>) -> Result<QueryResult> {
        let statement = self.insert_statement(values)?;
        self.executor.execute(&statement).await
    }

    pub async fn update(
        &self,
        predicate: &Predicate,
        fields: &[(&str, SqlValue)],
    ) -> Result<QueryResult> {
        let statement = self.update_statement(predicate, fields)?;
        self.executor.execute(&statement).await
    }

    pub async fn delete(&self, predicate: &Predicate) -> Result<QueryResult> {
        let statement = self.delete_statement(predicate)?;
        self.executor.execute(&statement).await
    }

    /// `MAX(id) + 1`, or 0 for an empty table.
    pub async fn next_id(&self) -> Result<i64> {
        let result = self.select(&[NEXT_ID_EXPR]).execute().await?;
        self.read_next_id(&result)
    }

    fn read_next_id(&self, result: &QueryResult) -> Result<i64> {
        let row = result.rows.first().ok_or_else(|| {
            Error::Decode(format!("next id query on '{}' returned no rows", self.name()))
        })?;
        row.try_i64(NEXT_ID_COLUMN)
    }

    /// Key of the advisory lock that serializes id allocation on this table.
    pub fn allocation_lock_key(&self) -> String {
        format!("dumpnote.{}.id", self.name())
    }

    /// Read the next id and insert `values(id)` in one transaction, holding
    /// this table's allocation lock so allocators never read the same
    /// `MAX(id)`.
    pub async fn allocate_and_insert<F>(&self, values: &F) -> Result<i64>
    where
        F: Fn(i64) -> Vec<SqlValue> + Send + Sync,
    {
        let head = self.select(&[NEXT_ID_EXPR]).build()?;
        let build_insert = |result: &QueryResult| {
            let id = self.read_next_id(result)?;
            self.insert_statement(values(id))
        };
        let (head_result, _) = self
            .executor
            .execute_serialized(&self.allocation_lock_key(), &head, &build_insert)
            .await?;
        self.read_next_id(&head_result)
    }

    /// Allocate the next id and insert `values(id)`.
    ///
    /// Allocation is serialized per table. A unique violation can still come
    /// from a writer that inserts explicit ids outside the lock, so it is
    /// retried with a fresh id. Relies on `id` being the table's primary key.
    /// Gives up with [`Error::Conflict`] after `attempts` collisions.
    pub async fn insert_with_next_id<F>(&self, attempts: u32, values: F) -> Result<i64>
    where
        F: Fn(i64) -> Vec<SqlValue> + Send + Sync,
    {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match self.allocate_and_insert(&values).await {
                Ok(id) => return Ok(id),
                Err(e) if e.is_unique_violation() => {
                    warn!(
                        { logging::SUBSYSTEM } = "db",
                        { logging::COMPONENT } = "table",
                        { logging::OPERATION } = "allocate_id",
                        { logging::DB_TABLE } = self.name(),
                        { logging::ATTEMPT } = attempt,
                        "Id already taken by a concurrent insert, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Conflict(format!(
            "Could not allocate an id in '{}' after {} attempts",
            self.name(),
            attempts
        )))
    }
}
