//! The execution boundary: runs finalized statements and returns rows.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgConnection, PgPool, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Row as _, TypeInfo};
use tracing::{debug, trace};

use dumpnote_core::{logging, Error, Result, SqlValue};

use crate::row::{QueryResult, Row};
use crate::statement::{Statement, StatementKind};

/// Runs statements against persisted storage.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run one statement.
    async fn execute(&self, statement: &Statement) -> Result<QueryResult>;

    /// Run every statement in order inside one transaction. Either all of
    /// them take effect or none do.
    async fn execute_atomic(&self, statements: &[Statement]) -> Result<Vec<QueryResult>>;

    /// Run `head`, then the statement `then` builds from its result, inside
    /// one transaction that holds the lock named by `lock_key` until it ends.
    ///
    /// Calls sharing a key never overlap, so `then` sees every commit made by
    /// an earlier holder.
    async fn execute_serialized(
        &self,
        lock_key: &str,
        head: &Statement,
        then: &(dyn for<'r> Fn(&'r QueryResult) -> Result<Statement> + Send + Sync),
    ) -> Result<(QueryResult, QueryResult)>;
}

const ADVISORY_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtext(?))";

/// PostgreSQL executor backed by a connection pool.
///
/// A connection is acquired per call and returned to the pool when the call
/// completes.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        run_statement(&mut conn, statement).await
    }

    async fn execute_atomic(&self, statements: &[Statement]) -> Result<Vec<QueryResult>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            // Dropping `tx` on error rolls the transaction back.
            results.push(run_statement(&mut *tx, statement).await?);
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(results)
    }

    async fn execute_serialized(
        &self,
        lock_key: &str,
        head: &Statement,
        then: &(dyn for<'r> Fn(&'r QueryResult) -> Result<Statement> + Send + Sync),
    ) -> Result<(QueryResult, QueryResult)> {
        let lock = Statement::finalize(
            StatementKind::Mutation,
            head.table(),
            ADVISORY_LOCK_SQL,
            vec![SqlValue::Text(lock_key.to_string())],
        )?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        // Released on commit or rollback.
        run_statement(&mut *tx, &lock).await?;
        let head_result = run_statement(&mut *tx, head).await?;
        let tail = then(&head_result)?;
        let tail_result = run_statement(&mut *tx, &tail).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok((head_result, tail_result))
    }
}

async fn run_statement(conn: &mut PgConnection, statement: &Statement) -> Result<QueryResult> {
    let start = Instant::now();
    trace!(
        { logging::SUBSYSTEM } = "db",
        { logging::COMPONENT } = "executor",
        { logging::DB_TABLE } = statement.table(),
        sql = statement.text(),
        "Executing statement"
    );

    let query = bind_params(sqlx::query(statement.text()), statement.params());
    let result = match statement.kind() {
        StatementKind::Query => {
            let rows = query.fetch_all(&mut *conn).await.map_err(Error::Database)?;
            let rows = rows.iter().map(decode_pg_row).collect::<Result<Vec<_>>>()?;
            QueryResult::from_rows(rows)
        }
        StatementKind::Mutation => {
            let done = query.execute(&mut *conn).await.map_err(Error::Database)?;
            QueryResult::affected(done.rows_affected())
        }
    };

    debug!(
        { logging::SUBSYSTEM } = "db",
        { logging::COMPONENT } = "executor",
        { logging::DB_TABLE } = statement.table(),
        { logging::PARAM_COUNT } = statement.params().len(),
        { logging::ROW_COUNT } = result.row_count,
        { logging::DURATION_MS } = start.elapsed().as_millis() as u64,
        "Statement executed"
    );
    Ok(result)
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Timestamp(ts) => query.bind(*ts),
        };
    }
    query
}

fn decode_pg_row(row: &PgRow) -> Result<Row> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let name = column.name();
        let decode_err = |e: sqlx::Error| Error::Decode(format!("column '{}': {}", name, e));

        let value = match column.type_info().name() {
            "INT8" => row
                .try_get::<Option<i64>, _>(idx)
                .map_err(decode_err)?
                .map(SqlValue::Int),
            "INT4" => row
                .try_get::<Option<i32>, _>(idx)
                .map_err(decode_err)?
                .map(SqlValue::from),
            "INT2" => row
                .try_get::<Option<i16>, _>(idx)
                .map_err(decode_err)?
                .map(|v| SqlValue::Int(i64::from(v))),
            "BOOL" => row
                .try_get::<Option<bool>, _>(idx)
                .map_err(decode_err)?
                .map(SqlValue::Bool),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(idx)
                .map_err(decode_err)?
                .map(SqlValue::Text),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .map_err(decode_err)?
                .map(SqlValue::Timestamp),
            other => {
                return Err(Error::Decode(format!(
                    "column '{}' has unsupported type {}",
                    name, other
                )))
            }
        };
        out.push(name, value.unwrap_or(SqlValue::Null));
    }
    Ok(out)
}
