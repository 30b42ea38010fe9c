//! SELECT statement builder.

use dumpnote_core::{quote_identifier, Predicate, Result, SortOrder};

use crate::row::QueryResult;
use crate::statement::{Statement, StatementKind};
use crate::table::Table;

/// Assembles a SELECT over one table.
///
/// Selected columns are trusted SQL (plain names, `*` or expressions written
/// by repository code). The predicate and ORDER BY column are checked against
/// the table's allow-list. Paging is limit-driven: an offset only takes effect
/// together with a positive limit.
#[derive(Clone)]
pub struct QueryBuilder<'a> {
    table: Table<'a>,
    columns: Vec<String>,
    predicate: Option<Predicate>,
    order_by: Option<(&'static str, SortOrder)>,
    limit: u64,
    offset: u64,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(table: Table<'a>, columns: &[&str]) -> Self {
        Self {
            table,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            predicate: None,
            order_by: None,
            limit: 0,
            offset: 0,
        }
    }

    /// Restrict the rows returned. Replaces any earlier predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn order_by(mut self, column: &'static str, order: SortOrder) -> Self {
        self.order_by = Some((column, order));
        self
    }

    /// Maximum rows to return. Zero means no limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Rows to skip. Ignored unless a positive limit is set.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Assemble and finalize the statement without running it.
    pub fn build(&self) -> Result<Statement> {
        let schema = self.table.schema();
        let mut text = format!(
            "SELECT {} FROM {}",
            self.columns.join(", "),
            quote_identifier(schema.name)
        );
        let mut params = Vec::new();

        if let Some(predicate) = &self.predicate {
            schema.check_predicate(predicate)?;
            let compiled = predicate.compile();
            text.push_str(" WHERE ");
            text.push_str(&compiled.fragment);
            params = compiled.params;
        }

        if let Some((column, order)) = self.order_by {
            schema.check_column(column)?;
            text.push_str(&format!(
                " ORDER BY {} {}",
                quote_identifier(column),
                order.as_sql()
            ));
        }

        if self.limit > 0 {
            text.push_str(&format!(" LIMIT {}", self.limit));
            if self.offset > 0 {
                text.push_str(&format!(" OFFSET {}", self.offset));
            }
        }

        Statement::finalize(StatementKind::Query, schema.name, &text, params)
    }

    pub async fn execute(self) -> Result<QueryResult> {
        let statement = self.build()?;
        self.table.executor().execute(&statement).await
    }
}
