//! Table names and column allow-lists.
//!
//! Column lists are in declared order, which is the order positional
//! `INSERT ... VALUES` relies on. Any column a predicate, assignment or
//! ORDER BY names must appear here before it is interpolated into SQL.

use dumpnote_core::{Error, Predicate, Result};

/// A table's name and its columns in declared order.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub static USERS: TableSchema = TableSchema {
    name: "users",
    columns: &["id", "name", "email", "gid"],
};

pub static SETS: TableSchema = TableSchema {
    name: "sets",
    columns: &["id", "owner", "name", "type"],
};

pub static NOTES: TableSchema = TableSchema {
    name: "notes",
    columns: &["id", "owner", "set", "timestamp", "body", "marked"],
};

impl TableSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn check_column(&self, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "Unknown column '{}' for table '{}'",
                column, self.name
            )))
        }
    }

    /// Check every column referenced anywhere in the predicate tree.
    pub fn check_predicate(&self, predicate: &Predicate) -> Result<()> {
        predicate
            .columns()
            .into_iter()
            .try_for_each(|column| self.check_column(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_columns() {
        assert!(NOTES.has_column("set"));
        assert!(SETS.has_column("type"));
        assert!(!USERS.has_column("owner"));
    }

    #[test]
    fn test_check_predicate_walks_children() {
        let ok = Predicate::eq("owner", 1).and(Predicate::eq("set", 0).or(Predicate::eq("marked", true)));
        assert!(NOTES.check_predicate(&ok).is_ok());

        let bad = Predicate::eq("owner", 1).and(Predicate::eq("set", 0).or(Predicate::eq("1=1; --", true)));
        let err = NOTES.check_predicate(&bad).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("1=1")));
    }

    #[test]
    fn test_insert_order_matches_entity_layout() {
        assert_eq!(NOTES.columns[0], "id");
        assert_eq!(NOTES.columns.len(), 6);
        assert_eq!(USERS.columns.last(), Some(&"gid"));
    }
}
