//! Column-keyed result rows and their mapping onto entities.

use chrono::{DateTime, Utc};

use dumpnote_core::{Error, Note, NoteSet, NoteSetType, Result, SqlValue, User};

/// One result row as an ordered list of `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn require(&self, name: &str) -> Result<&SqlValue> {
        self.get(name)
            .ok_or_else(|| Error::Decode(format!("missing column '{}'", name)))
    }

    fn mismatch(name: &str, expected: &str, found: &SqlValue) -> Error {
        Error::Decode(format!(
            "column '{}': expected {}, found {}",
            name,
            expected,
            found.kind()
        ))
    }

    pub fn try_i64(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            SqlValue::Int(v) => Ok(*v),
            other => Err(Self::mismatch(name, "int", other)),
        }
    }

    pub fn try_bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            SqlValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(name, "bool", other)),
        }
    }

    pub fn try_text(&self, name: &str) -> Result<String> {
        match self.require(name)? {
            SqlValue::Text(v) => Ok(v.clone()),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    pub fn try_timestamp(&self, name: &str) -> Result<DateTime<Utc>> {
        match self.require(name)? {
            SqlValue::Timestamp(v) => Ok(*v),
            other => Err(Self::mismatch(name, "timestamp", other)),
        }
    }
}

/// Rows returned by a statement, plus the affected-row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Rows returned for queries, rows affected for mutations.
    pub row_count: u64,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len() as u64;
        Self { rows, row_count }
    }

    pub fn affected(row_count: u64) -> Self {
        Self {
            rows: Vec::new(),
            row_count,
        }
    }

    /// Decode every row.
    pub fn decode_all<T: DecodeRow>(&self) -> Result<Vec<T>> {
        self.rows.iter().map(T::decode_row).collect()
    }

    /// Decode the first row, if any.
    pub fn decode_first<T: DecodeRow>(&self) -> Result<Option<T>> {
        self.rows.first().map(T::decode_row).transpose()
    }
}

/// Build an entity from a fetched row.
pub trait DecodeRow: Sized {
    fn decode_row(row: &Row) -> Result<Self>;
}

impl DecodeRow for User {
    fn decode_row(row: &Row) -> Result<Self> {
        Ok(User {
            id: row.try_i64("id")?,
            name: row.try_text("name")?,
            email: row.try_text("email")?,
            gid: row.try_text("gid")?,
        })
    }
}

impl DecodeRow for Note {
    fn decode_row(row: &Row) -> Result<Self> {
        let set = row.try_i64("set")?;
        Ok(Note {
            id: row.try_i64("id")?,
            owner: row.try_i64("owner")?,
            // Negative ids are the "no set" sentinel.
            set: (set >= 0).then_some(set),
            timestamp: row.try_timestamp("timestamp")?,
            body: row.try_text("body")?,
            marked: row.try_bool("marked")?,
        })
    }
}

impl DecodeRow for NoteSet {
    fn decode_row(row: &Row) -> Result<Self> {
        Ok(NoteSet {
            id: row.try_i64("id")?,
            owner: row.try_i64("owner")?,
            name: row.try_text("name")?,
            set_type: row.try_text("type")?.parse::<NoteSetType>()?,
        })
    }
}
