//! Finalized statements ready for the execution boundary.
//!
//! Builders assemble SQL text with the generic [`PLACEHOLDER`] token. Once the
//! whole text is assembled, [`Statement::finalize`] makes a single left-to-right
//! pass that rewrites the n-th placeholder to `$n`. The pass checks that the
//! placeholder count equals the parameter count, so a statement whose markers
//! were already rewritten cannot be finalized a second time without losing its
//! parameters.

use dumpnote_core::predicate::PLACEHOLDER;
use dumpnote_core::{Error, Result, SqlValue};

/// Whether a statement returns rows or only a count of affected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Mutation,
}

/// SQL text with positional markers and the parameters they refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    table: &'static str,
    text: String,
    params: Vec<SqlValue>,
}

impl Statement {
    /// Rewrite generic placeholders to positional markers and pair the text
    /// with its parameters.
    pub fn finalize(
        kind: StatementKind,
        table: &'static str,
        text: &str,
        params: Vec<SqlValue>,
    ) -> Result<Self> {
        let text = finalize_placeholders(text, params.len())?;
        Ok(Self {
            kind,
            table,
            text,
            params,
        })
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

/// Replace the n-th placeholder in `text` with `$n` (1-based).
///
/// Fails when the number of placeholders differs from `param_count`.
pub fn finalize_placeholders(text: &str, param_count: usize) -> Result<String> {
    let mut out = String::with_capacity(text.len() + param_count * 2);
    let mut index = 0usize;
    for c in text.chars() {
        if c == PLACEHOLDER {
            index += 1;
            out.push('$');
            out.push_str(&index.to_string());
        } else {
            out.push(c);
        }
    }

    if index != param_count {
        return Err(Error::Statement(format!(
            "{} placeholders but {} parameters in: {}",
            index, param_count, text
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_numbered_left_to_right() {
        let text = finalize_placeholders(r#"SELECT * FROM "t" WHERE "a" = ? AND ("b" = ? OR "c" = ?)"#, 3)
            .unwrap();
        assert_eq!(
            text,
            r#"SELECT * FROM "t" WHERE "a" = $1 AND ("b" = $2 OR "c" = $3)"#
        );
    }

    #[test]
    fn test_no_placeholders_no_params() {
        let text = finalize_placeholders(r#"SELECT * FROM "t""#, 0).unwrap();
        assert_eq!(text, r#"SELECT * FROM "t""#);
    }

    #[test]
    fn test_double_digit_markers() {
        let raw = vec!["?"; 12].join(", ");
        let text = finalize_placeholders(&raw, 12).unwrap();
        assert!(text.starts_with("$1, $2"));
        assert!(text.ends_with("$11, $12"));
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let err = finalize_placeholders(r#""a" = ? AND "b" = ?"#, 3).unwrap_err();
        assert!(matches!(err, Error::Statement(_)));

        let err = finalize_placeholders(r#""a" = ?"#, 0).unwrap_err();
        assert!(matches!(err, Error::Statement(_)));
    }

    #[test]
    fn test_finalizing_twice_is_rejected() {
        let stmt = Statement::finalize(
            StatementKind::Query,
            "notes",
            r#"SELECT * FROM "notes" WHERE "id" = ?"#,
            vec![SqlValue::Int(1)],
        )
        .unwrap();
        assert_eq!(stmt.text(), r#"SELECT * FROM "notes" WHERE "id" = $1"#);

        let again = Statement::finalize(
            stmt.kind(),
            stmt.table(),
            stmt.text(),
            stmt.params().to_vec(),
        );
        assert!(matches!(again, Err(Error::Statement(_))));
    }

    #[test]
    fn test_statement_keeps_params_in_order() {
        let stmt = Statement::finalize(
            StatementKind::Mutation,
            "notes",
            r#"UPDATE "notes" SET "body" = ? WHERE "id" = ?"#,
            vec![SqlValue::from("x"), SqlValue::Int(9)],
        )
        .unwrap();
        assert_eq!(stmt.params(), &[SqlValue::from("x"), SqlValue::Int(9)]);
        assert_eq!(stmt.kind(), StatementKind::Mutation);
        assert_eq!(stmt.table(), "notes");
    }
}
