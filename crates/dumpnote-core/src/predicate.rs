//! Composable comparison predicates and their compilation to SQL fragments.
//!
//! A [`Predicate`] is a `column <op> value` comparison that carries an ordered
//! list of `(conjunction, child)` pairs. Compiling a predicate yields a WHERE
//! fragment using the generic [`PLACEHOLDER`] token for every bound value, plus
//! the parameter list in the same left-to-right order as the placeholders.
//!
//! Chaining with [`Predicate::and`] / [`Predicate::or`] always appends to the
//! receiver's own child list, so `a.and(b).and(c)` is a flat chain and compiles
//! without parentheses. A child that has children of its own is a compound
//! sub-expression and is wrapped in parentheses:
//!
//! ```rust
//! use dumpnote_core::predicate::{Operator, Predicate};
//!
//! let p = Predicate::eq("owner", 1)
//!     .and(Predicate::eq("set", 0).or(Predicate::new("marked", Operator::Eq, true)));
//! let compiled = p.compile();
//! assert_eq!(
//!     compiled.fragment,
//!     r#""owner" = ? AND ("set" = ? OR "marked" = ?)"#
//! );
//! assert_eq!(compiled.params.len(), 3);
//! ```
//!
//! Mixed conjunctions inside one flat chain follow SQL precedence (AND binds
//! tighter than OR). Nest a compound child to group explicitly.
//!
//! Column names are emitted as quoted identifiers and are not bound. Callers
//! that accept columns from users must check them against the table's column
//! allow-list first; the compiler trusts its input.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::value::SqlValue;

/// Generic placeholder token emitted for every bound value.
///
/// Rewritten to positional markers (`$1`, `$2`, ...) by statement finalization.
pub const PLACEHOLDER: char = '?';

/// Comparison operators a predicate may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    Like,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Gt,
        Operator::Lt,
        Operator::GtEq,
        Operator::LtEq,
        Operator::Like,
    ];

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::GtEq => ">=",
            Operator::LtEq => "<=",
            Operator::Like => "LIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = Error;

    /// Parse an operator token. `!=` is accepted as an alias for `<>`.
    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("like") {
            return Ok(Operator::Like);
        }
        match token {
            "=" => Ok(Operator::Eq),
            "<>" | "!=" => Ok(Operator::NotEq),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::GtEq),
            "<=" => Ok(Operator::LtEq),
            other => Err(Error::InvalidInput(format!(
                "Unsupported operator '{}'",
                other
            ))),
        }
    }
}

/// How a child predicate is joined to the running expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// A compiled WHERE fragment and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    /// SQL fragment without the `WHERE` keyword, using [`PLACEHOLDER`] tokens.
    pub fragment: String,
    /// Parameters in the order their placeholders appear in `fragment`.
    pub params: Vec<SqlValue>,
}

/// A comparison leaf with an ordered list of conjoined children.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    column: String,
    operator: Operator,
    value: SqlValue,
    children: Vec<(Conjunction, Predicate)>,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Shorthand for a `column = value` predicate.
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    /// Append `other` to this predicate's chain with AND.
    pub fn and(self, other: Predicate) -> Self {
        self.join(Conjunction::And, other)
    }

    /// Append `other` to this predicate's chain with OR.
    pub fn or(self, other: Predicate) -> Self {
        self.join(Conjunction::Or, other)
    }

    /// AND every predicate in `others` onto this predicate's chain, in order.
    pub fn and_all(self, others: impl IntoIterator<Item = Predicate>) -> Self {
        others.into_iter().fold(self, Predicate::and)
    }

    fn join(mut self, conjunction: Conjunction, other: Predicate) -> Self {
        self.children.push((conjunction, other));
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &SqlValue {
        &self.value
    }

    pub fn children(&self) -> &[(Conjunction, Predicate)] {
        &self.children
    }

    /// Whether this predicate has children and so compiles to more than one term.
    pub fn is_compound(&self) -> bool {
        !self.children.is_empty()
    }

    /// Every column referenced by this tree, in pre-order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.column);
        for (_, child) in &self.children {
            child.collect_columns(out);
        }
    }

    /// Compile this tree into a WHERE fragment and its ordered parameters.
    pub fn compile(&self) -> CompiledPredicate {
        let mut fragment = String::new();
        let mut params = Vec::new();
        self.compile_into(&mut fragment, &mut params);
        CompiledPredicate { fragment, params }
    }

    fn compile_into(&self, fragment: &mut String, params: &mut Vec<SqlValue>) {
        fragment.push_str(&quote_identifier(&self.column));
        fragment.push(' ');
        fragment.push_str(self.operator.as_sql());
        fragment.push(' ');
        fragment.push(PLACEHOLDER);
        params.push(self.value.clone());

        for (conjunction, child) in &self.children {
            fragment.push(' ');
            fragment.push_str(conjunction.as_sql());
            fragment.push(' ');
            if child.is_compound() {
                fragment.push('(');
                child.compile_into(fragment, params);
                fragment.push(')');
            } else {
                child.compile_into(fragment, params);
            }
        }
    }
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder_count(fragment: &str) -> usize {
        fragment.chars().filter(|c| *c == PLACEHOLDER).count()
    }

    /// Substitute parameters into the fragment, left to right.
    fn render(compiled: &CompiledPredicate) -> String {
        let mut params = compiled.params.iter();
        let mut out = String::new();
        for c in compiled.fragment.chars() {
            if c == PLACEHOLDER {
                match params.next() {
                    Some(SqlValue::Int(v)) => out.push_str(&v.to_string()),
                    Some(SqlValue::Bool(v)) => out.push_str(&v.to_string()),
                    Some(SqlValue::Text(v)) => out.push_str(&format!("'{}'", v)),
                    Some(other) => out.push_str(&format!("{:?}", other)),
                    None => panic!("more placeholders than parameters"),
                }
            } else {
                out.push(c);
            }
        }
        assert!(params.next().is_none(), "more parameters than placeholders");
        out
    }

    #[test]
    fn test_single_leaf() {
        let compiled = Predicate::eq("id", 7).compile();
        assert_eq!(compiled.fragment, r#""id" = ?"#);
        assert_eq!(compiled.params, vec![SqlValue::Int(7)]);
    }

    #[test]
    fn test_flat_chain_has_no_parentheses() {
        let compiled = Predicate::eq("a", 1)
            .and(Predicate::eq("b", 2))
            .and(Predicate::eq("c", 3))
            .compile();

        assert_eq!(compiled.fragment, r#""a" = ? AND "b" = ? AND "c" = ?"#);
        assert_eq!(
            compiled.params,
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_compound_child_is_parenthesized() {
        let compiled = Predicate::eq("a", 1)
            .and(Predicate::eq("b", 2).or(Predicate::eq("c", 3)))
            .compile();

        assert_eq!(compiled.fragment, r#""a" = ? AND ("b" = ? OR "c" = ?)"#);
        assert_eq!(render(&compiled), r#""a" = 1 AND ("b" = 2 OR "c" = 3)"#);
    }

    #[test]
    fn test_chaining_attaches_to_receiver() {
        let p = Predicate::eq("a", 1)
            .or(Predicate::eq("b", 2))
            .and(Predicate::eq("c", 3));

        assert_eq!(p.children().len(), 2);
        assert_eq!(p.children()[0].0, Conjunction::Or);
        assert_eq!(p.children()[1].0, Conjunction::And);
        assert!(!p.children()[0].1.is_compound());
    }

    #[test]
    fn test_chaining_leaves_other_values_untouched() {
        let base = Predicate::eq("owner", 1);
        let extended = base.clone().and(Predicate::eq("set", 0));

        assert!(!base.is_compound());
        assert!(extended.is_compound());
    }

    #[test]
    fn test_and_all_builds_flat_chain() {
        let extras = vec![
            Predicate::eq("set", 0),
            Predicate::new("marked", Operator::Eq, true),
        ];
        let compiled = Predicate::eq("owner", 4).and_all(extras).compile();

        assert_eq!(
            compiled.fragment,
            r#""owner" = ? AND "set" = ? AND "marked" = ?"#
        );
        assert_eq!(render(&compiled), r#""owner" = 4 AND "set" = 0 AND "marked" = true"#);
    }

    #[test]
    fn test_and_all_with_no_extras_is_identity() {
        let compiled = Predicate::eq("owner", 4).and_all(Vec::new()).compile();
        assert_eq!(compiled.fragment, r#""owner" = ?"#);
    }

    #[test]
    fn test_deep_mixed_nesting_keeps_order() {
        // a AND (b OR (c AND (d OR e))) OR f
        let inner = Predicate::eq("d", 4).or(Predicate::eq("e", 5));
        let middle = Predicate::eq("c", 3).and(inner);
        let outer = Predicate::eq("b", 2).or(middle);
        let compiled = Predicate::eq("a", 1)
            .and(outer)
            .or(Predicate::eq("f", 6))
            .compile();

        assert_eq!(
            compiled.fragment,
            r#""a" = ? AND ("b" = ? OR ("c" = ? AND ("d" = ? OR "e" = ?))) OR "f" = ?"#
        );
        assert_eq!(placeholder_count(&compiled.fragment), compiled.params.len());
        assert_eq!(
            compiled.params,
            (1..=6).map(SqlValue::Int).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_compound_child_with_its_own_siblings() {
        // (b AND c) joined twice at different positions
        let compiled = Predicate::eq("a", 1)
            .or(Predicate::eq("b", 2).and(Predicate::eq("c", 3)))
            .and(Predicate::eq("d", 4).or(Predicate::eq("e", 5)).or(Predicate::eq("f", 6)))
            .compile();

        assert_eq!(
            compiled.fragment,
            r#""a" = ? OR ("b" = ? AND "c" = ?) AND ("d" = ? OR "e" = ? OR "f" = ?)"#
        );
        assert_eq!(
            render(&compiled),
            r#""a" = 1 OR ("b" = 2 AND "c" = 3) AND ("d" = 4 OR "e" = 5 OR "f" = 6)"#
        );
    }

    #[test]
    fn test_like_operator_and_text_value() {
        let compiled = Predicate::new("body", Operator::Like, "%milk%").compile();
        assert_eq!(compiled.fragment, r#""body" LIKE ?"#);
        assert_eq!(compiled.params, vec![SqlValue::Text("%milk%".to_string())]);
    }

    #[test]
    fn test_value_text_is_never_inlined() {
        let hostile = "x'; DROP TABLE notes; --";
        let compiled = Predicate::eq("body", hostile).compile();
        assert!(!compiled.fragment.contains("DROP"));
        assert_eq!(compiled.params, vec![SqlValue::Text(hostile.to_string())]);
    }

    #[test]
    fn test_columns_in_pre_order() {
        let p = Predicate::eq("a", 1)
            .and(Predicate::eq("b", 2).or(Predicate::eq("c", 3)))
            .and(Predicate::eq("d", 4));
        assert_eq!(p.columns(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("set"), r#""set""#);
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEq);
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::NotEq);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::GtEq);
        assert_eq!(" LIKE ".parse::<Operator>().unwrap(), Operator::Like);
        assert_eq!("like".parse::<Operator>().unwrap(), Operator::Like);
    }

    #[test]
    fn test_operator_parse_rejects_unknown() {
        let err = "; DROP".parse::<Operator>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_operator_roundtrips_through_sql_text() {
        for op in Operator::ALL {
            assert_eq!(op.as_sql().parse::<Operator>().unwrap(), op);
        }
    }
}
