//! Query-string filters for note listings.
//!
//! `id`, `set` and `timestamp` take an optional comparison prefix
//! (`=`, `<>`, `!=`, `>`, `>=`, `<`, `<=`) and default to equality, so
//! `?timestamp=>=2024-01-01T00:00:00Z&set=0` lists notes in set 0 from 2024
//! on. `marked` must be `true` or `false`. `search` matches a substring of
//! the body.
//!
//! An unescaped `+` in a query string decodes to a space, so
//! `2024-01-01T00:00:00 02:00` is read as `2024-01-01T00:00:00+02:00`.
//! Clients may also send `%2B` or a `Z` offset.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use dumpnote_core::{Error, ListNotesRequest, Operator, Predicate, Result, SortOrder, SqlValue};
use dumpnote_db::escape_like;

/// Raw listing parameters. Values stay strings until [`NotesQuery::into_request`]
/// so malformed input surfaces as a JSON 400 rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotesQuery {
    pub id: Option<String>,
    pub set: Option<String>,
    pub timestamp: Option<String>,
    pub marked: Option<String>,
    pub search: Option<String>,
    pub offset: Option<String>,
    pub order: Option<String>,
}

/// Paging parameters for listings without filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<String>,
}

impl PageQuery {
    pub fn offset(&self) -> Result<Option<u64>> {
        parse_offset(self.offset.as_deref())
    }
}

impl NotesQuery {
    pub fn into_request(self) -> Result<ListNotesRequest> {
        let mut filters = Vec::new();

        if let Some(raw) = non_empty(&self.id) {
            filters.push(comparison("id", raw, parse_int)?);
        }
        if let Some(raw) = non_empty(&self.set) {
            filters.push(comparison("set", raw, parse_int)?);
        }
        if let Some(raw) = non_empty(&self.timestamp) {
            filters.push(comparison("timestamp", raw, parse_timestamp)?);
        }
        if let Some(raw) = non_empty(&self.marked) {
            filters.push(Predicate::eq("marked", parse_bool("marked", raw)?));
        }
        if let Some(raw) = non_empty(&self.search) {
            let pattern = format!("%{}%", escape_like(raw));
            filters.push(Predicate::new("body", Operator::Like, pattern));
        }

        let order = match non_empty(&self.order) {
            None => SortOrder::Asc,
            Some(raw) if raw.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            Some(raw) if raw.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            Some(raw) => {
                return Err(Error::InvalidInput(format!(
                    "Expected asc or desc at order={}",
                    raw
                )))
            }
        };

        Ok(ListNotesRequest {
            filters,
            offset: parse_offset(self.offset.as_deref())?,
            order,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Split a leading comparison operator off `raw`. Two-character operators
/// are tried first so `>=` is not read as `>` followed by `=`.
pub fn split_operator(raw: &str) -> (Operator, &str) {
    const PREFIXES: [(&str, Operator); 7] = [
        ("<>", Operator::NotEq),
        ("!=", Operator::NotEq),
        (">=", Operator::GtEq),
        ("<=", Operator::LtEq),
        ("=", Operator::Eq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
    ];
    PREFIXES
        .iter()
        .find_map(|(prefix, op)| raw.strip_prefix(*prefix).map(|rest| (*op, rest)))
        .unwrap_or((Operator::Eq, raw))
}

fn comparison(
    column: &str,
    raw: &str,
    parse: fn(&str, &str) -> Result<SqlValue>,
) -> Result<Predicate> {
    let (operator, value) = split_operator(raw);
    Ok(Predicate::new(column, operator, parse(column, value)?))
}

fn parse_int(column: &str, value: &str) -> Result<SqlValue> {
    value
        .trim()
        .parse::<i64>()
        .map(SqlValue::Int)
        .map_err(|_| Error::InvalidInput(format!("Expected integer at {}={}", column, value)))
}

fn parse_timestamp(column: &str, value: &str) -> Result<SqlValue> {
    DateTime::parse_from_rfc3339(&restore_offset_sign(value.trim()))
        .map(|ts| SqlValue::Timestamp(ts.with_timezone(&Utc)))
        .map_err(|_| {
            Error::InvalidInput(format!(
                "Expected RFC 3339 timestamp at {}={}",
                column, value
            ))
        })
}

/// Put back the `+` of a trailing ` hh:mm` offset.
fn restore_offset_sign(value: &str) -> Cow<'_, str> {
    let split = match value.len().checked_sub(6) {
        Some(split) if value.is_char_boundary(split) => split,
        _ => return Cow::Borrowed(value),
    };
    let (head, offset) = value.split_at(split);
    let offset = offset.as_bytes();
    let looks_like_offset = offset[0] == b' '
        && offset[1].is_ascii_digit()
        && offset[2].is_ascii_digit()
        && offset[3] == b':'
        && offset[4].is_ascii_digit()
        && offset[5].is_ascii_digit();
    if looks_like_offset {
        Cow::Owned(format!("{}+{}", head, &value[split + 1..]))
    } else {
        Cow::Borrowed(value)
    }
}

fn parse_bool(column: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::InvalidInput(format!(
            "Expected boolean at {}={}",
            column, other
        ))),
    }
}

fn parse_offset(value: Option<&str>) -> Result<Option<u64>> {
    match value.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::InvalidInput(format!("Expected non-negative integer at offset={}", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;

    fn query(pairs: &[(&str, &str)]) -> NotesQuery {
        let mut q = NotesQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "id" => q.id = value,
                "set" => q.set = value,
                "timestamp" => q.timestamp = value,
                "marked" => q.marked = value,
                "search" => q.search = value,
                "offset" => q.offset = value,
                "order" => q.order = value,
                other => panic!("unexpected key {}", other),
            }
        }
        q
    }

    #[test]
    fn test_split_operator_prefers_two_char() {
        assert_eq!(split_operator(">=5"), (Operator::GtEq, "5"));
        assert_eq!(split_operator("<=5"), (Operator::LtEq, "5"));
        assert_eq!(split_operator("<>5"), (Operator::NotEq, "5"));
        assert_eq!(split_operator("!=5"), (Operator::NotEq, "5"));
        assert_eq!(split_operator(">5"), (Operator::Gt, "5"));
        assert_eq!(split_operator("=5"), (Operator::Eq, "5"));
        assert_eq!(split_operator("5"), (Operator::Eq, "5"));
    }

    #[test]
    fn test_no_params_is_unfiltered() {
        let req = NotesQuery::default().into_request().unwrap();
        assert!(req.filters.is_empty());
        assert_eq!(req.offset, None);
        assert_eq!(req.order, SortOrder::Asc);
    }

    #[test]
    fn test_typed_comparisons() {
        let req = query(&[("set", "0"), ("id", ">10"), ("timestamp", "<2024-01-01T00:00:00Z")])
            .into_request()
            .unwrap();

        assert_eq!(req.filters.len(), 3);
        assert_eq!(req.filters[0].column(), "id");
        assert_eq!(req.filters[0].operator(), Operator::Gt);
        assert_eq!(req.filters[0].value(), &SqlValue::Int(10));
        assert_eq!(req.filters[1].column(), "set");
        assert_eq!(req.filters[1].value(), &SqlValue::Int(0));
        assert_eq!(req.filters[2].operator(), Operator::Lt);
        assert!(matches!(req.filters[2].value(), SqlValue::Timestamp(_)));
    }

    #[test]
    fn test_positive_offset_survives_query_decoding() {
        let uri: axum::http::Uri = "/notes?timestamp=%3E2024-01-01T00:00:00+02:00"
            .parse()
            .unwrap();
        let Query(q) = Query::<NotesQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.timestamp.as_deref(), Some(">2024-01-01T00:00:00 02:00"));

        let req = q.into_request().unwrap();
        let expected = DateTime::parse_from_rfc3339("2023-12-31T22:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(req.filters[0].operator(), Operator::Gt);
        assert_eq!(req.filters[0].value(), &SqlValue::Timestamp(expected));
    }

    #[test]
    fn test_escaped_and_utc_offsets_parse() {
        for value in [
            "2024-01-01T00:00:00+02:00",
            "2023-12-31T22:00:00Z",
            "2024-01-01T00:00:00 02:00",
        ] {
            let req = query(&[("timestamp", value)]).into_request().unwrap();
            assert!(matches!(req.filters[0].value(), SqlValue::Timestamp(_)), "{}", value);
        }
        assert!(query(&[("timestamp", "2024-01-01T00:00:00 0200")])
            .into_request()
            .is_err());
    }

    #[test]
    fn test_marked_must_be_boolean() {
        let req = query(&[("marked", "true")]).into_request().unwrap();
        assert_eq!(req.filters[0].value(), &SqlValue::Bool(true));

        let err = query(&[("marked", "yes")]).into_request().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg == "Expected boolean at marked=yes"));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(query(&[("id", ">=ten")]).into_request().is_err());
        assert!(query(&[("timestamp", "yesterday")]).into_request().is_err());
        assert!(query(&[("offset", "-1")]).into_request().is_err());
        assert!(query(&[("order", "sideways")]).into_request().is_err());
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let req = query(&[("search", "50%_off")]).into_request().unwrap();
        assert_eq!(req.filters[0].operator(), Operator::Like);
        assert_eq!(
            req.filters[0].value(),
            &SqlValue::from("%50\\%\\_off%")
        );
    }

    #[test]
    fn test_offset_and_order() {
        let req = query(&[("offset", "100"), ("order", "DESC")])
            .into_request()
            .unwrap();
        assert_eq!(req.offset, Some(100));
        assert_eq!(req.order, SortOrder::Desc);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let req = query(&[("id", ""), ("search", "")]).into_request().unwrap();
        assert!(req.filters.is_empty());
    }

    #[test]
    fn test_page_query_offset() {
        let page = PageQuery {
            offset: Some("50".to_string()),
        };
        assert_eq!(page.offset().unwrap(), Some(50));
        assert_eq!(PageQuery::default().offset().unwrap(), None);
    }
}
