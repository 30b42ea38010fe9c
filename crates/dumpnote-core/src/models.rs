//! Domain entities and change sets.
//!
//! Entities are immutable snapshots of a row. Editing goes through a change
//! set on the owning repository; re-fetch to observe the committed state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::SqlValue;

/// An account, keyed by a dense server-assigned id and by its external
/// OAuth subject (`gid`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub gid: String,
}

/// Identity reported by the OAuth provider at login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub gid: String,
    pub name: String,
    pub email: String,
}

/// A text note owned by a user, optionally filed in a note set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub owner: i64,
    /// `None` when the note belongs to no set.
    pub set: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub body: String,
    pub marked: bool,
}

/// How a note set groups its notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteSetType {
    Daily,
    Monthly,
    Untimed,
}

impl NoteSetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteSetType::Daily => "daily",
            NoteSetType::Monthly => "monthly",
            NoteSetType::Untimed => "untimed",
        }
    }
}

impl fmt::Display for NoteSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteSetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(NoteSetType::Daily),
            "monthly" => Ok(NoteSetType::Monthly),
            "untimed" => Ok(NoteSetType::Untimed),
            other => Err(Error::InvalidInput(format!(
                "Unknown set type '{}', expected daily, monthly or untimed",
                other
            ))),
        }
    }
}

/// A named group of notes owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSet {
    pub id: i64,
    pub owner: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub set_type: NoteSetType,
}

/// Column assignments produced by a change set, in column order.
pub type Assignments = Vec<(&'static str, SqlValue)>;

/// Partial update of a user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }

    pub fn assignments(&self) -> Assignments {
        let mut out = Assignments::new();
        if let Some(name) = &self.name {
            out.push(("name", SqlValue::from(name.as_str())));
        }
        if let Some(email) = &self.email {
            out.push(("email", SqlValue::from(email.as_str())));
        }
        out
    }
}

/// Partial update of a note. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteChanges {
    /// `Some(None)` moves the note out of its set.
    #[serde(default, deserialize_with = "double_option")]
    pub set: Option<Option<i64>>,
    pub timestamp: Option<DateTime<Utc>>,
    pub body: Option<String>,
    pub marked: Option<bool>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.set.is_none() && self.timestamp.is_none() && self.body.is_none() && self.marked.is_none()
    }

    pub fn assignments(&self) -> Assignments {
        let mut out = Assignments::new();
        if let Some(set) = self.set {
            out.push(("set", SqlValue::Int(set.unwrap_or(crate::defaults::NO_SET))));
        }
        if let Some(timestamp) = self.timestamp {
            out.push(("timestamp", SqlValue::Timestamp(timestamp)));
        }
        if let Some(body) = &self.body {
            out.push(("body", SqlValue::from(body.as_str())));
        }
        if let Some(marked) = self.marked {
            out.push(("marked", SqlValue::Bool(marked)));
        }
        out
    }
}

/// Partial update of a note set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteSetChanges {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub set_type: Option<NoteSetType>,
}

impl NoteSetChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.set_type.is_none()
    }

    pub fn assignments(&self) -> Assignments {
        let mut out = Assignments::new();
        if let Some(name) = &self.name {
            out.push(("name", SqlValue::from(name.as_str())));
        }
        if let Some(set_type) = self.set_type {
            out.push(("type", SqlValue::from(set_type.as_str())));
        }
        out
    }
}

/// Distinguish an absent field from an explicit `null`.
fn double_option<'de, D>(deserializer: D) -> std::result::Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}
