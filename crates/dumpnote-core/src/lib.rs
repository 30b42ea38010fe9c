//! # dumpnote-core
//!
//! Core types, traits, and the predicate compiler for the dumpnote backend.
//!
//! This crate provides the entities (users, notes, note sets), the
//! composable [`Predicate`] filter tree that compiles to parameterized SQL
//! fragments, and the repository traits implemented by `dumpnote-db`.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod predicate;
pub mod traits;
pub mod value;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use predicate::{quote_identifier, CompiledPredicate, Conjunction, Operator, Predicate};
pub use traits::*;
pub use value::SqlValue;
