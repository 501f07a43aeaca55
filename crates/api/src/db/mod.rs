//! Shared database schema, migrations, and query builders.
//!
//! Every builder returns a [`Built`] pair of SQL text and bound values for
//! the SQLite backend; the server binds them to rusqlite.

pub mod agents;
pub mod migrations;
pub mod properties;
pub mod sessions;
pub mod tables;
pub mod users;

// Re-export tables for convenience
pub use tables::*;

/// SQL text plus its positional parameter values.
pub type Built = (String, sea_query::Values);
