//! Database layer for batch-dl
//!
//! Handles SQLite persistence for the target archive.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`archive`] - Previously downloaded account names

use sqlx::{FromRow, sqlite::SqlitePool};

mod archive;
mod migrations;

/// Archive record from database
#[derive(Debug, Clone, FromRow)]
pub struct ArchiveEntry {
    /// Unique database ID (insertion order)
    pub id: i64,
    /// Platform key ("instagram" or "twitter")
    pub platform: String,
    /// Account name without `@`
    pub username: String,
    /// Unix timestamp when the name was archived
    pub added_at: i64,
}

/// Database handle for batch-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
