//! Repository layer: persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented storage contracts.
//! - Keep SQL details out of services.
//!
//! # Invariants
//! - Engine failures surface as `StoreError::Unavailable`; nothing retries.
//! - Reads reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::document::DocumentId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod document_repo;
pub mod preferences_repo;

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository error shared by document and preference stores.
#[derive(Debug)]
pub enum StoreError {
    /// Storage engine could not open or complete a transaction.
    Unavailable(DbError),
    NotFound(DocumentId),
    InvalidData(String),
    /// Connection lacks a table the repository depends on.
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Unavailable(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Unavailable(DbError::Sqlite(value))
    }
}

pub(crate) fn ensure_table(conn: &rusqlite::Connection, table: &'static str) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(StoreError::MissingRequiredTable(table))
    }
}
