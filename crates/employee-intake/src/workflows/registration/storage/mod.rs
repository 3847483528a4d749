//! Persistence adapters: the relational store behind rules, parameters, catalogs and
//! employees, plus the blob directory holding report artifacts.

mod blob;
mod defaults;
mod sqlite;

pub use blob::{BlobError, BlobStore, FileSystemBlobStore, REPORT_PREFIX};
pub use defaults::{SeedRule, DEFAULT_PARAMETERS, DEFAULT_RULES};
pub use sqlite::SqliteDatabase;

/// Error raised by the relational store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store directory unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("only read statements are allowed from rule scripts: {0}")]
    WriteRejected(String),
    #[error("invalid employee record: {0}")]
    InvalidRecord(String),
}
