//! Error types for snapshot storage and diffing

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Store error types
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying SQLite failure
    #[error("Store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error creating or opening the database
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Referenced snapshot does not exist
    #[error("Snapshot {0} not found")]
    SnapshotNotFound(i64),

    /// Database missing or unreadable
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Database written by a newer schema than this reader understands
    #[error("Schema version {found} is newer than supported version {supported}")]
    SchemaMismatch { found: u32, supported: u32 },

    /// A persisted field kind this reader cannot interpret
    #[error("Unknown field kind '{0}' in store (written by a newer schema?)")]
    UnknownFieldKind(String),

    /// Operation aborted by the caller's cancellation flag
    #[error("Cancelled")]
    Cancelled,
}
