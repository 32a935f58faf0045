//! Error types for BA2 parsing and extraction

use thiserror::Error;

/// Result type for BA2 operations
pub type Result<T> = std::result::Result<T, Error>;

/// BA2 error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid BA2 magic bytes
    #[error("Invalid BA2 magic: expected \"BTDX\", got {0:?}")]
    BadMagic([u8; 4]),

    /// Archive version this reader does not understand
    #[error("Unsupported BA2 version: {0}")]
    UnsupportedVersion(u32),

    /// Archive kind tag that is neither GNRL nor DX10
    #[error("Unsupported BA2 kind: {0:?}")]
    UnsupportedKind([u8; 4]),

    /// Named entry missing from the archive
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Read past the end of the archive
    #[error("Truncated archive: needed {needed} bytes at offset {offset:#x}")]
    Truncated { offset: u64, needed: usize },

    /// Zlib inflation failed or produced the wrong length
    #[error("Decompression failed for {path}: {reason}")]
    DecompressFailed { path: String, reason: String },
}
