//! Error types for ESM parsing

use thiserror::Error;

use crate::types::FormId;

/// Result type for ESM operations
pub type Result<T> = std::result::Result<T, Error>;

/// ESM parser error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Read past the end of the data
    #[error("Truncated data: needed {needed} bytes at offset {offset:#x}")]
    Truncated { offset: usize, needed: usize },

    /// The file does not start with a TES4 record
    #[error("Not an ESM file: expected TES4 header, got {0:?}")]
    BadMagic([u8; 4]),

    /// File header version this parser does not understand
    #[error("Unsupported ESM version {0} (expected 208)")]
    UnsupportedVersion(u16),

    /// Zlib inflation failed, produced the wrong length, or the declared
    /// length exceeded the scratch-buffer cap
    #[error("Decompression failed for record {form_id}: {reason}")]
    DecompressFailed { form_id: FormId, reason: String },

    /// Structurally invalid data inside a record
    #[error("Malformed record {form_id}: {reason}")]
    Malformed { form_id: FormId, reason: String },

    /// Parse aborted by the caller's cancellation flag
    #[error("Cancelled")]
    Cancelled,

    /// Error surfaced by the BA2 reader while loading string tables
    #[error(transparent)]
    Ba2(#[from] ba2::Error),
}
