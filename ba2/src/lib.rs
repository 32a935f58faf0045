//! Reader for Bethesda BA2 bundled archives.
//!
//! BA2 is the packed-asset format shipped with Fallout 4 and Fallout 76.
//! Two variants exist: `GNRL` archives hold general byte blobs, `DX10`
//! archives hold chunked DDS texture payloads. This crate parses both and
//! yields named byte blobs; DDS header synthesis for textures is left to
//! asset-side consumers, which receive the inflated chunks in mip order.

mod archive;
mod entry;
mod error;
mod header;

pub use archive::{Ba2Archive, Ba2Entry};
pub use entry::{Dx10Chunk, Dx10Entry, GnrlEntry};
pub use error::{Error, Result};
pub use header::{Ba2Header, Ba2Kind};

/// BA2 magic bytes.
pub const BA2_MAGIC: [u8; 4] = *b"BTDX";

/// Normalize an archive path for lookup: forward slashes, lower-case.
///
/// Archives on disk mix `\` and `/` separators and arbitrary casing; the
/// name table keeps the original spelling for display.
pub(crate) fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").to_ascii_lowercase()
}
