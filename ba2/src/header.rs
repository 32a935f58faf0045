//! BA2 archive header parsing

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;
use tracing::debug;

use crate::{BA2_MAGIC, Error, Result};

/// Archive payload variant, from the 4-byte kind tag after the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ba2Kind {
    /// General-purpose byte blobs.
    Gnrl,
    /// Chunked DX10 texture payloads.
    Dx10,
}

/// Fixed 24-byte archive header.
#[derive(Debug, Clone)]
pub struct Ba2Header {
    /// Format version. 1 is the Fallout 4 original; 7 and 8 ship with
    /// Fallout 76.
    pub version: u32,
    /// Payload variant.
    pub kind: Ba2Kind,
    /// Number of file entries following the header.
    pub file_count: u32,
    /// Absolute offset of the name table at the tail of the archive.
    pub name_table_offset: u64,
}

impl Ba2Header {
    /// Parse the header at the reader's current position.
    pub fn parse<R: Read>(f: &mut R) -> Result<Self> {
        let mut magic = [0; BA2_MAGIC.len()];
        f.read_exact(&mut magic)?;
        if magic != BA2_MAGIC {
            return Err(Error::BadMagic(magic));
        }

        let version = f.read_u32::<LittleEndian>()?;
        if version != 1 && version < 7 {
            return Err(Error::UnsupportedVersion(version));
        }

        let mut kind_tag = [0; 4];
        f.read_exact(&mut kind_tag)?;
        let kind = match &kind_tag {
            b"GNRL" => Ba2Kind::Gnrl,
            b"DX10" => Ba2Kind::Dx10,
            _ => return Err(Error::UnsupportedKind(kind_tag)),
        };

        let file_count = f.read_u32::<LittleEndian>()?;
        let name_table_offset = f.read_u64::<LittleEndian>()?;

        debug!(
            version,
            ?kind,
            file_count,
            name_table_offset,
            "parsed BA2 header"
        );

        Ok(Self {
            version,
            kind,
            file_count,
            name_table_offset,
        })
    }
}
