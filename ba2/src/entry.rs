//! BA2 file entry tables (GNRL and DX10 variants)

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::Result;

/// 36-byte entry of a GNRL archive.
#[derive(Debug, Clone)]
pub struct GnrlEntry {
    /// CRC-style hash of the file stem.
    pub name_hash: u32,
    /// File extension, space-padded ASCII.
    pub extension: [u8; 4],
    /// Hash of the directory portion of the path.
    pub dir_hash: u32,
    /// Absolute offset of the payload.
    pub data_offset: u64,
    /// Size on disk; 0 means the payload is stored raw.
    pub packed_size: u32,
    /// Size after inflation (equals on-disk size for raw payloads).
    pub unpacked_size: u32,
}

impl GnrlEntry {
    pub(crate) fn parse<R: Read>(f: &mut R) -> Result<Self> {
        let name_hash = f.read_u32::<LittleEndian>()?;
        let mut extension = [0; 4];
        f.read_exact(&mut extension)?;
        let dir_hash = f.read_u32::<LittleEndian>()?;
        let _unknown = f.read_u32::<LittleEndian>()?;
        let data_offset = f.read_u64::<LittleEndian>()?;
        let packed_size = f.read_u32::<LittleEndian>()?;
        let unpacked_size = f.read_u32::<LittleEndian>()?;
        let _unknown2 = f.read_u32::<LittleEndian>()?;

        Ok(Self {
            name_hash,
            extension,
            dir_hash,
            data_offset,
            packed_size,
            unpacked_size,
        })
    }

    /// Whether the payload is stored without compression.
    pub fn is_raw(&self) -> bool {
        self.packed_size == 0
    }
}

/// Per-texture header of a DX10 archive, followed by its chunk descriptors.
#[derive(Debug, Clone)]
pub struct Dx10Entry {
    pub name_hash: u32,
    pub extension: [u8; 4],
    pub dir_hash: u32,
    pub height: u16,
    pub width: u16,
    pub mip_count: u8,
    pub dxgi_format: u8,
    pub flags: u16,
    /// Chunk descriptors in mip order.
    pub chunks: Vec<Dx10Chunk>,
}

/// One compressed span of texture data.
#[derive(Debug, Clone)]
pub struct Dx10Chunk {
    pub offset: u64,
    pub packed_size: u32,
    pub unpacked_size: u32,
    pub start_mip: u16,
    pub end_mip: u16,
}

impl Dx10Entry {
    pub(crate) fn parse<R: Read>(f: &mut R) -> Result<Self> {
        let name_hash = f.read_u32::<LittleEndian>()?;
        let mut extension = [0; 4];
        f.read_exact(&mut extension)?;
        let dir_hash = f.read_u32::<LittleEndian>()?;
        let _unknown = f.read_u8()?;
        let chunk_count = f.read_u8()?;
        let _chunk_header_size = f.read_u16::<LittleEndian>()?;
        let height = f.read_u16::<LittleEndian>()?;
        let width = f.read_u16::<LittleEndian>()?;
        let mip_count = f.read_u8()?;
        let dxgi_format = f.read_u8()?;
        let flags = f.read_u16::<LittleEndian>()?;

        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for _ in 0..chunk_count {
            chunks.push(Dx10Chunk::parse(f)?);
        }

        Ok(Self {
            name_hash,
            extension,
            dir_hash,
            height,
            width,
            mip_count,
            dxgi_format,
            flags,
            chunks,
        })
    }

    /// Total payload size once every chunk is inflated.
    pub fn unpacked_size(&self) -> u64 {
        self.chunks.iter().map(|c| u64::from(c.unpacked_size)).sum()
    }
}

impl Dx10Chunk {
    fn parse<R: Read>(f: &mut R) -> Result<Self> {
        let offset = f.read_u64::<LittleEndian>()?;
        let packed_size = f.read_u32::<LittleEndian>()?;
        let unpacked_size = f.read_u32::<LittleEndian>()?;
        let start_mip = f.read_u16::<LittleEndian>()?;
        let end_mip = f.read_u16::<LittleEndian>()?;
        let _align = f.read_u32::<LittleEndian>()?;

        Ok(Self {
            offset,
            packed_size,
            unpacked_size,
            start_mip,
            end_mip,
        })
    }
}
