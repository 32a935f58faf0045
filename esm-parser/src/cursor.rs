//! Bounds-checked little-endian reader over a byte slice.
//!
//! Every read advances the position; a read past the end fails with
//! [`Error::Truncated`] carrying the offset. Zlib inflation lives here too
//! so that all scratch-buffer policy is in one place.

use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::error::{Error, Result};

/// Cap on the declared uncompressed length of any zlib payload. Malformed
/// files can declare arbitrary lengths; refuse to allocate past this.
pub const MAX_INFLATE_LEN: usize = 64 * 1024 * 1024;

/// Typed reader over a byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the slice.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `n` bytes as a slice.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                offset: self.pos,
                needed: n,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Advance without reading.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Jump to an absolute offset within the slice.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::Truncated {
                offset: self.pos,
                needed: pos - self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut buf = [0; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read a fixed 4-byte ASCII tag.
    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        let b = self.take(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    /// Read up to a NUL terminator (consumed, not returned). UTF-8 with
    /// lenient fallback.
    pub fn read_zstring(&mut self) -> Result<String> {
        let start = self.pos;
        let nul = self.data[start..]
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::Truncated {
                offset: start,
                needed: 1,
            })?;
        let s = String::from_utf8_lossy(&self.data[start..start + nul]).into_owned();
        self.pos = start + nul + 1;
        Ok(s)
    }

    /// Read a string with a 1-byte length prefix.
    pub fn read_string_u8len(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    /// Read a string with a u32 length prefix.
    pub fn read_string_u32len(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }
}

/// Inflate a zlib stream to exactly `expected_len` bytes.
///
/// Declared lengths beyond [`MAX_INFLATE_LEN`] and length mismatches both
/// fail as decompression errors, distinct from `Truncated`.
pub fn inflate(compressed: &[u8], expected_len: usize) -> std::result::Result<Vec<u8>, String> {
    if expected_len > MAX_INFLATE_LEN {
        return Err(format!(
            "declared length {expected_len} exceeds cap {MAX_INFLATE_LEN}"
        ));
    }

    let mut decoder = ZlibDecoder::new(compressed);
    let mut out = Vec::with_capacity(expected_len);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| format!("zlib: {e}"))?;

    if out.len() != expected_len {
        return Err(format!(
            "inflated to {} bytes, expected {expected_len}",
            out.len()
        ));
    }
    Ok(out)
}
