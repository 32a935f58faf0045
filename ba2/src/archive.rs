//! Archive reader: entry tables, name table, payload extraction

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

use crate::entry::{Dx10Entry, GnrlEntry};
use crate::header::{Ba2Header, Ba2Kind};
use crate::{Error, Result, normalize_path};

/// Directory row returned by [`Ba2Archive::list`].
#[derive(Debug, Clone)]
pub struct Ba2Entry {
    /// Path as spelled in the name table.
    pub path: String,
    /// Payload size after inflation.
    pub unpacked_size: u64,
    /// Archive variant the entry came from.
    pub kind: Ba2Kind,
}

enum FileEntry {
    Gnrl(GnrlEntry),
    Dx10(Dx10Entry),
}

/// A parsed BA2 archive over a seekable byte source.
///
/// Entry tables and the name table are read eagerly at open; payloads are
/// read and inflated on demand by [`read`](Self::read).
pub struct Ba2Archive<R> {
    source: R,
    header: Ba2Header,
    entries: Vec<FileEntry>,
    /// Original paths, parallel to `entries`.
    names: Vec<String>,
    /// Normalized path -> entry index.
    lookup: HashMap<String, usize>,
}

impl<R: Read + Seek> Ba2Archive<R> {
    /// Parse the header, entry table and name table.
    pub fn open(mut source: R) -> Result<Self> {
        let header = Ba2Header::parse(&mut source)?;

        let mut entries = Vec::with_capacity(header.file_count as usize);
        for _ in 0..header.file_count {
            let entry = match header.kind {
                Ba2Kind::Gnrl => FileEntry::Gnrl(GnrlEntry::parse(&mut source)?),
                Ba2Kind::Dx10 => FileEntry::Dx10(Dx10Entry::parse(&mut source)?),
            };
            entries.push(entry);
        }

        let names = read_name_table(&mut source, &header)?;
        if names.len() != entries.len() {
            warn!(
                names = names.len(),
                entries = entries.len(),
                "BA2 name table count differs from entry count"
            );
        }

        let mut lookup = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            lookup.insert(normalize_path(name), index);
        }

        debug!(files = entries.len(), "opened BA2 archive");
        Ok(Self {
            source,
            header,
            entries,
            names,
            lookup,
        })
    }

    /// Archive header.
    pub fn header(&self) -> &Ba2Header {
        &self.header
    }

    /// Directory listing in name-table order.
    pub fn list(&self) -> Vec<Ba2Entry> {
        self.names
            .iter()
            .zip(&self.entries)
            .map(|(path, entry)| Ba2Entry {
                path: path.clone(),
                unpacked_size: match entry {
                    FileEntry::Gnrl(e) => u64::from(e.unpacked_size),
                    FileEntry::Dx10(e) => e.unpacked_size(),
                },
                kind: self.header.kind,
            })
            .collect()
    }

    /// Paths matching a glob pattern (`*` and `?`), case-insensitive.
    pub fn find_glob(&self, pattern: &str) -> Vec<String> {
        let pattern = normalize_path(pattern);
        self.names
            .iter()
            .filter(|name| glob_match(&pattern, &normalize_path(name)))
            .cloned()
            .collect()
    }

    /// Extract one member by path (separator- and case-insensitive).
    pub fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        let index = *self
            .lookup
            .get(&normalize_path(path))
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;

        match &self.entries[index] {
            FileEntry::Gnrl(entry) => {
                let entry = entry.clone();
                self.read_gnrl(path, &entry)
            }
            FileEntry::Dx10(entry) => {
                let entry = entry.clone();
                self.read_dx10(path, &entry)
            }
        }
    }

    fn read_gnrl(&mut self, path: &str, entry: &GnrlEntry) -> Result<Vec<u8>> {
        if entry.is_raw() {
            self.read_span(entry.data_offset, entry.unpacked_size as usize)
        } else {
            let packed = self.read_span(entry.data_offset, entry.packed_size as usize)?;
            inflate_exact(path, &packed, entry.unpacked_size as usize)
        }
    }

    /// Concatenate the texture's chunks in mip order. The result is the
    /// bare pixel payload; consumers wanting a DDS stream prepend their
    /// own header from the entry metadata.
    fn read_dx10(&mut self, path: &str, entry: &Dx10Entry) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(entry.unpacked_size() as usize);
        let mut chunks = entry.chunks.clone();
        chunks.sort_by_key(|c| c.start_mip);

        for chunk in &chunks {
            let data = if chunk.packed_size == 0 {
                self.read_span(chunk.offset, chunk.unpacked_size as usize)?
            } else {
                let packed = self.read_span(chunk.offset, chunk.packed_size as usize)?;
                inflate_exact(path, &packed, chunk.unpacked_size as usize)?
            };
            out.extend_from_slice(&data);
        }
        Ok(out)
    }

    fn read_span(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.source.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0; len];
        self.source
            .read_exact(&mut buf)
            .map_err(|_| Error::Truncated { offset, needed: len })?;
        Ok(buf)
    }
}

fn read_name_table<R: Read + Seek>(source: &mut R, header: &Ba2Header) -> Result<Vec<String>> {
    source.seek(SeekFrom::Start(header.name_table_offset))?;
    let mut names = Vec::with_capacity(header.file_count as usize);
    for _ in 0..header.file_count {
        let len = source.read_u16::<LittleEndian>()? as usize;
        let mut buf = vec![0; len];
        source.read_exact(&mut buf).map_err(|_| Error::Truncated {
            offset: header.name_table_offset,
            needed: len,
        })?;
        names.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(names)
}

fn inflate_exact(path: &str, packed: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(packed);
    let mut out = Vec::with_capacity(expected);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    if out.len() != expected {
        return Err(Error::DecompressFailed {
            path: path.to_string(),
            reason: format!("inflated to {} bytes, expected {expected}", out.len()),
        });
    }
    Ok(out)
}

/// Glob match with `*` (any run) and `?` (any one char). Both sides are
/// already normalized.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    // Iterative backtracking: remember the last `*` position.
    let (mut pi, mut ti) = (0, 0);
    let (mut star, mut mark) = (None, 0);
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
