//! Localized string tables.
//!
//! Display text lives outside the master file: subrecords carry 32-bit
//! string ids resolved against three tables shipped in the localization
//! BA2 (`.strings`, `.dlstrings`, `.ilstrings`). All three share a header
//! and directory layout and differ only in how the heap encodes entries:
//! `.strings` is NUL-terminated, the other two carry a u32 length that
//! includes the trailing NUL.

use ba2::Ba2Archive;
use std::collections::HashMap;
use std::io::{Read, Seek};
use tracing::{debug, warn};

use crate::cursor::Cursor;
use crate::error::Result;

/// Union of the three localized string tables: `string_id -> text`.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    entries: HashMap<u32, String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries.iter().map(|(id, text)| (*id, text.as_str()))
    }

    /// Merge one string file into the table. Duplicate ids within a blob
    /// resolve to the last occurrence; duplicates against earlier blobs
    /// overwrite, so callers control cross-file precedence by load order.
    ///
    /// Returns the number of directory entries read.
    pub fn merge_blob(&mut self, blob: &[u8], length_prefixed: bool) -> Result<usize> {
        let mut cur = Cursor::new(blob);
        let count = cur.read_u32()? as usize;
        let data_size = cur.read_u32()? as usize;

        let mut directory = Vec::with_capacity(count);
        for _ in 0..count {
            let id = cur.read_u32()?;
            let offset = cur.read_u32()?;
            directory.push((id, offset));
        }

        let heap = cur.take(data_size.min(cur.remaining()))?;
        if heap.len() < data_size {
            warn!(
                declared = data_size,
                present = heap.len(),
                "string heap shorter than declared"
            );
        }

        for (id, offset) in directory {
            let mut entry = Cursor::new(heap);
            if entry.seek(offset as usize).is_err() {
                warn!(id, offset, "string offset outside heap, skipping");
                continue;
            }
            let text = if length_prefixed {
                // Length includes the trailing NUL.
                match entry.read_string_u32len() {
                    Ok(s) => s.trim_end_matches('\0').to_string(),
                    Err(_) => {
                        warn!(id, offset, "length-prefixed string truncated, skipping");
                        continue;
                    }
                }
            } else {
                match entry.read_zstring() {
                    Ok(s) => s,
                    Err(_) => {
                        warn!(id, offset, "unterminated string, skipping");
                        continue;
                    }
                }
            };
            self.entries.insert(id, text);
        }

        Ok(count)
    }

    /// Load the three tables for `lang` out of a localization BA2.
    ///
    /// The length-prefixed tables are merged first so that on an id
    /// collision across files the `.strings` table wins.
    pub fn load_from_ba2<R: Read + Seek>(archive: &mut Ba2Archive<R>, lang: &str) -> Result<Self> {
        let mut table = Self::new();
        for (extension, length_prefixed) in
            [("dlstrings", true), ("ilstrings", true), ("strings", false)]
        {
            let pattern = format!("*strings/*_{lang}.{extension}");
            let matches = archive.find_glob(&pattern);
            let Some(path) = matches.first() else {
                debug!(%pattern, "no string table member in archive");
                continue;
            };
            if matches.len() > 1 {
                warn!(%pattern, count = matches.len(), "multiple string tables match, using first");
            }
            let blob = archive.read(path)?;
            let loaded = table.merge_blob(&blob, length_prefixed)?;
            debug!(%path, loaded, "merged string table");
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Build a `.strings`-family blob from (id, text) pairs.
    fn build_blob(entries: &[(u32, &str)], length_prefixed: bool) -> Vec<u8> {
        let mut heap = Vec::new();
        let mut directory = Vec::new();
        for (id, text) in entries {
            directory.push((*id, heap.len() as u32));
            if length_prefixed {
                heap.extend_from_slice(&((text.len() + 1) as u32).to_le_bytes());
            }
            heap.extend_from_slice(text.as_bytes());
            heap.push(0);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        out.extend_from_slice(&(heap.len() as u32).to_le_bytes());
        for (id, offset) in directory {
            out.extend_from_slice(&id.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.extend_from_slice(&heap);
        out
    }

    #[test]
    fn roundtrips_null_terminated_table() {
        let entries = [(1u32, "Pip-Boy"), (77, "Laser Rifle"), (900, "")];
        let blob = build_blob(&entries, false);

        let mut table = StringTable::new();
        assert_eq!(table.merge_blob(&blob, false).unwrap(), 3);
        for (id, text) in entries {
            assert_eq!(table.get(id), Some(text));
        }
        assert_eq!(table.get(2), None);
    }

    #[test]
    fn roundtrips_length_prefixed_table() {
        let entries = [(5u32, "Mothman"), (6, "Scorchbeast Queen")];
        let blob = build_blob(&entries, true);

        let mut table = StringTable::new();
        table.merge_blob(&blob, true).unwrap();
        assert_eq!(table.get(5), Some("Mothman"));
        assert_eq!(table.get(6), Some("Scorchbeast Queen"));
    }

    #[test]
    fn duplicate_id_within_file_last_wins() {
        let blob = build_blob(&[(9, "first"), (9, "second")], false);
        let mut table = StringTable::new();
        table.merge_blob(&blob, false).unwrap();
        assert_eq!(table.get(9), Some("second"));
    }

    #[test]
    fn strings_table_wins_across_files() {
        let dl = build_blob(&[(4, "from dlstrings")], true);
        let plain = build_blob(&[(4, "from strings")], false);

        // Load order mirrors load_from_ba2: length-prefixed first.
        let mut table = StringTable::new();
        table.merge_blob(&dl, true).unwrap();
        table.merge_blob(&plain, false).unwrap();
        assert_eq!(table.get(4), Some("from strings"));
    }

    #[test]
    fn bad_offset_is_skipped_not_fatal() {
        let mut blob = build_blob(&[(1, "ok"), (2, "also ok")], false);
        // Corrupt the second directory offset to point past the heap.
        let dir_start = 8;
        blob[dir_start + 12..dir_start + 16].copy_from_slice(&0xffffu32.to_le_bytes());

        let mut table = StringTable::new();
        table.merge_blob(&blob, false).unwrap();
        assert_eq!(table.get(1), Some("ok"));
        assert_eq!(table.get(2), None);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut table = StringTable::new();
        assert!(table.merge_blob(&[0, 0], false).is_err());
    }
}
