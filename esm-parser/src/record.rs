//! Record and group headers, record events, subrecord iteration

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::types::{FormId, RecordType};

/// Record flag bit marking a zlib-compressed payload.
pub const FLAG_COMPRESSED: u32 = 0x0004_0000;

/// Size of both the record header and the GRUP header.
pub const RECORD_HEADER_LEN: usize = 24;

/// 24-byte record header.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub record_type: RecordType,
    pub data_size: u32,
    pub flags: u32,
    pub form_id: FormId,
    pub revision: u32,
    pub version: u16,
    pub unknown: u16,
}

impl RecordHeader {
    pub fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            record_type: RecordType(cur.read_tag()?),
            data_size: cur.read_u32()?,
            flags: cur.read_u32()?,
            form_id: FormId(cur.read_u32()?),
            revision: cur.read_u32()?,
            version: cur.read_u16()?,
            unknown: cur.read_u16()?,
        })
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

/// 24-byte GRUP header. `label` interpretation depends on `group_type`;
/// for top-level type groups (`group_type == 0`) it is the record tag.
#[derive(Debug, Clone)]
pub struct GroupHeader {
    /// Total size including this header.
    pub group_size: u32,
    pub label: [u8; 4],
    pub group_type: i32,
    pub timestamp: u16,
    pub version: u16,
    pub unknown: u32,
}

impl GroupHeader {
    /// Parse the fields following the `GRUP` tag.
    pub fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            group_size: cur.read_u32()?,
            label: cur.read_tag()?,
            group_type: cur.read_i32()?,
            timestamp: cur.read_u16()?,
            version: cur.read_u16()?,
            unknown: cur.read_u32()?,
        })
    }

    /// Record type carried by a top-level type group.
    pub fn label_type(&self) -> RecordType {
        RecordType(self.label)
    }
}

/// One parsed record: header attributes plus the uncompressed subrecord
/// stream. Subrecords are iterated on demand from the owned bytes.
#[derive(Debug, Clone)]
pub struct RecordEvent {
    pub record_type: RecordType,
    pub form_id: FormId,
    pub flags: u32,
    pub revision: u32,
    pub version: u16,
    /// Uncompressed subrecord stream.
    pub data: Vec<u8>,
}

impl RecordEvent {
    /// Iterate the subrecords, honoring the `XXXX` length override.
    pub fn subrecords(&self) -> SubrecordIter<'_> {
        SubrecordIter::new(&self.data, self.form_id)
    }

    /// SHA-256 of the uncompressed subrecord stream, hex-encoded.
    ///
    /// This is the content identity of the record: two records hashing
    /// equal are identical regardless of on-disk compression.
    pub fn data_hash(&self) -> String {
        hex::encode(Sha256::digest(&self.data))
    }
}

/// A subrecord borrowed from a record's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subrecord<'a> {
    pub tag: RecordType,
    pub data: &'a [u8],
}

/// Iterator over subrecords within one record payload.
///
/// `XXXX` entries are consumed internally: their u32 payload overrides the
/// declared length of the following subrecord. A subrecord extending past
/// the end of the payload is dropped with a warning and ends iteration.
pub struct SubrecordIter<'a> {
    cur: Cursor<'a>,
    form_id: FormId,
    done: bool,
}

impl<'a> SubrecordIter<'a> {
    fn new(data: &'a [u8], form_id: FormId) -> Self {
        Self {
            cur: Cursor::new(data),
            form_id,
            done: false,
        }
    }
}

impl<'a> Iterator for SubrecordIter<'a> {
    type Item = Result<Subrecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cur.is_empty() {
            return None;
        }

        let mut override_len: Option<u32> = None;

        loop {
            let Ok(tag) = self.cur.read_tag() else {
                warn!(form_id = %self.form_id, "dangling bytes at end of record payload");
                self.done = true;
                return None;
            };
            let tag = RecordType(tag);
            let Ok(declared_len) = self.cur.read_u16() else {
                warn!(form_id = %self.form_id, tag = %tag, "subrecord header truncated");
                self.done = true;
                return None;
            };

            if tag == RecordType::XXXX {
                if declared_len as usize != 4 {
                    self.done = true;
                    return Some(Err(Error::Malformed {
                        form_id: self.form_id,
                        reason: format!("XXXX subrecord with length {declared_len}"),
                    }));
                }
                let Ok(value) = self.cur.read_u32() else {
                    self.done = true;
                    return Some(Err(Error::Malformed {
                        form_id: self.form_id,
                        reason: "XXXX subrecord payload truncated".into(),
                    }));
                };
                if value == u32::MAX {
                    self.done = true;
                    return Some(Err(Error::Malformed {
                        form_id: self.form_id,
                        reason: "XXXX override of u32::MAX".into(),
                    }));
                }
                override_len = Some(value);
                continue;
            }

            let len = override_len.take().map_or(declared_len as usize, |v| v as usize);
            match self.cur.take(len) {
                Ok(data) => return Some(Ok(Subrecord { tag, data })),
                Err(_) => {
                    warn!(
                        form_id = %self.form_id,
                        tag = %tag,
                        len,
                        remaining = self.cur.remaining(),
                        "subrecord length exceeds remaining payload, dropping"
                    );
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sub(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(tag);
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    fn event(data: Vec<u8>) -> RecordEvent {
        RecordEvent {
            record_type: RecordType::WEAP,
            form_id: FormId(0x100),
            flags: 0,
            revision: 0,
            version: 208,
            data,
        }
    }

    #[test]
    fn iterates_subrecords_in_order() {
        let mut data = sub(b"EDID", b"Test\0");
        data.extend(sub(b"DATA", &[1, 2, 3]));
        let event = event(data);

        let subs: Vec<_> = event.subrecords().map(Result::unwrap).collect();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].tag, RecordType::EDID);
        assert_eq!(subs[0].data, b"Test\0");
        assert_eq!(subs[1].tag.as_str(), "DATA");
        assert_eq!(subs[1].data, &[1, 2, 3]);
    }

    #[test]
    fn empty_payload_has_no_subrecords() {
        let event = event(Vec::new());
        assert_eq!(event.subrecords().count(), 0);
    }

    #[test]
    fn xxxx_override_applies_to_next_subrecord() {
        // XXXX declares 10 bytes; the next subrecord's own length field
        // says 0 and must be ignored.
        let mut data = sub(b"XXXX", &10u32.to_le_bytes());
        data.extend_from_slice(b"ONAM");
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&[7u8; 10]);
        data.extend(sub(b"EDID", b"After\0"));
        let event = event(data);

        let subs: Vec<_> = event.subrecords().map(Result::unwrap).collect();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].tag.as_str(), "ONAM");
        assert_eq!(subs[0].data, &[7u8; 10]);
        assert_eq!(subs[1].tag, RecordType::EDID);
    }

    #[test]
    fn xxxx_override_of_u32_max_is_malformed() {
        let mut data = sub(b"XXXX", &u32::MAX.to_le_bytes());
        data.extend(sub(b"DATA", &[1]));
        let event = event(data);

        let first = event.subrecords().next().unwrap();
        assert!(matches!(first, Err(Error::Malformed { .. })));
    }

    #[test]
    fn overlong_subrecord_is_dropped() {
        let mut data = sub(b"EDID", b"Ok\0");
        data.extend_from_slice(b"DATA");
        data.extend_from_slice(&100u16.to_le_bytes());
        data.extend_from_slice(&[1, 2]); // only 2 of 100 bytes present
        let event = event(data);

        let subs: Vec<_> = event.subrecords().map(Result::unwrap).collect();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].tag, RecordType::EDID);
    }

    #[test]
    fn payload_length_accounting() {
        let mut data = sub(b"EDID", b"X\0");
        data.extend(sub(b"XXXX", &3u32.to_le_bytes()));
        data.extend_from_slice(b"ONAM");
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&[9u8; 3]);
        let event = event(data.clone());

        // 6 + 2 for EDID, 6 + 4 for XXXX, 6 + 3 for the overridden ONAM.
        let total: usize = 6 + 2 + 6 + 4 + 6 + 3;
        assert_eq!(data.len(), total);
        assert_eq!(event.subrecords().count(), 2);
    }

    #[test]
    fn data_hash_is_sha256_of_payload() {
        use sha2::{Digest, Sha256};
        let event = event(sub(b"EDID", b"X\0"));
        assert_eq!(event.data_hash(), hex::encode(Sha256::digest(&event.data)));
        assert_eq!(event.data_hash().len(), 64);
    }

    #[test]
    fn compressed_flag() {
        let header = RecordHeader {
            record_type: RecordType::NPC_,
            data_size: 0,
            flags: FLAG_COMPRESSED,
            form_id: FormId(1),
            revision: 0,
            version: 208,
            unknown: 0,
        };
        assert!(header.is_compressed());
    }
}
