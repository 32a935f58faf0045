//! Streaming walk over the ESM group tree

use memmap2::{Mmap, MmapOptions};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::cursor::{Cursor, inflate};
use crate::error::{Error, Result};
use crate::record::{GroupHeader, RECORD_HEADER_LEN, RecordEvent, RecordHeader};
use crate::types::RecordType;

/// Shared cancellation flag, checked at group boundaries and before each
/// record. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for a record walk.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Group labels and record types skipped wholesale. Placed references,
    /// navmeshes and placed actors dominate the file by count and carry
    /// nothing the datamine surfaces.
    pub skip: HashSet<RecordType>,
    /// Cooperative cancellation; [`Error::Cancelled`] ends the walk.
    pub cancel: Option<CancelFlag>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        let skip = [RecordType::REFR, RecordType::NAVM, RecordType::ACHR]
            .into_iter()
            .collect();
        Self { skip, cancel: None }
    }
}

impl ParseOptions {
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[derive(Debug)]
enum Source {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Source {
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Mapped(m) => m,
            Source::Owned(v) => v,
        }
    }
}

/// An opened master file: the memory-mapped (or buffered) bytes, the file
/// hash, and the parsed `TES4` file header.
#[derive(Debug)]
pub struct EsmFile {
    source: Source,
    sha256: String,
    header: RecordHeader,
    records_start: usize,
}

impl EsmFile {
    /// Open and validate a master file. The file is mapped read-only when
    /// the platform allows, otherwise read into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        #[allow(unsafe_code)] // read-only map of a read-only file
        let source = match unsafe { MmapOptions::new().map(&file) } {
            Ok(mmap) => Source::Mapped(mmap),
            Err(e) => {
                debug!("mmap unavailable ({e}), buffering whole file");
                Source::Owned(std::fs::read(path)?)
            }
        };
        Self::from_source(source)
    }

    /// Parse an in-memory master file (tests, pre-loaded buffers).
    pub fn from_owned(bytes: Vec<u8>) -> Result<Self> {
        Self::from_source(Source::Owned(bytes))
    }

    fn from_source(source: Source) -> Result<Self> {
        let sha256 = hex::encode(Sha256::digest(source.bytes()));

        let mut cur = Cursor::new(source.bytes());
        let header = RecordHeader::parse(&mut cur)?;
        if header.record_type != RecordType::TES4 {
            return Err(Error::BadMagic(header.record_type.0));
        }
        if header.version != 208 {
            return Err(Error::UnsupportedVersion(header.version));
        }

        let records_start = RECORD_HEADER_LEN + header.data_size as usize;
        debug!(
            sha256 = %sha256,
            file_len = source.bytes().len(),
            "opened master file"
        );

        Ok(Self {
            source,
            sha256,
            header,
            records_start,
        })
    }

    /// SHA-256 of the whole file as read, hex-encoded.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// The `TES4` file header record.
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Raw file bytes.
    pub fn data(&self) -> &[u8] {
        self.source.bytes()
    }

    /// Walk all records with default options.
    pub fn records(&self) -> RecordIter<'_> {
        self.records_with(ParseOptions::default())
    }

    /// Walk all records. Record-level failures are yielded as `Err` and the
    /// walk continues; callers decide whether to log-and-skip or abort.
    pub fn records_with(&self, options: ParseOptions) -> RecordIter<'_> {
        let data = self.source.bytes();
        let start = self.records_start.min(data.len());
        if start < self.records_start {
            warn!("TES4 header declares payload past end of file");
        }
        RecordIter {
            cur: {
                let mut cur = Cursor::new(data);
                // records_start is clamped to the data length above.
                let _ = cur.seek(start);
                cur
            },
            options,
            group_ends: Vec::new(),
            skipped: 0,
            done: false,
        }
    }
}

/// Iterator over [`RecordEvent`]s in file order.
pub struct RecordIter<'a> {
    cur: Cursor<'a>,
    options: ParseOptions,
    /// End offsets of the groups we are inside, innermost last.
    group_ends: Vec<usize>,
    skipped: u64,
    done: bool,
}

impl RecordIter<'_> {
    /// Records dropped due to group truncation so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn current_end(&self) -> usize {
        self.group_ends
            .last()
            .copied()
            .unwrap_or(self.cur_data_len())
    }

    fn cur_data_len(&self) -> usize {
        self.cur.pos() + self.cur.remaining()
    }

    /// Abort the innermost group: seek to its end and pop it.
    fn abort_group(&mut self) {
        let end = self.current_end();
        let _ = self.cur.seek(end);
        self.group_ends.pop();
    }
}

impl Iterator for RecordIter<'_> {
    type Item = Result<RecordEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some(cancel) = &self.options.cancel {
                if cancel.is_cancelled() {
                    self.done = true;
                    return Some(Err(Error::Cancelled));
                }
            }

            // Leave any groups we have walked off the end of.
            while let Some(&end) = self.group_ends.last() {
                if self.cur.pos() >= end {
                    if self.cur.pos() > end {
                        warn!(
                            pos = self.cur.pos(),
                            end, "group accounting overran its declared size"
                        );
                        let _ = self.cur.seek(end.min(self.cur_data_len()));
                    }
                    self.group_ends.pop();
                } else {
                    break;
                }
            }

            if self.cur.is_empty() {
                return None;
            }

            let start = self.cur.pos();
            let end = self.current_end();
            if start + RECORD_HEADER_LEN > end {
                warn!(offset = start, "truncated group header, aborting group");
                self.abort_group();
                continue;
            }

            let tag = {
                let mut peek = self.cur.clone();
                match peek.read_tag() {
                    Ok(t) => RecordType(t),
                    Err(_) => {
                        self.done = true;
                        return None;
                    }
                }
            };

            if tag == RecordType::GRUP {
                let _ = self.cur.read_tag();
                let group = match GroupHeader::parse(&mut self.cur) {
                    Ok(g) => g,
                    Err(_) => {
                        warn!(offset = start, "truncated GRUP header, stopping");
                        self.done = true;
                        return None;
                    }
                };

                if (group.group_size as usize) < RECORD_HEADER_LEN {
                    warn!(
                        offset = start,
                        size = group.group_size,
                        "group smaller than its own header, aborting group"
                    );
                    self.abort_group();
                    continue;
                }

                let declared_end = start + group.group_size as usize;
                if declared_end > end {
                    warn!(
                        label = %group.label_type(),
                        declared_end,
                        container_end = end,
                        "truncated group, clamping to container"
                    );
                }
                let group_end = declared_end.min(end);

                if group.group_type == 0 && self.options.skip.contains(&group.label_type()) {
                    let _ = self.cur.seek(group_end);
                    continue;
                }

                // Descend; nested sub-block groups are walked the same way.
                self.group_ends.push(group_end);
                continue;
            }

            let header = match RecordHeader::parse(&mut self.cur) {
                Ok(h) => h,
                Err(_) => {
                    warn!(offset = start, "truncated header at end of file");
                    self.done = true;
                    return None;
                }
            };

            // Skip-set records are seeked past without payload reads.
            if self.options.skip.contains(&header.record_type) {
                if self.cur.skip(header.data_size as usize).is_err() {
                    warn!(form_id = %header.form_id, "skip-set record truncated, aborting group");
                    self.abort_group();
                }
                continue;
            }

            let record_end = start + RECORD_HEADER_LEN + header.data_size as usize;
            if record_end > end {
                warn!(
                    form_id = %header.form_id,
                    "record payload crosses group boundary, aborting group"
                );
                self.skipped += 1;
                self.abort_group();
                continue;
            }

            // data_size bytes are in range per the check above.
            let Ok(payload) = self.cur.take(header.data_size as usize) else {
                self.abort_group();
                continue;
            };

            let data = if header.is_compressed() {
                let mut pc = Cursor::new(payload);
                let unpacked_len = match pc.read_u32() {
                    Ok(v) => v as usize,
                    Err(_) => {
                        return Some(Err(Error::Malformed {
                            form_id: header.form_id,
                            reason: "compressed record shorter than its length prefix".into(),
                        }));
                    }
                };
                match inflate(&payload[4..], unpacked_len) {
                    Ok(data) => data,
                    Err(reason) => {
                        return Some(Err(Error::DecompressFailed {
                            form_id: header.form_id,
                            reason,
                        }));
                    }
                }
            } else {
                payload.to_vec()
            };

            return Some(Ok(RecordEvent {
                record_type: header.record_type,
                form_id: header.form_id,
                flags: header.flags,
                revision: header.revision,
                version: header.version,
                data,
            }));
        }
    }
}
