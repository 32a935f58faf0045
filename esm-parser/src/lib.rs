//! Streaming parser for Bethesda ESM master data files.
//!
//! An ESM file is a `TES4` file header record followed by top-level `GRUP`
//! containers, each holding length-prefixed records of a single type.
//! Records carry tagged subrecords; payloads may be zlib-compressed. This
//! crate walks the group tree, inflates compressed records, iterates
//! subrecords (honoring the `XXXX` large-length override), and decodes
//! per-type subrecords into named scalar fields suitable for diffing.
//!
//! Localized display names are 32-bit string ids resolved against the
//! string tables shipped inside the localization BA2; see [`strings`].

pub mod cursor;
pub mod decode;
mod error;
mod parser;
mod record;
pub mod strings;
mod types;

pub use decode::{
    DecodedField, DecodedRecord, FieldValue, decode_event, decode_event_full_fidelity,
};
pub use error::{Error, Result};
pub use parser::{CancelFlag, EsmFile, ParseOptions, RecordIter};
pub use record::{
    FLAG_COMPRESSED, GroupHeader, RECORD_HEADER_LEN, RecordEvent, RecordHeader, Subrecord,
    SubrecordIter,
};
pub use strings::StringTable;
pub use types::{FormId, RecordType};
