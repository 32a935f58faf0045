//! Row types and the persisted field-value codec

use esm_parser::{FieldValue, FormId, RecordType};

use crate::error::{Error, Result};

/// Snapshot row id. Monotonic within one database.
pub type SnapshotId = i64;

/// One row of the `snapshots` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub id: SnapshotId,
    pub label: String,
    /// UTC, RFC 3339.
    pub created_at: String,
    pub esm_sha256: String,
    pub record_count: u64,
    pub string_count: u64,
}

/// Record identity columns used by set-level diffing and search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub form_id: FormId,
    pub record_type: RecordType,
    pub editor_id: Option<String>,
    pub full_name: Option<String>,
    pub data_hash: String,
}

/// A full record row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub snapshot_id: SnapshotId,
    pub form_id: FormId,
    pub record_type: RecordType,
    pub flags: u32,
    pub revision: u32,
    pub version: u16,
    pub editor_id: Option<String>,
    pub full_name: Option<String>,
    pub data_hash: String,
}

/// Encode a field value for persistence as `(kind, text)`.
///
/// Floats are stored as their exact bit pattern so that diffing against
/// reloaded rows stays binary-faithful.
pub(crate) fn encode_value(value: &FieldValue) -> (&'static str, String) {
    let text = match value {
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Float(v) => format!("{:08x}", v.to_bits()),
        FieldValue::Str(v) => v.clone(),
        FieldValue::Bool(v) => String::from(if *v { "1" } else { "0" }),
        FieldValue::FormRef(v) => v.to_string(),
        FieldValue::Blob(v) => hex::encode(v),
    };
    (value.kind(), text)
}

/// Decode a persisted `(kind, text)` pair.
///
/// An unknown kind is surfaced, never silently dropped: it means the row
/// was written by a newer schema.
pub(crate) fn decode_value(kind: &str, text: &str) -> Result<FieldValue> {
    match kind {
        "int" => text
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| Error::UnknownFieldKind(format!("int:{text}"))),
        "float" => u32::from_str_radix(text, 16)
            .map(|bits| FieldValue::Float(f32::from_bits(bits)))
            .map_err(|_| Error::UnknownFieldKind(format!("float:{text}"))),
        "string" => Ok(FieldValue::Str(text.to_string())),
        "bool" => Ok(FieldValue::Bool(text == "1")),
        "form_ref" => FormId::parse(text)
            .map(FieldValue::FormRef)
            .ok_or_else(|| Error::UnknownFieldKind(format!("form_ref:{text}"))),
        "blob" => hex::decode(text)
            .map(FieldValue::Blob)
            .map_err(|_| Error::UnknownFieldKind(format!("blob:{text}"))),
        other => Err(Error::UnknownFieldKind(other.to_string())),
    }
}
