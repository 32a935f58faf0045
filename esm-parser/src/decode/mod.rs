//! Per-record-type subrecord decoders.
//!
//! Each known record type gets a decoder that turns its subrecords into
//! named `(name, value)` fields; the field names are stable per type and
//! are the unit of diffing. Decoders are total: missing subrecords and
//! short payloads yield missing fields, never errors or partial values.
//! Unknown record types decode to the common fields only.

mod alch;
mod armor;
mod cobj;
mod gmst;
mod items;
mod npc;
mod qust;
mod weapons;

use std::fmt;
use tracing::warn;

use crate::record::{RecordEvent, Subrecord};
use crate::strings::StringTable;
use crate::types::{FormId, RecordType};

/// A decoded scalar value with its kind discriminator.
///
/// Diff equality is on the `(kind, value)` pair; see [`FieldValue::diff_eq`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f32),
    Str(String),
    Bool(bool),
    FormRef(FormId),
    Blob(Vec<u8>),
}

impl FieldValue {
    /// Kind discriminator, also used as the persisted column value.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
            FieldValue::Bool(_) => "bool",
            FieldValue::FormRef(_) => "form_ref",
            FieldValue::Blob(_) => "blob",
        }
    }

    /// Equality as used by the diff engine: kinds must match, floats
    /// compare bit-exact after canonicalizing NaN payloads and folding
    /// `-0.0` into `+0.0`.
    pub fn diff_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Float(a), FieldValue::Float(b)) => {
                canonical_f32_bits(*a) == canonical_f32_bits(*b)
            }
            (a, b) => a == b,
        }
    }
}

/// Canonical bit pattern for diffing: one NaN, one zero.
pub(crate) fn canonical_f32_bits(v: f32) -> u32 {
    if v.is_nan() {
        f32::NAN.to_bits()
    } else if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Str(v) => f.write_str(v),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::FormRef(v) => write!(f, "{v}"),
            FieldValue::Blob(v) if v.len() <= 16 => f.write_str(&hex::encode(v)),
            FieldValue::Blob(v) => write!(f, "{}... ({} bytes)", hex::encode(&v[..16]), v.len()),
        }
    }
}

/// One named decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub name: String,
    pub value: FieldValue,
}

impl DecodedField {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn int(name: impl Into<String>, v: impl Into<i64>) -> Self {
        Self::new(name, FieldValue::Int(v.into()))
    }

    pub fn float(name: impl Into<String>, v: f32) -> Self {
        Self::new(name, FieldValue::Float(v))
    }

    pub fn string(name: impl Into<String>, v: impl Into<String>) -> Self {
        Self::new(name, FieldValue::Str(v.into()))
    }

    pub fn boolean(name: impl Into<String>, v: bool) -> Self {
        Self::new(name, FieldValue::Bool(v))
    }

    pub fn form_ref(name: impl Into<String>, v: FormId) -> Self {
        Self::new(name, FieldValue::FormRef(v))
    }
}

/// A fully decoded record, ready for the snapshot store.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub record_type: RecordType,
    pub form_id: FormId,
    pub flags: u32,
    pub revision: u32,
    pub version: u16,
    pub editor_id: Option<String>,
    pub full_name: Option<String>,
    /// SHA-256 of the uncompressed subrecord stream (full hex).
    pub data_hash: String,
    pub fields: Vec<DecodedField>,
    /// Raw subrecords, retained only in full-fidelity mode.
    pub subrecords: Option<Vec<(RecordType, Vec<u8>)>>,
}

/// Decode one record event. The string table resolves `FULL` string ids;
/// pass `None` to keep ids numeric.
pub fn decode_event(event: &RecordEvent, strings: Option<&StringTable>) -> DecodedRecord {
    let mut subs = Vec::new();
    for result in event.subrecords() {
        match result {
            Ok(sub) => subs.push(sub),
            Err(e) => {
                warn!(form_id = %event.form_id, "stopping subrecord walk: {e}");
                break;
            }
        }
    }

    let mut fields = Vec::new();
    let mut editor_id = None;
    let mut full_name = None;

    if let Some(sub) = find(&subs, RecordType::EDID) {
        let edid = zstring(sub.data);
        fields.push(DecodedField::string("editor_id", edid.clone()));
        editor_id = Some(edid);
    }

    if let Some(sub) = find(&subs, RecordType::FULL) {
        match resolve_full(sub.data, strings) {
            FullName::Resolved(text) => {
                fields.push(DecodedField::string("full_name", text.clone()));
                full_name = Some(text);
            }
            FullName::Unresolved(id) => {
                // Not an error: keep the numeric id so diffs still see it.
                fields.push(DecodedField::int("full_name_id", i64::from(id)));
            }
            FullName::Absent => {}
        }
    }

    match event.record_type {
        RecordType::WEAP => weapons::decode_weap(&subs, &mut fields),
        RecordType::AMMO => weapons::decode_ammo(&subs, &mut fields),
        RecordType::ARMO => armor::decode(&subs, &mut fields),
        RecordType::ALCH => alch::decode_alch(&subs, &mut fields),
        RecordType::FLOR => alch::decode_flor(&subs, &mut fields),
        RecordType::NPC_ => npc::decode(&subs, &mut fields),
        RecordType::QUST => qust::decode(&subs, &mut fields),
        RecordType::COBJ => cobj::decode_cobj(&subs, &mut fields),
        RecordType::CONT => cobj::decode_cont(&subs, &mut fields),
        RecordType::MISC | RecordType::BOOK | RecordType::KEYM => {
            items::decode(&subs, &mut fields);
        }
        RecordType::GMST => gmst::decode_gmst(&subs, editor_id.as_deref(), strings, &mut fields),
        RecordType::GLOB => gmst::decode_glob(&subs, &mut fields),
        // KYWD and unknown types carry only the common fields.
        _ => {}
    }

    DecodedRecord {
        record_type: event.record_type,
        form_id: event.form_id,
        flags: event.flags,
        revision: event.revision,
        version: event.version,
        editor_id,
        full_name,
        data_hash: event.data_hash(),
        fields,
        subrecords: None,
    }
}

/// Decode with raw subrecords retained for full-fidelity persistence.
pub fn decode_event_full_fidelity(
    event: &RecordEvent,
    strings: Option<&StringTable>,
) -> DecodedRecord {
    let mut decoded = decode_event(event, strings);
    decoded.subrecords = Some(
        event
            .subrecords()
            .filter_map(std::result::Result::ok)
            .map(|s| (s.tag, s.data.to_vec()))
            .collect(),
    );
    decoded
}

enum FullName {
    Resolved(String),
    Unresolved(u32),
    Absent,
}

fn resolve_full(data: &[u8], strings: Option<&StringTable>) -> FullName {
    if data.len() == 4 {
        let id = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if id == 0 {
            return FullName::Absent;
        }
        match strings.and_then(|t| t.get(id)) {
            Some(text) => FullName::Resolved(text.to_string()),
            None => FullName::Unresolved(id),
        }
    } else if data.is_empty() {
        FullName::Absent
    } else {
        FullName::Resolved(zstring(data))
    }
}

pub(crate) fn find<'a>(subs: &[Subrecord<'a>], tag: RecordType) -> Option<Subrecord<'a>> {
    subs.iter().find(|s| s.tag == tag).copied()
}

/// Payload as text up to the first NUL (or the whole payload).
pub(crate) fn zstring(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}


#[cfg(test)]
mod tests {
    use super::testutil::event;
    use super::*;
    use pretty_assertions::assert_eq;

    fn field<'a>(record: &'a DecodedRecord, name: &str) -> &'a FieldValue {
        &record
            .fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("missing field {name}"))
            .value
    }

    #[test]
    fn edid_becomes_editor_id() {
        let event = event(RecordType::KYWD, &[(b"EDID", b"WorkshopItem\0")]);
        let decoded = decode_event(&event, None);
        assert_eq!(decoded.editor_id.as_deref(), Some("WorkshopItem"));
        assert_eq!(field(&decoded, "editor_id"), &FieldValue::Str("WorkshopItem".into()));
    }

    #[test]
    fn full_resolves_through_string_table() {
        let mut table = StringTable::new();
        let blob = {
            // id 7 -> "10mm Pistol"
            let mut heap = b"10mm Pistol\0".to_vec();
            let mut out = Vec::new();
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&(heap.len() as u32).to_le_bytes());
            out.extend_from_slice(&7u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.append(&mut heap);
            out
        };
        table.merge_blob(&blob, false).unwrap();

        let event = event(RecordType::WEAP, &[(b"FULL", &7u32.to_le_bytes())]);
        let decoded = decode_event(&event, Some(&table));
        assert_eq!(decoded.full_name.as_deref(), Some("10mm Pistol"));
    }

    #[test]
    fn unresolved_string_id_is_kept_numeric() {
        let event = event(RecordType::WEAP, &[(b"FULL", &1234u32.to_le_bytes())]);
        let decoded = decode_event(&event, None);
        assert_eq!(decoded.full_name, None);
        assert_eq!(field(&decoded, "full_name_id"), &FieldValue::Int(1234));
    }

    #[test]
    fn inline_full_text_is_used_verbatim() {
        let event = event(RecordType::WEAP, &[(b"FULL", b"Inline Name\0")]);
        let decoded = decode_event(&event, None);
        assert_eq!(decoded.full_name.as_deref(), Some("Inline Name"));
    }

    #[test]
    fn unknown_record_types_keep_common_fields_only() {
        let event = event(RecordType(*b"ZZZZ"), &[(b"EDID", b"Opaque\0"), (b"DATA", &[1, 2])]);
        let decoded = decode_event(&event, None);
        assert_eq!(decoded.editor_id.as_deref(), Some("Opaque"));
        assert_eq!(decoded.fields.len(), 1);
    }

    #[test]
    fn empty_record_decodes_to_nothing() {
        let event = event(RecordType::WEAP, &[]);
        let decoded = decode_event(&event, None);
        assert!(decoded.fields.is_empty());
        assert!(decoded.editor_id.is_none());
    }

    #[test]
    fn fields_are_a_function_of_payload_bytes() {
        let a = event(RecordType::MISC, &[(b"EDID", b"Cap\0"), (b"DATA", &[0; 8])]);
        let mut b = a.clone();
        b.form_id = FormId(0x0999_9999);
        let da = decode_event(&a, None);
        let db = decode_event(&b, None);
        assert_eq!(da.fields, db.fields);
        assert_eq!(da.data_hash, db.data_hash);
    }

    #[test]
    fn full_fidelity_retains_raw_subrecords() {
        let event = event(RecordType::MISC, &[(b"EDID", b"Cap\0")]);
        let decoded = decode_event_full_fidelity(&event, None);
        let subs = decoded.subrecords.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].0, RecordType::EDID);
        assert_eq!(subs[0].1, b"Cap\0");
    }

    #[test]
    fn float_diff_eq_canonicalizes() {
        let a = FieldValue::Float(0.0);
        let b = FieldValue::Float(-0.0);
        assert!(a.diff_eq(&b));
        assert!(FieldValue::Float(f32::NAN).diff_eq(&FieldValue::Float(-f32::NAN)));
        assert!(!FieldValue::Float(1.0).diff_eq(&FieldValue::Float(1.0000001)));
        assert!(!FieldValue::Float(1.0).diff_eq(&FieldValue::Int(1)));
    }

    #[test]
    fn display_formats() {
        assert_eq!(FieldValue::FormRef(FormId(0xab)).to_string(), "0x000000AB");
        assert_eq!(FieldValue::Float(50.0).to_string(), "50");
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
    }
}
