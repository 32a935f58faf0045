//! GMST (game setting) and GLOB (global variable) decoders.
//!
//! Game settings are typed by convention: the first character of the
//! editor id selects how the DATA payload is read.

use super::{DecodedField, find, zstring};
use crate::cursor::Cursor;
use crate::record::Subrecord;
use crate::strings::StringTable;
use crate::types::RecordType;

const DATA: RecordType = RecordType(*b"DATA");
const FNAM: RecordType = RecordType(*b"FNAM");
const FLTV: RecordType = RecordType(*b"FLTV");

pub(super) fn decode_gmst(
    subs: &[Subrecord<'_>],
    editor_id: Option<&str>,
    strings: Option<&StringTable>,
    out: &mut Vec<DecodedField>,
) {
    let Some(sub) = find(subs, DATA) else { return };
    let Some(type_char) = editor_id.and_then(|e| e.chars().next()) else {
        return;
    };

    let mut cur = Cursor::new(sub.data);
    match type_char {
        'f' => {
            if let Ok(v) = cur.read_f32() {
                out.push(DecodedField::float("value", v));
            }
        }
        'i' => {
            if let Ok(v) = cur.read_i32() {
                out.push(DecodedField::int("value", v));
            }
        }
        'b' => {
            if let Ok(v) = cur.read_u32() {
                out.push(DecodedField::boolean("value", v != 0));
            }
        }
        's' => {
            if sub.data.len() == 4 {
                if let Ok(id) = cur.read_u32() {
                    match strings.and_then(|t| t.get(id)) {
                        Some(text) => out.push(DecodedField::string("value", text)),
                        None => out.push(DecodedField::int("value_id", i64::from(id))),
                    }
                }
            } else {
                out.push(DecodedField::string("value", zstring(sub.data)));
            }
        }
        _ => {}
    }
}

pub(super) fn decode_glob(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, FNAM) {
        if let Some(&c) = sub.data.first() {
            out.push(DecodedField::string("type_char", (c as char).to_string()));
        }
    }
    if let Some(sub) = find(subs, FLTV) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(v) = cur.read_f32() {
            out.push(DecodedField::float("value", v));
        }
    }
}
