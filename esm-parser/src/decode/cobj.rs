//! COBJ (constructible object) and CONT (container) decoders

use super::{DecodedField, find};
use crate::cursor::Cursor;
use crate::record::Subrecord;
use crate::types::{FormId, RecordType};

const CNAM: RecordType = RecordType(*b"CNAM");
const BNAM: RecordType = RecordType(*b"BNAM");
const NAM1: RecordType = RecordType(*b"NAM1");
const FVPA: RecordType = RecordType(*b"FVPA");
const CNTO: RecordType = RecordType(*b"CNTO");

pub(super) fn decode_cobj(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, CNAM) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(created) = cur.read_u32() {
            out.push(DecodedField::form_ref("created_form_id", FormId(created)));
        }
    }
    if let Some(sub) = find(subs, BNAM) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(workbench) = cur.read_u32() {
            out.push(DecodedField::form_ref(
                "workbench_keyword_form_id",
                FormId(workbench),
            ));
        }
    }
    if let Some(sub) = find(subs, NAM1) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(count) = cur.read_u16() {
            out.push(DecodedField::int("created_count", count));
        }
    }
    if let Some(sub) = find(subs, FVPA) {
        // Array of (form id, count) component pairs; a trailing partial
        // pair is ignored.
        let mut cur = Cursor::new(sub.data);
        let mut index = 0;
        while cur.remaining() >= 8 {
            let Ok(form_id) = cur.read_u32() else { break };
            let Ok(count) = cur.read_u32() else { break };
            out.push(DecodedField::form_ref(
                format!("component_{index}_form_id"),
                FormId(form_id),
            ));
            out.push(DecodedField::int(
                format!("component_{index}_count"),
                i64::from(count),
            ));
            index += 1;
        }
    }
}

pub(super) fn decode_cont(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    // One CNTO subrecord per contained item.
    let mut index = 0;
    for sub in subs.iter().filter(|s| s.tag == CNTO) {
        let mut cur = Cursor::new(sub.data);
        let Ok(form_id) = cur.read_u32() else { continue };
        let Ok(count) = cur.read_u32() else { continue };
        out.push(DecodedField::form_ref(
            format!("item_{index}_form_id"),
            FormId(form_id),
        ));
        out.push(DecodedField::int(format!("item_{index}_count"), i64::from(count)));
        index += 1;
    }
}
