//! MISC, BOOK and KEYM share one value/weight layout

use super::{DecodedField, find};
use crate::cursor::Cursor;
use crate::record::Subrecord;
use crate::types::RecordType;

const DATA: RecordType = RecordType(*b"DATA");

pub(super) fn decode(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, DATA) {
        let _ = data_fields(sub.data, out);
    }
}

fn data_fields(data: &[u8], out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    out.push(DecodedField::int("value", cur.read_i32().ok()?));
    out.push(DecodedField::float("weight", cur.read_f32().ok()?));
    Some(())
}
