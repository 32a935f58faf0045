//! QUST decoder

use super::{DecodedField, find};
use crate::cursor::Cursor;
use crate::record::Subrecord;
use crate::types::RecordType;

const DNAM: RecordType = RecordType(*b"DNAM");

const FLAG_START_ENABLED: u16 = 0x0001;

pub(super) fn decode(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, DNAM) {
        let _ = dnam_fields(sub.data, out);
    }
}

fn dnam_fields(data: &[u8], out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    let flags = cur.read_u16().ok()?;
    out.push(DecodedField::int("flags", i64::from(flags)));
    out.push(DecodedField::boolean(
        "start_enabled",
        flags & FLAG_START_ENABLED != 0,
    ));
    out.push(DecodedField::int("priority", cur.read_u8().ok()?));
    cur.skip(1).ok()?; // pad
    out.push(DecodedField::int("quest_type", cur.read_u32().ok()?));
    Some(())
}
