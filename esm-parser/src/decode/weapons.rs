//! WEAP and AMMO decoders

use super::{DecodedField, find};
use crate::cursor::Cursor;
use crate::record::Subrecord;
use crate::types::{FormId, RecordType};

const DATA: RecordType = RecordType(*b"DATA");
const DNAM: RecordType = RecordType(*b"DNAM");

pub(super) fn decode_weap(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    let dnam = find(subs, DNAM);
    if let Some(sub) = find(subs, DATA) {
        let _ = weap_data(sub.data, dnam.is_some(), out);
    }
    if let Some(sub) = dnam {
        let _ = weap_dnam(sub.data, out);
    }
}

fn weap_data(data: &[u8], have_dnam: bool, out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    out.push(DecodedField::int("value", cur.read_i32().ok()?));
    out.push(DecodedField::float("weight", cur.read_f32().ok()?));
    let damage = cur.read_i32().ok()?;
    // DNAM carries the authoritative damage; DATA's copy only stands in
    // when DNAM is missing.
    if !have_dnam {
        out.push(DecodedField::int("damage", damage));
    }
    Some(())
}

fn weap_dnam(data: &[u8], out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    out.push(DecodedField::float("damage", cur.read_f32().ok()?));
    out.push(DecodedField::float("speed", cur.read_f32().ok()?));
    out.push(DecodedField::float("reach", cur.read_f32().ok()?));
    out.push(DecodedField::float("min_range", cur.read_f32().ok()?));
    out.push(DecodedField::float("max_range", cur.read_f32().ok()?));
    out.push(DecodedField::float("crit_damage", cur.read_f32().ok()?));
    out.push(DecodedField::float("crit_mult", cur.read_f32().ok()?));
    out.push(DecodedField::int("num_projectiles", cur.read_u8().ok()?));
    Some(())
}

pub(super) fn decode_ammo(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, DATA) {
        let _ = ammo_data(sub.data, out);
    }
}

fn ammo_data(data: &[u8], out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    out.push(DecodedField::form_ref(
        "projectile_form_id",
        FormId(cur.read_u32().ok()?),
    ));
    out.push(DecodedField::int("flags", cur.read_u32().ok()?));
    out.push(DecodedField::float("damage", cur.read_f32().ok()?));
    out.push(DecodedField::int("value", cur.read_i32().ok()?));
    out.push(DecodedField::float("weight", cur.read_f32().ok()?));
    Some(())
}
