//! ALCH (ingestible) and FLOR (harvestable) decoders

use super::{DecodedField, find};
use crate::cursor::Cursor;
use crate::record::Subrecord;
use crate::types::{FormId, RecordType};

const DATA: RecordType = RecordType(*b"DATA");
const ENIT: RecordType = RecordType(*b"ENIT");
const EFID: RecordType = RecordType(*b"EFID");
const EFIT: RecordType = RecordType(*b"EFIT");
const PFIG: RecordType = RecordType(*b"PFIG");

const FLAG_FOOD: u32 = 0x0000_0002;
const FLAG_MEDICINE: u32 = 0x0001_0000;
const FLAG_POISON: u32 = 0x0002_0000;

pub(super) fn decode_alch(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, DATA) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(weight) = cur.read_f32() {
            out.push(DecodedField::float("weight", weight));
        }
    }
    if let Some(sub) = find(subs, ENIT) {
        let _ = enit_fields(sub.data, out);
    }

    // Effects come as EFID/EFIT pairs, one pair per effect, in file order.
    let mut index = 0;
    let mut subs_iter = subs.iter().peekable();
    while let Some(sub) = subs_iter.next() {
        if sub.tag != EFID {
            continue;
        }
        let mut cur = Cursor::new(sub.data);
        if let Ok(effect) = cur.read_u32() {
            out.push(DecodedField::form_ref(
                format!("effect_{index}_form_id"),
                FormId(effect),
            ));
        }
        if let Some(next) = subs_iter.peek() {
            if next.tag == EFIT {
                let _ = efit_fields(next.data, index, out);
                subs_iter.next();
            }
        }
        index += 1;
    }
}

fn enit_fields(data: &[u8], out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    out.push(DecodedField::int("value", cur.read_i32().ok()?));
    let flags = cur.read_u32().ok()?;
    out.push(DecodedField::int("flags", i64::from(flags)));
    out.push(DecodedField::boolean("is_food", flags & FLAG_FOOD != 0));
    out.push(DecodedField::boolean("is_medicine", flags & FLAG_MEDICINE != 0));
    out.push(DecodedField::boolean("is_poison", flags & FLAG_POISON != 0));
    Some(())
}

fn efit_fields(data: &[u8], index: usize, out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    out.push(DecodedField::float(
        format!("effect_{index}_magnitude"),
        cur.read_f32().ok()?,
    ));
    out.push(DecodedField::int(
        format!("effect_{index}_area"),
        cur.read_u32().ok()?,
    ));
    out.push(DecodedField::int(
        format!("effect_{index}_duration"),
        cur.read_u32().ok()?,
    ));
    Some(())
}

pub(super) fn decode_flor(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, PFIG) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(ingredient) = cur.read_u32() {
            out.push(DecodedField::form_ref(
                "harvest_ingredient_form_id",
                FormId(ingredient),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::event;
    use super::super::{FieldValue, decode_event};
    use crate::types::RecordType;
    use pretty_assertions::assert_eq;

    fn efit(magnitude: f32, area: u32, duration: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&magnitude.to_le_bytes());
        out.extend_from_slice(&area.to_le_bytes());
        out.extend_from_slice(&duration.to_le_bytes());
        out
    }

    #[test]
    fn alch_flags_and_effects() {
        let weight = 0.5f32.to_le_bytes();
        let mut enit = Vec::new();
        enit.extend_from_slice(&25i32.to_le_bytes());
        enit.extend_from_slice(&super::FLAG_MEDICINE.to_le_bytes());
        let efid_a = 0x0010_0001u32.to_le_bytes();
        let efit_a = efit(30.0, 0, 10);
        let efid_b = 0x0010_0002u32.to_le_bytes();
        let efit_b = efit(5.0, 0, 0);

        let event = event(
            RecordType::ALCH,
            &[
                (b"DATA", &weight),
                (b"ENIT", &enit),
                (b"EFID", &efid_a),
                (b"EFIT", &efit_a),
                (b"EFID", &efid_b),
                (b"EFIT", &efit_b),
            ],
        );
        let decoded = decode_event(&event, None);

        let get = |name: &str| {
            decoded
                .fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.value.clone())
        };
        assert_eq!(get("weight"), Some(FieldValue::Float(0.5)));
        assert_eq!(get("value"), Some(FieldValue::Int(25)));
        assert_eq!(get("is_medicine"), Some(FieldValue::Bool(true)));
        assert_eq!(get("is_food"), Some(FieldValue::Bool(false)));
        assert_eq!(get("effect_0_magnitude"), Some(FieldValue::Float(30.0)));
        assert_eq!(get("effect_0_duration"), Some(FieldValue::Int(10)));
        assert_eq!(get("effect_1_magnitude"), Some(FieldValue::Float(5.0)));
        assert_eq!(
            get("effect_1_form_id").map(|v| v.to_string()),
            Some("0x00100002".to_string())
        );
    }

    #[test]
    fn flor_harvest_ingredient() {
        let pfig = 0x0003_0b0bu32.to_le_bytes();
        let event = event(RecordType::FLOR, &[(b"PFIG", &pfig)]);
        let decoded = decode_event(&event, None);
        assert_eq!(
            decoded.fields[0].value.to_string(),
            "0x00030B0B".to_string()
        );
    }
}
