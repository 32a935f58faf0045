//! ARMO decoder

use super::{DecodedField, find};
use crate::cursor::Cursor;
use crate::record::Subrecord;
use crate::types::RecordType;

const DATA: RecordType = RecordType(*b"DATA");
const DNAM: RecordType = RecordType(*b"DNAM");
const BOD2: RecordType = RecordType(*b"BOD2");

pub(super) fn decode(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, DATA) {
        let _ = data_fields(sub.data, out);
    }
    if let Some(sub) = find(subs, DNAM) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(rating) = cur.read_i32() {
            out.push(DecodedField::int("armor_rating", rating));
        }
    }
    if let Some(sub) = find(subs, BOD2) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(slots) = cur.read_u32() {
            out.push(DecodedField::int("biped_slots", i64::from(slots)));
        }
    }
}

fn data_fields(data: &[u8], out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    out.push(DecodedField::int("value", cur.read_i32().ok()?));
    out.push(DecodedField::float("weight", cur.read_f32().ok()?));
    out.push(DecodedField::int("health", cur.read_i32().ok()?));
    Some(())
}

#[cfg(test)]
mod tests {
    use super::super::testutil::event;
    use super::super::{FieldValue, decode_event};
    use crate::types::RecordType;
    use pretty_assertions::assert_eq;

    #[test]
    fn armo_fields() {
        let mut data = Vec::new();
        data.extend_from_slice(&500i32.to_le_bytes());
        data.extend_from_slice(&12.0f32.to_le_bytes());
        data.extend_from_slice(&300i32.to_le_bytes());
        let dnam = 42i32.to_le_bytes();
        let bod2 = 0x0000_0801u32.to_le_bytes();

        let event = event(
            RecordType::ARMO,
            &[(b"DATA", &data), (b"DNAM", &dnam), (b"BOD2", &bod2)],
        );
        let decoded = decode_event(&event, None);

        let get = |name: &str| {
            decoded
                .fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.value.clone())
        };
        assert_eq!(get("value"), Some(FieldValue::Int(500)));
        assert_eq!(get("weight"), Some(FieldValue::Float(12.0)));
        assert_eq!(get("health"), Some(FieldValue::Int(300)));
        assert_eq!(get("armor_rating"), Some(FieldValue::Int(42)));
        assert_eq!(get("biped_slots"), Some(FieldValue::Int(0x801)));
    }

    #[test]
    fn missing_subrecords_yield_no_fields() {
        let event = event(RecordType::ARMO, &[(b"EDID", b"VaultSuit\0")]);
        let decoded = decode_event(&event, None);
        assert!(!decoded.fields.iter().any(|f| f.name == "value"));
    }
}
