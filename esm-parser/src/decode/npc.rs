//! NPC_ decoder

use super::{DecodedField, find};
use crate::cursor::Cursor;
use crate::record::Subrecord;
use crate::types::{FormId, RecordType};

const ACBS: RecordType = RecordType(*b"ACBS");
const RNAM: RecordType = RecordType(*b"RNAM");

const FLAG_ESSENTIAL: u32 = 0x0000_0002;
const FLAG_UNIQUE: u32 = 0x0000_0020;
const FLAG_PROTECTED: u32 = 0x0000_0800;

pub(super) fn decode(subs: &[Subrecord<'_>], out: &mut Vec<DecodedField>) {
    if let Some(sub) = find(subs, ACBS) {
        let _ = acbs_fields(sub.data, out);
    }
    if let Some(sub) = find(subs, RNAM) {
        let mut cur = Cursor::new(sub.data);
        if let Ok(race) = cur.read_u32() {
            out.push(DecodedField::form_ref("race_form_id", FormId(race)));
        }
    }
}

fn acbs_fields(data: &[u8], out: &mut Vec<DecodedField>) -> Option<()> {
    let mut cur = Cursor::new(data);
    let flags = cur.read_u32().ok()?;
    out.push(DecodedField::int("flags", i64::from(flags)));
    out.push(DecodedField::boolean("essential", flags & FLAG_ESSENTIAL != 0));
    out.push(DecodedField::boolean("unique", flags & FLAG_UNIQUE != 0));
    out.push(DecodedField::boolean("protected", flags & FLAG_PROTECTED != 0));
    out.push(DecodedField::int("level", cur.read_i16().ok()?));
    out.push(DecodedField::int("health_offset", cur.read_i16().ok()?));
    out.push(DecodedField::int("magicka_offset", cur.read_i16().ok()?));
    out.push(DecodedField::int("stamina_offset", cur.read_i16().ok()?));
    Some(())
}

#[cfg(test)]
mod tests {
    use super::super::testutil::event;
    use super::super::{FieldValue, decode_event};
    use crate::types::RecordType;
    use pretty_assertions::assert_eq;

    pub(crate) fn acbs(flags: u32, level: i16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&level.to_le_bytes());
        out.extend_from_slice(&50i16.to_le_bytes()); // health offset
        out.extend_from_slice(&0i16.to_le_bytes()); // magicka offset
        out.extend_from_slice(&25i16.to_le_bytes()); // stamina offset
        out
    }

    #[test]
    fn acbs_stats_and_flag_bits() {
        let payload = acbs(super::FLAG_ESSENTIAL | super::FLAG_UNIQUE, 10);
        let rnam = 0x0002_aaaau32.to_le_bytes();
        let event = event(RecordType::NPC_, &[(b"ACBS", &payload), (b"RNAM", &rnam)]);
        let decoded = decode_event(&event, None);

        let get = |name: &str| {
            decoded
                .fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.value.clone())
        };
        assert_eq!(get("level"), Some(FieldValue::Int(10)));
        assert_eq!(get("health_offset"), Some(FieldValue::Int(50)));
        assert_eq!(get("essential"), Some(FieldValue::Bool(true)));
        assert_eq!(get("unique"), Some(FieldValue::Bool(true)));
        assert_eq!(get("protected"), Some(FieldValue::Bool(false)));
        assert_eq!(
            get("race_form_id").map(|v| v.to_string()),
            Some("0x0002AAAA".to_string())
        );
    }

    #[test]
    fn short_acbs_keeps_flag_fields() {
        // Flags only; the stat block is missing.
        let payload = 0u32.to_le_bytes();
        let event = event(RecordType::NPC_, &[(b"ACBS", &payload)]);
        let decoded = decode_event(&event, None);
        assert!(decoded.fields.iter().any(|f| f.name == "essential"));
        assert!(!decoded.fields.iter().any(|f| f.name == "level"));
    }
}
