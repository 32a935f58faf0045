//! Query surface: patterns, form ids, string search

use pretty_assertions::assert_eq;
use snapshot_store::{
    DecodedField, DecodedRecord, FieldValue, FormId, RecordType, SnapshotStore, find, get,
    iter_type, strings_search,
};

fn record(
    form_id: u32,
    record_type: RecordType,
    edid: &str,
    full_name: Option<&str>,
) -> DecodedRecord {
    DecodedRecord {
        record_type,
        form_id: FormId(form_id),
        flags: 0,
        revision: 0,
        version: 208,
        editor_id: Some(edid.to_string()),
        full_name: full_name.map(String::from),
        data_hash: format!("hash-{form_id:x}"),
        fields: vec![DecodedField::int("value", 1)],
        subrecords: None,
    }
}

fn seed() -> (SnapshotStore, i64) {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let mut pending = store.begin_snapshot("s", "esm-hash").unwrap();
    pending
        .insert_records(&[
            record(0x100, RecordType::WEAP, "Weap10mmPistol", Some("10mm Pistol")),
            record(0x200, RecordType::WEAP, "WeapLaserRifle", Some("Laser Rifle")),
            record(0x300, RecordType::MISC, "MiscTinCan", Some("Tin Can")),
        ])
        .unwrap();
    pending
        .insert_strings([(1u32, "Radroach"), (2, "Mole Rat"), (3, "Deathclaw")].into_iter())
        .unwrap();
    let id = pending.commit().unwrap();
    (store, id)
}

#[test]
fn find_by_hex_form_id() {
    let (store, id) = seed();
    let hits = find(&store, id, "0x100", None, None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].editor_id.as_deref(), Some("Weap10mmPistol"));
}

#[test]
fn find_by_decimal_form_id() {
    let (store, id) = seed();
    let hits = find(&store, id, "768", None, None).unwrap(); // 0x300
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].form_id, FormId(0x300));
}

#[test]
fn find_by_substring_is_case_insensitive() {
    let (store, id) = seed();
    let hits = find(&store, id, "laser", None, None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].form_id, FormId(0x200));
}

#[test]
fn find_matches_full_name_too() {
    let (store, id) = seed();
    let hits = find(&store, id, "tin can", None, None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].form_id, FormId(0x300));
}

#[test]
fn find_with_glob() {
    let (store, id) = seed();
    let hits = find(&store, id, "Weap*", None, None).unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn find_with_type_filter() {
    let (store, id) = seed();
    let hits = find(&store, id, "*i*", Some(RecordType::MISC), None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record_type, RecordType::MISC);
}

#[test]
fn find_with_edid_glob_filter() {
    let (store, id) = seed();
    let hits = find(&store, id, "*", None, Some("Weap10mm*")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].form_id, FormId(0x100));
}

#[test]
fn get_returns_record_and_fields() {
    let (store, id) = seed();
    let (stored, fields) = get(&store, id, FormId(0x100)).unwrap().unwrap();
    assert_eq!(stored.record_type, RecordType::WEAP);
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].value, FieldValue::Int(1));
}

#[test]
fn get_missing_record_is_none() {
    let (store, id) = seed();
    assert!(get(&store, id, FormId(0xdead)).unwrap().is_none());
}

#[test]
fn iter_type_is_form_id_ordered() {
    let (store, id) = seed();
    let weapons = iter_type(&store, id, RecordType::WEAP).unwrap();
    let ids: Vec<u32> = weapons.iter().map(|r| r.form_id.0).collect();
    assert_eq!(ids, vec![0x100, 0x200]);
}

#[test]
fn strings_search_substring() {
    let (store, id) = seed();
    let hits = strings_search(&store, id, "rat").unwrap();
    assert_eq!(hits, vec![(2, "Mole Rat".to_string())]);

    let all = strings_search(&store, id, "a").unwrap();
    assert_eq!(all.len(), 3);
}
