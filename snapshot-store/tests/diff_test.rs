//! Diff engine: set-level and field-level deltas, cross-store diffs

use pretty_assertions::assert_eq;
use snapshot_store::{
    DecodedField, DecodedRecord, FieldChange, FieldValue, FormId, RecordType, SnapshotStore,
    diff_snapshots, save_diff,
};

fn weapon(form_id: u32, damage: f32, hash: &str) -> DecodedRecord {
    DecodedRecord {
        record_type: RecordType::WEAP,
        form_id: FormId(form_id),
        flags: 0,
        revision: 0,
        version: 208,
        editor_id: Some(format!("Weap{form_id:08X}")),
        full_name: None,
        data_hash: hash.to_string(),
        fields: vec![
            DecodedField::float("damage", damage),
            DecodedField::float("speed", 1.0),
        ],
        subrecords: None,
    }
}

fn commit(store: &mut SnapshotStore, esm_hash: &str, records: &[DecodedRecord]) -> i64 {
    let mut pending = store.begin_snapshot("test", esm_hash).unwrap();
    pending.insert_records(records).unwrap();
    pending.commit().unwrap()
}

#[test]
fn damage_buff_shows_as_field_change() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let old = commit(&mut store, "esm-v1", &[weapon(0x100, 50.0, "h-old")]);
    let new = commit(&mut store, "esm-v2", &[weapon(0x100, 65.0, "h-new")]);

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    assert!(report.added.is_empty());
    assert!(report.removed.is_empty());
    assert_eq!(report.modified.len(), 1);

    let modified = &report.modified[0];
    assert_eq!(modified.form_id, FormId(0x100));
    assert_eq!(modified.record_type, RecordType::WEAP);
    assert_eq!(modified.fields.len(), 1);
    assert_eq!(modified.fields[0].name, "damage");
    assert_eq!(
        modified.fields[0].change,
        FieldChange::Changed {
            old: FieldValue::Float(50.0),
            new: FieldValue::Float(65.0),
        }
    );
}

#[test]
fn new_item_lands_only_in_added() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let old = commit(&mut store, "esm-v1", &[weapon(0x100, 50.0, "h1")]);
    let new = commit(
        &mut store,
        "esm-v2",
        &[weapon(0x100, 50.0, "h1"), weapon(0x006a_1f00, 30.0, "h2")],
    );

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    assert_eq!(report.added.len(), 1);
    assert_eq!(report.added[0].form_id, FormId(0x006a_1f00));
    assert!(report.removed.is_empty());
    assert!(report.modified.is_empty());
}

#[test]
fn removed_item_lands_only_in_removed() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let old = commit(
        &mut store,
        "esm-v1",
        &[weapon(0x100, 50.0, "h1"), weapon(0x200, 10.0, "h2")],
    );
    let new = commit(&mut store, "esm-v2", &[weapon(0x100, 50.0, "h1")]);

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.removed[0].form_id, FormId(0x200));
    assert!(report.added.is_empty());
    assert!(report.modified.is_empty());
}

#[test]
fn equal_data_hash_skips_field_comparison() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    // Same hash but different stored fields: the hash wins, the record
    // is treated as identical.
    let mut changed = weapon(0x100, 99.0, "same");
    changed.fields[0] = DecodedField::float("damage", 99.0);
    let old = commit(&mut store, "esm-v1", &[weapon(0x100, 50.0, "same")]);
    let new = commit(&mut store, "esm-v2", &[changed]);

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    assert!(report.modified.is_empty());
}

#[test]
fn same_esm_hash_short_circuits() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let old = commit(&mut store, "same-esm", &[weapon(0x100, 50.0, "h1")]);
    let new = commit(&mut store, "same-esm", &[weapon(0x100, 65.0, "h2")]);

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    assert!(report.identical_esm);
    assert!(report.is_empty());
}

#[test]
fn diff_against_self_is_empty() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let id = commit(&mut store, "esm-v1", &[weapon(0x100, 50.0, "h1")]);
    let report = diff_snapshots(&store, id, &store, id, None).unwrap();
    assert!(report.is_empty());
}

#[test]
fn cross_database_diff() {
    let mut live = SnapshotStore::open_in_memory().unwrap();
    let mut pts = SnapshotStore::open_in_memory().unwrap();
    let old = commit(&mut live, "esm-live", &[weapon(0x100, 50.0, "h1")]);
    let new = commit(&mut pts, "esm-pts", &[weapon(0x100, 65.0, "h2")]);

    let report = diff_snapshots(&live, old, &pts, new, None).unwrap();
    assert_eq!(report.modified.len(), 1);
    assert_eq!(report.modified[0].fields[0].name, "damage");
}

#[test]
fn added_and_removed_fields_are_reported() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let mut old_record = weapon(0x100, 50.0, "h1");
    old_record.fields.push(DecodedField::int("legacy", 1));
    let mut new_record = weapon(0x100, 50.0, "h2");
    new_record.fields.push(DecodedField::int("introduced", 2));

    let old = commit(&mut store, "esm-v1", &[old_record]);
    let new = commit(&mut store, "esm-v2", &[new_record]);

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    let fields = &report.modified[0].fields;
    assert_eq!(fields.len(), 2);
    assert!(matches!(
        fields.iter().find(|d| d.name == "legacy").unwrap().change,
        FieldChange::Removed(_)
    ));
    assert!(matches!(
        fields.iter().find(|d| d.name == "introduced").unwrap().change,
        FieldChange::Added(_)
    ));
}

#[test]
fn type_filter_limits_the_diff() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let misc = DecodedRecord {
        record_type: RecordType::MISC,
        form_id: FormId(0x900),
        flags: 0,
        revision: 0,
        version: 208,
        editor_id: None,
        full_name: None,
        data_hash: "m1".into(),
        fields: Vec::new(),
        subrecords: None,
    };
    let old = commit(&mut store, "esm-v1", &[weapon(0x100, 50.0, "h1")]);
    let new = commit(&mut store, "esm-v2", std::slice::from_ref(&misc));

    let report =
        diff_snapshots(&store, old, &store, new, Some(RecordType::MISC)).unwrap();
    assert_eq!(report.added.len(), 1);
    // The WEAP removal is outside the filter.
    assert!(report.removed.is_empty());
}

#[test]
fn buckets_are_sorted_by_form_id() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let old = commit(&mut store, "esm-v1", &[]);
    let new = commit(
        &mut store,
        "esm-v2",
        &[
            weapon(0x300, 1.0, "h3"),
            weapon(0x100, 1.0, "h1"),
            weapon(0x200, 1.0, "h2"),
        ],
    );

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    let ids: Vec<u32> = report.added.iter().map(|s| s.form_id.0).collect();
    assert_eq!(ids, vec![0x100, 0x200, 0x300]);
}

#[test]
fn float_zero_signs_compare_equal() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let mut old_record = weapon(0x100, 0.0, "h1");
    old_record.fields[0] = DecodedField::float("damage", 0.0);
    let mut new_record = weapon(0x100, -0.0, "h2");
    new_record.fields[0] = DecodedField::float("damage", -0.0);

    let old = commit(&mut store, "esm-v1", &[old_record]);
    let new = commit(&mut store, "esm-v2", &[new_record]);

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    // Hashes differ so fields are compared, but -0.0 == +0.0.
    assert!(report.modified[0].fields.is_empty());
}

#[test]
fn missing_snapshot_fails() {
    let store = SnapshotStore::open_in_memory().unwrap();
    assert!(matches!(
        diff_snapshots(&store, 1, &store, 2, None),
        Err(snapshot_store::Error::SnapshotNotFound(1))
    ));
}

#[test]
fn save_diff_persists_entries() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let old = commit(&mut store, "esm-v1", &[weapon(0x100, 50.0, "h1")]);
    let new = commit(
        &mut store,
        "esm-v2",
        &[weapon(0x100, 65.0, "h2"), weapon(0x200, 5.0, "h3")],
    );

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    let diff_id = save_diff(&mut store, &report).unwrap();
    assert!(diff_id > 0);
}

#[test]
fn json_rendering_contains_field_delta() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let old = commit(&mut store, "esm-v1", &[weapon(0x100, 50.0, "h1")]);
    let new = commit(&mut store, "esm-v2", &[weapon(0x100, 65.0, "h2")]);

    let report = diff_snapshots(&store, old, &store, new, None).unwrap();
    let json = report.to_json();
    let modified = json["modified"].as_array().unwrap();
    assert_eq!(modified[0]["form_id"], "0x00000100");
    assert_eq!(modified[0]["fields"][0]["name"], "damage");
    assert_eq!(modified[0]["fields"][0]["old"]["value"], "50");
    assert_eq!(modified[0]["fields"][0]["new"]["value"], "65");
}
