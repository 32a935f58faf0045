//! Field-level diff between two snapshots.
//!
//! Set-level changes are computed by FormID; records present on both
//! sides are compared by content hash first, and only hash mismatches
//! load decoded fields. Floats compare bit-exact (after NaN/zero
//! canonicalization); rendering-side rounding has no business here.

use chrono::Utc;
use rusqlite::params;
use serde_json::json;
use tracing::{debug, warn};

use esm_parser::{FieldValue, FormId, RecordType};

use crate::error::Result;
use crate::store::SnapshotStore;
use crate::types::{RecordSummary, SnapshotId, SnapshotMeta, encode_value};

/// One field's change within a modified record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Added(FieldValue),
    Removed(FieldValue),
    Changed { old: FieldValue, new: FieldValue },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDelta {
    pub name: String,
    pub change: FieldChange,
}

/// A record present on both sides with differing content.
#[derive(Debug, Clone)]
pub struct ModifiedRecord {
    pub form_id: FormId,
    pub record_type: RecordType,
    pub editor_id: Option<String>,
    pub fields: Vec<FieldDelta>,
}

/// Structured diff output. Buckets are sorted by FormID ascending.
#[derive(Debug, Clone)]
pub struct DiffReport {
    pub old_snapshot: SnapshotMeta,
    pub new_snapshot: SnapshotMeta,
    pub type_filter: Option<RecordType>,
    pub added: Vec<RecordSummary>,
    pub removed: Vec<RecordSummary>,
    pub modified: Vec<ModifiedRecord>,
    /// Set when both snapshots hash the same master file and the diff
    /// short-circuited to empty.
    pub identical_esm: bool,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// JSON rendering used by the CLI and exports.
    pub fn to_json(&self) -> serde_json::Value {
        let summary = |s: &RecordSummary| {
            json!({
                "form_id": s.form_id.to_string(),
                "type": s.record_type.as_str(),
                "editor_id": s.editor_id,
                "full_name": s.full_name,
            })
        };
        let value = |v: &FieldValue| {
            json!({ "kind": v.kind(), "value": v.to_string() })
        };
        json!({
            "old_snapshot": self.old_snapshot.id,
            "new_snapshot": self.new_snapshot.id,
            "type_filter": self.type_filter.map(|t| t.as_str()),
            "identical_esm": self.identical_esm,
            "added": self.added.iter().map(summary).collect::<Vec<_>>(),
            "removed": self.removed.iter().map(summary).collect::<Vec<_>>(),
            "modified": self.modified.iter().map(|m| {
                json!({
                    "form_id": m.form_id.to_string(),
                    "type": m.record_type.as_str(),
                    "editor_id": m.editor_id,
                    "fields": m.fields.iter().map(|d| match &d.change {
                        FieldChange::Added(new) => json!({
                            "name": d.name, "change": "added", "new": value(new),
                        }),
                        FieldChange::Removed(old) => json!({
                            "name": d.name, "change": "removed", "old": value(old),
                        }),
                        FieldChange::Changed { old, new } => json!({
                            "name": d.name, "change": "changed",
                            "old": value(old), "new": value(new),
                        }),
                    }).collect::<Vec<_>>(),
                })
            }).collect::<Vec<_>>(),
        })
    }
}

/// Compute the diff between two snapshots, possibly in different stores.
pub fn diff_snapshots(
    old_store: &SnapshotStore,
    old_id: SnapshotId,
    new_store: &SnapshotStore,
    new_id: SnapshotId,
    type_filter: Option<RecordType>,
) -> Result<DiffReport> {
    let old_meta = old_store.snapshot(old_id)?;
    let new_meta = new_store.snapshot(new_id)?;

    // Identical inputs cannot differ; skip the row scans entirely.
    if old_meta.esm_sha256 == new_meta.esm_sha256 {
        warn!(
            old = old_id,
            new = new_id,
            "snapshots hash the same master file, diff is empty"
        );
        return Ok(DiffReport {
            old_snapshot: old_meta,
            new_snapshot: new_meta,
            type_filter,
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
            identical_esm: true,
        });
    }

    let old = old_store.load_summaries(old_id, type_filter)?;
    let new = new_store.load_summaries(new_id, type_filter)?;
    debug!(old = old.len(), new = new.len(), "loaded diff summaries");

    // BTreeMap keys keep every bucket FormID-sorted for free.
    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut modified = Vec::new();

    for (form_id, summary) in &new {
        if !old.contains_key(form_id) {
            added.push(summary.clone());
        }
    }
    for (form_id, summary) in &old {
        if !new.contains_key(form_id) {
            removed.push(summary.clone());
        }
    }

    for (form_id, new_summary) in &new {
        let Some(old_summary) = old.get(form_id) else {
            continue;
        };
        if old_summary.data_hash == new_summary.data_hash {
            continue;
        }
        let old_fields = old_store.load_fields(old_id, FormId(*form_id))?;
        let new_fields = new_store.load_fields(new_id, FormId(*form_id))?;
        let fields = diff_fields(&old_fields, &new_fields);
        modified.push(ModifiedRecord {
            form_id: FormId(*form_id),
            record_type: new_summary.record_type,
            editor_id: new_summary.editor_id.clone(),
            fields,
        });
    }

    Ok(DiffReport {
        old_snapshot: old_meta,
        new_snapshot: new_meta,
        type_filter,
        added,
        removed,
        modified,
        identical_esm: false,
    })
}

/// Field deltas in stable order: old-side field order, then new-only
/// fields in new-side order.
fn diff_fields(
    old: &[esm_parser::DecodedField],
    new: &[esm_parser::DecodedField],
) -> Vec<FieldDelta> {
    let mut deltas = Vec::new();

    for old_field in old {
        match new.iter().find(|f| f.name == old_field.name) {
            None => deltas.push(FieldDelta {
                name: old_field.name.clone(),
                change: FieldChange::Removed(old_field.value.clone()),
            }),
            Some(new_field) => {
                if !old_field.value.diff_eq(&new_field.value) {
                    deltas.push(FieldDelta {
                        name: old_field.name.clone(),
                        change: FieldChange::Changed {
                            old: old_field.value.clone(),
                            new: new_field.value.clone(),
                        },
                    });
                }
            }
        }
    }

    for new_field in new {
        if !old.iter().any(|f| f.name == new_field.name) {
            deltas.push(FieldDelta {
                name: new_field.name.clone(),
                change: FieldChange::Added(new_field.value.clone()),
            });
        }
    }

    deltas
}

/// Persist a diff report into `diffs` / `diff_entries` of `store`.
pub fn save_diff(store: &mut SnapshotStore, report: &DiffReport) -> Result<i64> {
    let conn = store.conn();
    conn.execute(
        "INSERT INTO diffs
           (created_at, old_snapshot_id, new_snapshot_id, type_filter,
            added_count, removed_count, modified_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            Utc::now().to_rfc3339(),
            report.old_snapshot.id,
            report.new_snapshot.id,
            report.type_filter.map(|t| t.as_str()),
            report.added.len() as i64,
            report.removed.len() as i64,
            report.modified.len() as i64,
        ],
    )?;
    let diff_id = conn.last_insert_rowid();

    let mut insert = conn.prepare_cached(
        "INSERT INTO diff_entries
           (diff_id, form_id, record_type, change, field_name, old_value, new_value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for summary in &report.added {
        insert.execute(params![
            diff_id,
            i64::from(summary.form_id.0),
            summary.record_type.as_str(),
            "added",
            Option::<String>::None,
            Option::<String>::None,
            Option::<String>::None,
        ])?;
    }
    for summary in &report.removed {
        insert.execute(params![
            diff_id,
            i64::from(summary.form_id.0),
            summary.record_type.as_str(),
            "removed",
            Option::<String>::None,
            Option::<String>::None,
            Option::<String>::None,
        ])?;
    }
    for record in &report.modified {
        for delta in &record.fields {
            let (old_value, new_value) = match &delta.change {
                FieldChange::Added(new) => (None, Some(encode_value(new).1)),
                FieldChange::Removed(old) => (Some(encode_value(old).1), None),
                FieldChange::Changed { old, new } => {
                    (Some(encode_value(old).1), Some(encode_value(new).1))
                }
            };
            insert.execute(params![
                diff_id,
                i64::from(record.form_id.0),
                record.record_type.as_str(),
                "modified",
                delta.name,
                old_value,
                new_value,
            ])?;
        }
    }
    Ok(diff_id)
}
