//! Table and text rendering helpers

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use std::fs;
use std::path::Path;

use snapshot_store::{
    DiffReport, FieldChange, RecordSummary, SnapshotMeta, StoredRecord,
};

pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.to_vec());
    table
}

pub fn snapshots_table(snapshots: &[SnapshotMeta]) -> Table {
    let mut table = new_table(&["id", "label", "created", "records", "strings", "esm sha256"]);
    for meta in snapshots {
        table.add_row(vec![
            meta.id.to_string(),
            meta.label.clone(),
            meta.created_at.clone(),
            meta.record_count.to_string(),
            meta.string_count.to_string(),
            short_hash(&meta.esm_sha256),
        ]);
    }
    table
}

pub fn summaries_table(records: &[RecordSummary]) -> Table {
    let mut table = new_table(&["form id", "type", "editor id", "name", "hash"]);
    for record in records {
        table.add_row(vec![
            record.form_id.to_string(),
            record.record_type.as_str(),
            record.editor_id.clone().unwrap_or_default(),
            record.full_name.clone().unwrap_or_default(),
            short_hash(&record.data_hash),
        ]);
    }
    table
}

pub fn record_header_table(record: &StoredRecord) -> Table {
    let mut table = new_table(&["attribute", "value"]);
    table.add_row(vec!["form id".to_string(), record.form_id.to_string()]);
    table.add_row(vec!["type".to_string(), record.record_type.as_str()]);
    table.add_row(vec![
        "editor id".to_string(),
        record.editor_id.clone().unwrap_or_default(),
    ]);
    table.add_row(vec![
        "name".to_string(),
        record.full_name.clone().unwrap_or_default(),
    ]);
    table.add_row(vec!["flags".to_string(), format!("0x{:08X}", record.flags)]);
    table.add_row(vec!["data hash".to_string(), short_hash(&record.data_hash)]);
    table
}

/// Hashes are stored full-length; sixteen characters is plenty on screen.
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(16).collect()
}

pub fn render_diff_text(report: &DiffReport) -> String {
    let mut out = String::new();
    let header = format!(
        "diff: snapshot {} -> {}{}\n",
        report.old_snapshot.id,
        report.new_snapshot.id,
        report
            .type_filter
            .map(|t| format!(" (type {t})"))
            .unwrap_or_default(),
    );
    out.push_str(&header);

    if report.identical_esm {
        out.push_str("both snapshots hash the same master file; nothing to compare\n");
        return out;
    }

    out.push_str(&format!(
        "added {}, removed {}, modified {}\n",
        report.added.len(),
        report.removed.len(),
        report.modified.len()
    ));

    for summary in &report.added {
        out.push_str(&format!(
            "+ {} {} {}\n",
            summary.form_id,
            summary.record_type,
            summary.editor_id.as_deref().unwrap_or("-")
        ));
    }
    for summary in &report.removed {
        out.push_str(&format!(
            "- {} {} {}\n",
            summary.form_id,
            summary.record_type,
            summary.editor_id.as_deref().unwrap_or("-")
        ));
    }
    for record in &report.modified {
        out.push_str(&format!(
            "~ {} {} {}\n",
            record.form_id,
            record.record_type,
            record.editor_id.as_deref().unwrap_or("-")
        ));
        for delta in &record.fields {
            match &delta.change {
                FieldChange::Added(new) => {
                    out.push_str(&format!("    {} (added) = {new}\n", delta.name));
                }
                FieldChange::Removed(old) => {
                    out.push_str(&format!("    {} (removed) was {old}\n", delta.name));
                }
                FieldChange::Changed { old, new } => {
                    out.push_str(&format!("    {}: {old} -> {new}\n", delta.name));
                }
            }
        }
    }
    out
}

/// Write to a file, or stdout when no path is given.
pub fn write_output(path: Option<&Path>, content: &str) -> std::io::Result<()> {
    match path {
        Some(path) => fs::write(path, content),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
