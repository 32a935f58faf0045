//! Read-only lookups over committed snapshots.
//!
//! Queries accept a FormID (`0x`-prefixed or decimal), a case-insensitive
//! substring, or a glob with `*`/`?`; text patterns match against editor
//! ids and resolved display names.

use regex::RegexBuilder;
use rusqlite::params;
use tracing::debug;

use esm_parser::{DecodedField, FormId, RecordType};

use crate::error::Result;
use crate::store::SnapshotStore;
use crate::types::{RecordSummary, SnapshotId, StoredRecord};

/// Find records by FormID or by name pattern.
pub fn find(
    store: &SnapshotStore,
    snapshot: SnapshotId,
    query: &str,
    type_filter: Option<RecordType>,
    edid_glob: Option<&str>,
) -> Result<Vec<RecordSummary>> {
    let summaries = store.load_summaries(snapshot, type_filter)?;

    let edid_matcher = edid_glob.map(glob_regex).transpose()?;
    let keep_edid = |summary: &RecordSummary| {
        edid_matcher.as_ref().is_none_or(|re| {
            summary
                .editor_id
                .as_deref()
                .is_some_and(|edid| re.is_match(edid))
        })
    };

    if let Some(form_id) = FormId::parse(query) {
        debug!(%form_id, "form id lookup");
        return Ok(summaries
            .get(&form_id.0)
            .filter(|s| keep_edid(*s))
            .cloned()
            .into_iter()
            .collect());
    }

    let matcher = if query.contains('*') || query.contains('?') {
        glob_regex(query)?
    } else {
        substring_regex(query)?
    };

    Ok(summaries
        .into_values()
        .filter(|summary| {
            let hit = summary
                .editor_id
                .as_deref()
                .is_some_and(|edid| matcher.is_match(edid))
                || summary
                    .full_name
                    .as_deref()
                    .is_some_and(|name| matcher.is_match(name));
            hit && keep_edid(summary)
        })
        .collect())
}

/// One record with its decoded fields.
pub fn get(
    store: &SnapshotStore,
    snapshot: SnapshotId,
    form_id: FormId,
) -> Result<Option<(StoredRecord, Vec<DecodedField>)>> {
    let record = store
        .load_records(snapshot, None)?
        .into_iter()
        .find(|r| r.form_id == form_id);
    match record {
        None => Ok(None),
        Some(record) => {
            let fields = store.load_fields(snapshot, form_id)?;
            Ok(Some((record, fields)))
        }
    }
}

/// All records of one type, FormID-ordered.
pub fn iter_type(
    store: &SnapshotStore,
    snapshot: SnapshotId,
    record_type: RecordType,
) -> Result<Vec<StoredRecord>> {
    store.load_records(snapshot, Some(record_type))
}

/// Case-insensitive substring search over the persisted string table.
pub fn strings_search(
    store: &SnapshotStore,
    snapshot: SnapshotId,
    substring: &str,
) -> Result<Vec<(u32, String)>> {
    let needle = substring.to_lowercase();
    let mut stmt = store.conn().prepare_cached(
        "SELECT string_id, text FROM strings WHERE snapshot_id = ?1 ORDER BY string_id",
    )?;
    let rows = stmt.query_map([snapshot], |row| {
        Ok((row.get::<_, i64>(0)? as u32, row.get::<_, String>(1)?))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, text) = row?;
        if text.to_lowercase().contains(&needle) {
            out.push((id, text));
        }
    }
    Ok(out)
}

/// Raw subrecords of one record (only present for full-fidelity snapshots).
pub fn load_subrecords(
    store: &SnapshotStore,
    snapshot: SnapshotId,
    form_id: FormId,
) -> Result<Vec<(String, Vec<u8>)>> {
    let mut stmt = store.conn().prepare_cached(
        "SELECT tag, data FROM subrecords
         WHERE snapshot_id = ?1 AND form_id = ?2 ORDER BY seq",
    )?;
    let rows = stmt.query_map(params![snapshot, i64::from(form_id.0)], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn glob_regex(pattern: &str) -> Result<regex::Regex> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            c => expr.push_str(&regex::escape(&c.to_string())),
        }
    }
    expr.push('$');
    build_ci(&expr)
}

fn substring_regex(needle: &str) -> Result<regex::Regex> {
    build_ci(&regex::escape(needle))
}

fn build_ci(expr: &str) -> Result<regex::Regex> {
    RegexBuilder::new(expr)
        .case_insensitive(true)
        .build()
        .map_err(|e| crate::error::Error::StoreUnavailable(format!("bad pattern: {e}")))
}
