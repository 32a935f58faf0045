//! `fo76dm export`: bulk record dumps

use anyhow::Context;
use serde_json::json;
use std::io::Write;
use std::path::Path;

use crate::AppContext;
use crate::ExportFormat;
use crate::commands::diff::parse_type_filter;

pub fn handle(
    ctx: &AppContext,
    format: ExportFormat,
    type_filter: Option<String>,
    output: &Path,
) -> anyhow::Result<()> {
    let type_filter = parse_type_filter(type_filter.as_deref())?;
    let store = ctx.open_store()?;
    let snapshot = store
        .latest()?
        .context("no snapshots yet; run `fo76dm snapshot` first")?;

    let records = store.load_records(snapshot.id, type_filter)?;
    let mut file = std::fs::File::create(output)
        .with_context(|| format!("creating {}", output.display()))?;

    match format {
        ExportFormat::Json => {
            let mut rows = Vec::with_capacity(records.len());
            for record in &records {
                let fields = store.load_fields(snapshot.id, record.form_id)?;
                rows.push(json!({
                    "form_id": record.form_id.to_string(),
                    "type": record.record_type.as_str(),
                    "editor_id": record.editor_id,
                    "full_name": record.full_name,
                    "data_hash": record.data_hash,
                    "fields": fields.iter().map(|f| json!({
                        "name": f.name,
                        "kind": f.value.kind(),
                        "value": f.value.to_string(),
                    })).collect::<Vec<_>>(),
                }));
            }
            serde_json::to_writer_pretty(&mut file, &rows)?;
            file.write_all(b"\n")?;
        }
        ExportFormat::Csv => {
            writeln!(file, "form_id,type,editor_id,full_name,data_hash")?;
            for record in &records {
                writeln!(
                    file,
                    "{},{},{},{},{}",
                    record.form_id,
                    record.record_type.as_str(),
                    csv_escape(record.editor_id.as_deref().unwrap_or_default()),
                    csv_escape(record.full_name.as_deref().unwrap_or_default()),
                    record.data_hash,
                )?;
            }
        }
    }

    println!(
        "exported {} record(s) from snapshot {} to {}",
        records.len(),
        snapshot.id,
        output.display()
    );
    Ok(())
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
