//! `fo76dm search` / `show` / `strings search`

use anyhow::{Context, bail};

use esm_parser::FormId;
use snapshot_store::{find, get, load_subrecords, strings_search};

use crate::AppContext;
use crate::commands::diff::parse_type_filter;
use crate::output::{new_table, record_header_table, summaries_table};

pub fn search(
    ctx: &AppContext,
    query: &str,
    type_filter: Option<String>,
    edid_glob: Option<String>,
) -> anyhow::Result<()> {
    let type_filter = parse_type_filter(type_filter.as_deref())?;
    let store = ctx.open_store()?;
    let snapshot = store
        .latest()?
        .context("no snapshots yet; run `fo76dm snapshot` first")?;

    let mut hits = find(
        &store,
        snapshot.id,
        query,
        type_filter,
        edid_glob.as_deref(),
    )?;
    hits.sort_by_key(|s| s.form_id);

    if hits.is_empty() {
        println!("no matches");
        return Ok(());
    }
    println!("{}", summaries_table(&hits));
    println!("{} match(es) in snapshot {}", hits.len(), snapshot.id);
    Ok(())
}

pub fn show(ctx: &AppContext, form_id: &str, expand: bool) -> anyhow::Result<()> {
    let form_id = FormId::parse(form_id)
        .with_context(|| format!("'{form_id}' is not a FormID (use 0x hex or decimal)"))?;
    let store = ctx.open_store()?;
    let snapshot = store
        .latest()?
        .context("no snapshots yet; run `fo76dm snapshot` first")?;

    let Some((record, fields)) = get(&store, snapshot.id, form_id)? else {
        bail!("record {form_id} not found in snapshot {}", snapshot.id);
    };

    println!("{}", record_header_table(&record));

    if fields.is_empty() {
        println!("(no decoded fields)");
    } else {
        let mut table = new_table(&["field", "kind", "value"]);
        for field in &fields {
            table.add_row(vec![
                field.name.clone(),
                field.value.kind().to_string(),
                field.value.to_string(),
            ]);
        }
        println!("{table}");
    }

    if expand {
        let subrecords = load_subrecords(&store, snapshot.id, form_id)?;
        if subrecords.is_empty() {
            println!("(no raw subrecords; snapshot was not taken with --full-fidelity)");
        } else {
            let mut table = new_table(&["tag", "bytes", "data"]);
            for (tag, data) in &subrecords {
                table.add_row(vec![
                    tag.clone(),
                    data.len().to_string(),
                    hex::encode(data),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

pub fn strings(ctx: &AppContext, substring: &str) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let snapshot = store
        .latest()?
        .context("no snapshots yet; run `fo76dm snapshot` first")?;

    let hits = strings_search(&store, snapshot.id, substring)?;
    if hits.is_empty() {
        println!("no matches");
        return Ok(());
    }
    let mut table = new_table(&["string id", "text"]);
    for (id, text) in &hits {
        table.add_row(vec![id.to_string(), text.clone()]);
    }
    println!("{table}");
    Ok(())
}
