//! `fo76dm unreleased`: heuristic scan for content that looks unshipped.
//!
//! Pure convention matching over editor ids. Bethesda marks cut and
//! internal content with a handful of recurring prefixes and infixes;
//! anything the markers hit is worth a human look, nothing more.

use anyhow::Context;

use snapshot_store::RecordSummary;

use crate::AppContext;
use crate::output::summaries_table;

const MARKERS: &[&str] = &[
    "zzz",
    "cut_",
    "test",
    "debug",
    "unused",
    "deprecated",
    "donotuse",
    "placeholder",
    "_old",
];

pub fn handle(ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let snapshot = store
        .latest()?
        .context("no snapshots yet; run `fo76dm snapshot` first")?;

    let summaries = store.load_summaries(snapshot.id, None)?;
    let mut hits: Vec<RecordSummary> = summaries
        .into_values()
        .filter(|summary| {
            summary
                .editor_id
                .as_deref()
                .is_some_and(looks_unreleased)
        })
        .collect();
    hits.sort_by_key(|s| s.form_id);

    if hits.is_empty() {
        println!("no unreleased-looking records in snapshot {}", snapshot.id);
        return Ok(());
    }
    println!("{}", summaries_table(&hits));
    println!(
        "{} candidate(s) in snapshot {} (marker scan, expect false positives)",
        hits.len(),
        snapshot.id
    );
    Ok(())
}

fn looks_unreleased(editor_id: &str) -> bool {
    let lowered = editor_id.to_ascii_lowercase();
    MARKERS.iter().any(|marker| lowered.contains(marker))
}
