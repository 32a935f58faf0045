//! `fo76dm list` / `purge` / `clear` / `stats`

use anyhow::Context;
use std::io::{BufRead, Write};

use crate::AppContext;
use crate::output::{new_table, snapshots_table};

pub fn list(ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let snapshots = store.list_snapshots()?;
    if snapshots.is_empty() {
        println!("no snapshots yet; run `fo76dm snapshot` first");
        return Ok(());
    }
    println!("{}", snapshots_table(&snapshots));
    Ok(())
}

pub fn purge(ctx: &AppContext, keep: usize) -> anyhow::Result<()> {
    let mut store = ctx.open_store()?;
    let removed = store.purge(keep)?;
    println!("purged {removed} snapshot(s), kept the newest {keep}");
    Ok(())
}

pub fn clear(ctx: &AppContext, yes: bool) -> anyhow::Result<()> {
    if !yes && !confirm("delete every snapshot?")? {
        println!("aborted");
        return Ok(());
    }
    let mut store = ctx.open_store()?;
    store.clear_all()?;
    println!("store cleared");
    Ok(())
}

pub fn stats(ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let snapshot = store
        .latest()?
        .context("no snapshots yet; run `fo76dm snapshot` first")?;

    let counts = store.type_counts(snapshot.id)?;
    let mut table = new_table(&["type", "records"]);
    let mut total = 0u64;
    for (record_type, count) in &counts {
        table.add_row(vec![record_type.clone(), count.to_string()]);
        total += count;
    }
    println!("{table}");
    println!(
        "{total} record(s) across {} type(s) in snapshot {} ({})",
        counts.len(),
        snapshot.id,
        snapshot.label
    );
    Ok(())
}

fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
