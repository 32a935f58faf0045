//! `fo76dm snapshot`: parse the master file and commit one snapshot

use anyhow::Context;
use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use ba2::Ba2Archive;
use esm_parser::{
    DecodedRecord, EsmFile, ParseOptions, StringTable, decode_event, decode_event_full_fidelity,
};

use crate::AppContext;

/// Records per store round-trip. Keeps memory flat over a ~478k-record
/// master without chatty single-row inserts.
const BATCH_SIZE: usize = 2048;

pub fn handle(ctx: &AppContext, label: Option<String>, full_fidelity: bool) -> anyhow::Result<()> {
    let esm = EsmFile::open(&ctx.esm_path)
        .with_context(|| format!("opening master file {}", ctx.esm_path.display()))?;
    info!(esm_sha256 = esm.sha256(), "master file opened");

    let strings = load_strings(ctx);

    let mut store = ctx.open_store()?;
    let label = label.unwrap_or_else(|| Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string());
    let mut pending = store.begin_snapshot(&label, esm.sha256())?;

    let options = ParseOptions::default().with_cancel(ctx.cancel.clone());
    let mut batch: Vec<DecodedRecord> = Vec::with_capacity(BATCH_SIZE);
    let mut parsed = 0u64;
    let mut skipped = 0u64;

    for result in esm.records_with(options) {
        match result {
            Ok(event) => {
                let decoded = if full_fidelity {
                    decode_event_full_fidelity(&event, strings.as_ref())
                } else {
                    decode_event(&event, strings.as_ref())
                };
                batch.push(decoded);
                parsed += 1;
                if batch.len() >= BATCH_SIZE {
                    pending.insert_records(&batch)?;
                    batch.clear();
                }
            }
            Err(esm_parser::Error::Cancelled) => {
                // Dropping the pending snapshot rolls the transaction back.
                drop(pending);
                return Err(esm_parser::Error::Cancelled.into());
            }
            Err(e) => {
                // Record-level failures are recoverable: log and move on.
                warn!("skipping record: {e}");
                skipped += 1;
            }
        }
    }
    if !batch.is_empty() {
        pending.insert_records(&batch)?;
    }

    if let Some(strings) = &strings {
        pending.insert_strings(strings.iter())?;
    }

    let id = pending.commit()?;
    println!(
        "snapshot {id} committed: {parsed} records ({skipped} skipped), esm {}",
        crate::output::short_hash(esm.sha256())
    );
    Ok(())
}

/// Load the localized string table, when a localization archive can be
/// found. A missing archive is not an error: names stay numeric.
fn load_strings(ctx: &AppContext) -> Option<StringTable> {
    let path = ctx
        .strings_ba2
        .clone()
        .or_else(|| find_localization_ba2(&ctx.esm_path))?;

    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) => {
            warn!("cannot open localization archive {}: {e}", path.display());
            return None;
        }
    };
    let mut archive = match Ba2Archive::open(file) {
        Ok(a) => a,
        Err(e) => {
            warn!("cannot parse localization archive {}: {e}", path.display());
            return None;
        }
    };
    match StringTable::load_from_ba2(&mut archive, &ctx.language) {
        Ok(table) if table.is_empty() => {
            warn!("no {} string tables in {}", ctx.language, path.display());
            None
        }
        Ok(table) => {
            info!(strings = table.len(), "loaded string table");
            Some(table)
        }
        Err(e) => {
            warn!("failed to load string tables: {e}");
            None
        }
    }
}

/// Look for a sibling `* - Localization.ba2` next to the master file.
fn find_localization_ba2(esm_path: &Path) -> Option<PathBuf> {
    let dir = esm_path.parent()?;
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.to_ascii_lowercase().ends_with(" - localization.ba2"))
        })
}
