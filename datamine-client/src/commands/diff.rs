//! `fo76dm diff`: structured diff between two snapshots

use anyhow::{Context, bail};
use std::path::PathBuf;
use tracing::info;

use snapshot_store::{RecordType, SnapshotStore, diff_snapshots, save_diff};

use crate::config_manager::Config;
use crate::output::{render_diff_text, write_output};
use crate::{AppContext, DiffFormat};

#[allow(clippy::too_many_arguments)]
pub fn handle(
    ctx: &AppContext,
    latest: bool,
    old: Option<i64>,
    new: Option<i64>,
    vs: Option<String>,
    other_esm: Option<PathBuf>,
    type_filter: Option<String>,
    format: DiffFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let type_filter = parse_type_filter(type_filter.as_deref())?;
    let mut store = ctx.open_store()?;

    // The comparison target lives in another database when --vs or
    // --other-esm is given; otherwise both sides come from this store.
    let other_store = match (&vs, &other_esm) {
        (Some(profile_name), _) => {
            let config = Config::load()?;
            let profile = config.profile(profile_name)?;
            Some(match &profile.db_path {
                Some(path) => SnapshotStore::open(path)?,
                None => SnapshotStore::open_for_esm(&profile.esm_path)?,
            })
        }
        (None, Some(esm)) => Some(SnapshotStore::open_for_esm(esm)?),
        (None, None) => None,
    };

    let report = match &other_store {
        Some(other) => {
            let old_id = match old {
                Some(id) => id,
                None => latest_id(&store).context("no snapshots in this store")?,
            };
            let new_id = match new {
                Some(id) => id,
                None => latest_id(other).context("no snapshots in the other store")?,
            };
            diff_snapshots(&store, old_id, other, new_id, type_filter)?
        }
        None => {
            let (old_id, new_id) = if latest || (old.is_none() && new.is_none()) {
                let Some((older, newer)) = store.latest_two()? else {
                    bail!("need at least two snapshots to diff (have {})",
                          store.list_snapshots()?.len());
                };
                (older.id, newer.id)
            } else {
                match (old, new) {
                    (Some(old_id), Some(new_id)) => (old_id, new_id),
                    _ => bail!("--old and --new must be given together"),
                }
            };
            diff_snapshots(&store, old_id, &store, new_id, type_filter)?
        }
    };

    let diff_id = save_diff(&mut store, &report)?;
    info!(diff_id, "diff saved");

    let rendered = match format {
        DiffFormat::Text => render_diff_text(&report),
        DiffFormat::Json => format!("{:#}\n", report.to_json()),
    };
    write_output(output.as_deref(), &rendered)?;
    Ok(())
}

fn latest_id(store: &SnapshotStore) -> Option<i64> {
    store.latest().ok().flatten().map(|meta| meta.id)
}

pub(crate) fn parse_type_filter(filter: Option<&str>) -> anyhow::Result<Option<RecordType>> {
    match filter {
        None => Ok(None),
        Some(s) => RecordType::parse(s)
            .map(Some)
            .with_context(|| format!("'{s}' is not a 4-character record type")),
    }
}
