//! Database schema and version gate

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Error, Result};

/// Version written to the `meta` table. Databases carrying a higher
/// version are rejected rather than misread.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS snapshots (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    label        TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    esm_sha256   TEXT NOT NULL,
    record_count INTEGER NOT NULL DEFAULT 0,
    string_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS records (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    form_id     INTEGER NOT NULL,
    record_type TEXT NOT NULL,
    flags       INTEGER NOT NULL,
    revision    INTEGER NOT NULL,
    version     INTEGER NOT NULL,
    editor_id   TEXT,
    full_name   TEXT,
    data_hash   TEXT NOT NULL,
    PRIMARY KEY (snapshot_id, form_id)
);
CREATE INDEX IF NOT EXISTS idx_records_type
    ON records(snapshot_id, record_type);
CREATE INDEX IF NOT EXISTS idx_records_editor_id
    ON records(snapshot_id, editor_id);

CREATE TABLE IF NOT EXISTS decoded_fields (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    form_id     INTEGER NOT NULL,
    seq         INTEGER NOT NULL,
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL,
    value       TEXT NOT NULL,
    PRIMARY KEY (snapshot_id, form_id, seq)
);

CREATE TABLE IF NOT EXISTS strings (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    string_id   INTEGER NOT NULL,
    text        TEXT NOT NULL,
    PRIMARY KEY (snapshot_id, string_id)
);

CREATE TABLE IF NOT EXISTS keywords (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    form_id     INTEGER NOT NULL,
    editor_id   TEXT,
    PRIMARY KEY (snapshot_id, form_id)
);

CREATE TABLE IF NOT EXISTS subrecords (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    form_id     INTEGER NOT NULL,
    seq         INTEGER NOT NULL,
    tag         TEXT NOT NULL,
    data        BLOB NOT NULL,
    PRIMARY KEY (snapshot_id, form_id, seq)
);

CREATE TABLE IF NOT EXISTS diffs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at      TEXT NOT NULL,
    old_snapshot_id INTEGER NOT NULL,
    new_snapshot_id INTEGER NOT NULL,
    type_filter     TEXT,
    added_count     INTEGER NOT NULL,
    removed_count   INTEGER NOT NULL,
    modified_count  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS diff_entries (
    diff_id     INTEGER NOT NULL REFERENCES diffs(id) ON DELETE CASCADE,
    form_id     INTEGER NOT NULL,
    record_type TEXT NOT NULL,
    change      TEXT NOT NULL,
    field_name  TEXT,
    old_value   TEXT,
    new_value   TEXT
);
";

/// Create missing tables and write/verify the schema version.
pub(crate) fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    match existing {
        None => {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                [SCHEMA_VERSION.to_string()],
            )?;
            debug!(version = SCHEMA_VERSION, "initialized store schema");
            Ok(())
        }
        Some(value) => {
            let found: u32 = value.parse().map_err(|_| Error::SchemaMismatch {
                found: u32::MAX,
                supported: SCHEMA_VERSION,
            })?;
            if found > SCHEMA_VERSION {
                return Err(Error::SchemaMismatch {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
            Ok(())
        }
    }
}
