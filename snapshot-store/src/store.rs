//! Snapshot store over SQLite

use chrono::Utc;
use rusqlite::{Connection, Transaction, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use esm_parser::{DecodedField, DecodedRecord, FormId, RecordType};

use crate::error::{Error, Result};
use crate::schema;
use crate::types::{
    RecordSummary, SnapshotId, SnapshotMeta, StoredRecord, decode_value, encode_value,
};

/// Subdirectory placed two levels above the master file; independent
/// masters therefore get independent databases.
const DB_SUBDIR: &str = "fo76dm";
const DB_FILE: &str = "snapshots.db";

/// Handle to one snapshot database.
///
/// The connection runs in WAL mode: one writer, concurrent readers.
/// Snapshots are immutable once committed; the only mutations are
/// [`purge`](Self::purge) and [`clear_all`](Self::clear_all).
#[derive(Debug)]
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", path.display())))?;
        Self::from_connection(conn)
    }

    /// Open the database derived from a master-file location.
    pub fn open_for_esm(esm_path: &Path) -> Result<Self> {
        Self::open(&Self::derive_db_path(esm_path))
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // journal_mode returns the resulting mode as a row, so it cannot
        // go through execute_batch.
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(%mode, "journal mode");
        conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")?;
        schema::init(&conn)?;
        Ok(Self { conn })
    }

    /// Database location for a master file: two directory levels up, in a
    /// fixed subdirectory.
    pub fn derive_db_path(esm_path: &Path) -> PathBuf {
        let base = esm_path
            .parent()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| esm_path.parent())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        base.join(DB_SUBDIR).join(DB_FILE)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a snapshot. Everything inserted through the returned handle
    /// is one transaction: dropping it without committing rolls back.
    pub fn begin_snapshot(
        &mut self,
        label: &str,
        esm_sha256: &str,
    ) -> Result<PendingSnapshot<'_>> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots (label, created_at, esm_sha256) VALUES (?1, ?2, ?3)",
            params![label, Utc::now().to_rfc3339(), esm_sha256],
        )?;
        let id = tx.last_insert_rowid();
        debug!(id, label, "snapshot started");
        Ok(PendingSnapshot {
            tx,
            id,
            record_count: 0,
            string_count: 0,
        })
    }

    pub fn list_snapshots(&self) -> Result<Vec<SnapshotMeta>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, label, created_at, esm_sha256, record_count, string_count
             FROM snapshots ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_meta)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn snapshot(&self, id: SnapshotId) -> Result<SnapshotMeta> {
        self.conn
            .query_row(
                "SELECT id, label, created_at, esm_sha256, record_count, string_count
                 FROM snapshots WHERE id = ?1",
                [id],
                row_to_meta,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Error::SnapshotNotFound(id),
                other => Error::Sqlite(other),
            })
    }

    /// Most recent snapshot, if any.
    pub fn latest(&self) -> Result<Option<SnapshotMeta>> {
        let mut list = self.list_snapshots()?;
        Ok(list.pop())
    }

    /// The two most recent snapshots as `(older, newer)`.
    pub fn latest_two(&self) -> Result<Option<(SnapshotMeta, SnapshotMeta)>> {
        let mut list = self.list_snapshots()?;
        let newer = list.pop();
        let older = list.pop();
        Ok(older.zip(newer))
    }

    /// `form_id -> summary` for one snapshot, optionally type-filtered.
    pub fn load_summaries(
        &self,
        id: SnapshotId,
        type_filter: Option<RecordType>,
    ) -> Result<std::collections::BTreeMap<u32, RecordSummary>> {
        self.snapshot(id)?;
        let mut out = std::collections::BTreeMap::new();
        let mut push = |summary: RecordSummary| {
            out.insert(summary.form_id.0, summary);
        };
        match type_filter {
            Some(t) => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT form_id, record_type, editor_id, full_name, data_hash
                     FROM records WHERE snapshot_id = ?1 AND record_type = ?2",
                )?;
                let rows = stmt.query_map(params![id, t.as_str()], row_to_summary)?;
                for row in rows {
                    push(row?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT form_id, record_type, editor_id, full_name, data_hash
                     FROM records WHERE snapshot_id = ?1",
                )?;
                let rows = stmt.query_map([id], row_to_summary)?;
                for row in rows {
                    push(row?);
                }
            }
        }
        Ok(out)
    }

    /// Full record rows for one snapshot, ordered by FormID.
    pub fn load_records(
        &self,
        id: SnapshotId,
        type_filter: Option<RecordType>,
    ) -> Result<Vec<StoredRecord>> {
        self.snapshot(id)?;
        let base = "SELECT snapshot_id, form_id, record_type, flags, revision, version,
                           editor_id, full_name, data_hash
                    FROM records WHERE snapshot_id = ?1";
        match type_filter {
            Some(t) => {
                let sql = format!("{base} AND record_type = ?2 ORDER BY form_id");
                let mut stmt = self.conn.prepare_cached(&sql)?;
                let rows = stmt.query_map(params![id, t.as_str()], row_to_record)?;
                Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
            }
            None => {
                let sql = format!("{base} ORDER BY form_id");
                let mut stmt = self.conn.prepare_cached(&sql)?;
                let rows = stmt.query_map([id], row_to_record)?;
                Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
            }
        }
    }

    /// Decoded fields of one record, in decode order.
    pub fn load_fields(&self, id: SnapshotId, form_id: FormId) -> Result<Vec<DecodedField>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT name, kind, value FROM decoded_fields
             WHERE snapshot_id = ?1 AND form_id = ?2 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![id, i64::from(form_id.0)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut fields = Vec::new();
        for row in rows {
            let (name, kind, value) = row?;
            fields.push(DecodedField::new(name, decode_value(&kind, &value)?));
        }
        Ok(fields)
    }

    /// Keyword records of one snapshot as `(form_id, editor_id)`.
    pub fn load_keywords(&self, id: SnapshotId) -> Result<Vec<(FormId, Option<String>)>> {
        self.snapshot(id)?;
        let mut stmt = self.conn.prepare_cached(
            "SELECT form_id, editor_id FROM keywords WHERE snapshot_id = ?1 ORDER BY form_id",
        )?;
        let rows = stmt.query_map([id], |row| {
            Ok((FormId(row.get::<_, i64>(0)? as u32), row.get(1)?))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Per-type record counts for one snapshot, descending.
    pub fn type_counts(&self, id: SnapshotId) -> Result<Vec<(String, u64)>> {
        self.snapshot(id)?;
        let mut stmt = self.conn.prepare(
            "SELECT record_type, COUNT(*) FROM records
             WHERE snapshot_id = ?1 GROUP BY record_type ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Delete all but the newest `keep_n` snapshots. Returns how many were
    /// removed; their rows cascade.
    pub fn purge(&mut self, keep_n: usize) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM snapshots WHERE id NOT IN
               (SELECT id FROM snapshots ORDER BY id DESC LIMIT ?1)",
            [keep_n as i64],
        )?;
        if removed > 0 {
            info!(removed, keep_n, "purged snapshots");
        }
        Ok(removed)
    }

    /// Drop every snapshot and saved diff.
    pub fn clear_all(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM snapshots", [])?;
        tx.execute("DELETE FROM diffs", [])?;
        tx.commit()?;
        self.conn.execute_batch("VACUUM;")?;
        info!("store cleared");
        Ok(())
    }
}

/// An uncommitted snapshot. All inserts land in one transaction;
/// dropping this without [`commit`](Self::commit) rolls everything back.
pub struct PendingSnapshot<'conn> {
    tx: Transaction<'conn>,
    id: SnapshotId,
    record_count: u64,
    string_count: u64,
}

impl PendingSnapshot<'_> {
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    /// Bulk-insert a batch of decoded records with their fields. Batching
    /// is the caller's choice; the store never requires the whole record
    /// set in memory.
    pub fn insert_records(&mut self, batch: &[DecodedRecord]) -> Result<()> {
        let mut insert_record = self.tx.prepare_cached(
            "INSERT INTO records
               (snapshot_id, form_id, record_type, flags, revision, version,
                editor_id, full_name, data_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        let mut insert_field = self.tx.prepare_cached(
            "INSERT INTO decoded_fields (snapshot_id, form_id, seq, name, kind, value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let mut insert_keyword = self.tx.prepare_cached(
            "INSERT INTO keywords (snapshot_id, form_id, editor_id) VALUES (?1, ?2, ?3)",
        )?;
        let mut insert_subrecord = self.tx.prepare_cached(
            "INSERT INTO subrecords (snapshot_id, form_id, seq, tag, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        for record in batch {
            let form_id = i64::from(record.form_id.0);
            insert_record.execute(params![
                self.id,
                form_id,
                record.record_type.as_str(),
                record.flags,
                record.revision,
                record.version,
                record.editor_id,
                record.full_name,
                record.data_hash,
            ])?;

            for (seq, field) in record.fields.iter().enumerate() {
                let (kind, value) = encode_value(&field.value);
                insert_field.execute(params![
                    self.id,
                    form_id,
                    seq as i64,
                    field.name,
                    kind,
                    value
                ])?;
            }

            if record.record_type == RecordType::KYWD {
                insert_keyword.execute(params![self.id, form_id, record.editor_id])?;
            }

            if let Some(subrecords) = &record.subrecords {
                for (seq, (tag, data)) in subrecords.iter().enumerate() {
                    insert_subrecord.execute(params![
                        self.id,
                        form_id,
                        seq as i64,
                        tag.as_str(),
                        data
                    ])?;
                }
            }

            self.record_count += 1;
        }
        Ok(())
    }

    /// Persist the string table used for this parse.
    pub fn insert_strings<'a>(
        &mut self,
        entries: impl Iterator<Item = (u32, &'a str)>,
    ) -> Result<()> {
        let mut insert = self.tx.prepare_cached(
            "INSERT OR REPLACE INTO strings (snapshot_id, string_id, text)
             VALUES (?1, ?2, ?3)",
        )?;
        for (string_id, text) in entries {
            insert.execute(params![self.id, i64::from(string_id), text])?;
            self.string_count += 1;
        }
        Ok(())
    }

    /// Finalize counts and commit atomically. Readers see the whole
    /// snapshot or none of it.
    pub fn commit(self) -> Result<SnapshotId> {
        self.tx.execute(
            "UPDATE snapshots SET record_count = ?1, string_count = ?2 WHERE id = ?3",
            params![self.record_count, self.string_count, self.id],
        )?;
        self.tx.commit()?;
        info!(
            id = self.id,
            records = self.record_count,
            strings = self.string_count,
            "snapshot committed"
        );
        Ok(self.id)
    }
}

fn row_to_meta(row: &rusqlite::Row<'_>) -> rusqlite::Result<SnapshotMeta> {
    Ok(SnapshotMeta {
        id: row.get(0)?,
        label: row.get(1)?,
        created_at: row.get(2)?,
        esm_sha256: row.get(3)?,
        record_count: row.get(4)?,
        string_count: row.get(5)?,
    })
}

fn parse_type(s: &str) -> RecordType {
    RecordType::parse(s).unwrap_or(RecordType(*b"????"))
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordSummary> {
    Ok(RecordSummary {
        form_id: FormId(row.get::<_, i64>(0)? as u32),
        record_type: parse_type(&row.get::<_, String>(1)?),
        editor_id: row.get(2)?,
        full_name: row.get(3)?,
        data_hash: row.get(4)?,
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRecord> {
    Ok(StoredRecord {
        snapshot_id: row.get(0)?,
        form_id: FormId(row.get::<_, i64>(1)? as u32),
        record_type: parse_type(&row.get::<_, String>(2)?),
        flags: row.get::<_, i64>(3)? as u32,
        revision: row.get::<_, i64>(4)? as u32,
        version: row.get::<_, i64>(5)? as u16,
        editor_id: row.get(6)?,
        full_name: row.get(7)?,
        data_hash: row.get(8)?,
    })
}
