//! Snapshot persistence, diffing and lookups for parsed master files.
//!
//! Each parse of a master file is committed as one immutable snapshot in a
//! SQLite database: record rows keyed by `(snapshot_id, form_id)` with a
//! per-record content hash, decoded fields, the string table, and keyword
//! editor ids. The diff engine computes added/removed/modified sets
//! between any two snapshots, including snapshots in different database
//! files (production vs. public-test builds).

mod diff;
mod error;
mod query;
mod schema;
mod store;
mod types;

pub use diff::{
    DiffReport, FieldChange, FieldDelta, ModifiedRecord, diff_snapshots, save_diff,
};
pub use error::{Error, Result};
pub use query::{find, get, iter_type, load_subrecords, strings_search};
pub use schema::SCHEMA_VERSION;
pub use store::{PendingSnapshot, SnapshotStore};

// Re-exported so downstream callers build records and read field values
// without a separate parser dependency.
pub use esm_parser::{DecodedField, DecodedRecord, FieldValue, FormId, RecordType};
pub use types::{RecordSummary, SnapshotId, SnapshotMeta, StoredRecord};
