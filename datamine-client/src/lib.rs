//! fo76dm client library
//!
//! Command definitions and handlers for the `fo76dm` CLI. The binary in
//! `main.rs` only parses arguments, resolves the active profile and
//! dispatches here.

pub mod commands;
pub mod config_manager;
pub mod output;

use clap::Subcommand;
use std::path::PathBuf;

use esm_parser::CancelFlag;

/// Exit codes promised to scripting consumers.
pub mod exit_codes {
    pub const OK: i32 = 0;
    /// Bad arguments, missing profile.
    pub const USER_ERROR: i32 = 1;
    /// Parse or store failure.
    pub const DATA_ERROR: i32 = 2;
    /// Interrupted by cancellation.
    pub const CANCELLED: i32 = 130;
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse the master file and commit a snapshot
    Snapshot {
        /// Label stored with the snapshot (defaults to a timestamp)
        #[arg(long)]
        label: Option<String>,

        /// Also persist raw subrecords (larger database)
        #[arg(long)]
        full_fidelity: bool,
    },

    /// List committed snapshots
    List,

    /// Diff two snapshots
    Diff {
        /// Compare the two most recent snapshots
        #[arg(long, conflicts_with_all = ["old", "new"])]
        latest: bool,

        /// Older snapshot id
        #[arg(long)]
        old: Option<i64>,

        /// Newer snapshot id
        #[arg(long)]
        new: Option<i64>,

        /// Diff against another profile's database (its latest snapshot)
        #[arg(long, conflicts_with = "other_esm")]
        vs: Option<String>,

        /// Diff against the database derived from another master file
        #[arg(long)]
        other_esm: Option<PathBuf>,

        /// Restrict to one record type (e.g. WEAP)
        #[arg(long = "type")]
        type_filter: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: DiffFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search records by FormID, substring or glob
    Search {
        /// `0x`-prefixed or decimal FormID, substring, or glob
        query: String,

        /// Restrict to one record type
        #[arg(long = "type")]
        type_filter: Option<String>,

        /// Additional editor-id glob filter
        #[arg(long)]
        edid: Option<String>,
    },

    /// Show one record with its decoded fields
    Show {
        /// `0x`-prefixed or decimal FormID
        form_id: String,

        /// Also dump raw subrecords (full-fidelity snapshots only)
        #[arg(long)]
        expand: bool,
    },

    /// Bulk-dump records
    Export {
        /// Output format
        #[arg(long, value_enum)]
        format: ExportFormat,

        /// Restrict to one record type
        #[arg(long = "type")]
        type_filter: Option<String>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Scan for records that look unreleased
    Unreleased,

    /// Delete all but the newest N snapshots
    Purge {
        /// Snapshots to keep
        #[arg(long)]
        keep: usize,
    },

    /// Delete every snapshot
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Per-type record counts for the latest snapshot
    Stats,

    /// String-table operations
    #[command(subcommand)]
    Strings(StringsCommands),
}

#[derive(Subcommand)]
pub enum StringsCommands {
    /// Case-insensitive substring search over localized strings
    Search {
        /// Substring to look for
        substring: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum DiffFormat {
    Text,
    Json,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Resolved execution context handed to command handlers.
pub struct AppContext {
    /// Master file location (from `--esm` or the active profile).
    pub esm_path: PathBuf,
    /// Explicit database override (`--db`).
    pub db_path: Option<PathBuf>,
    /// Language token for string tables.
    pub language: String,
    /// Localization archive override from the profile.
    pub strings_ba2: Option<PathBuf>,
    /// Cooperative cancellation shared with long-running operations.
    pub cancel: CancelFlag,
}

impl AppContext {
    /// Open the store for this context.
    pub fn open_store(&self) -> snapshot_store::Result<snapshot_store::SnapshotStore> {
        match &self.db_path {
            Some(path) => snapshot_store::SnapshotStore::open(path),
            None => snapshot_store::SnapshotStore::open_for_esm(&self.esm_path),
        }
    }
}
