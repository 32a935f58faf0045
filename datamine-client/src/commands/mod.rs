//! Command handlers

pub mod diff;
pub mod export;
pub mod maintain;
pub mod query;
pub mod snapshot;
pub mod unreleased;
