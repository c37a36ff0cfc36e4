//! Parsers for the `full_results` snapshots that layout test bots upload once per build. Each
//! snapshot records the outcomes of a bot's test run at a single revision.
//!
//! The main entry points are [`snapshot::Snapshot::parse`], [`file_name::SnapshotFileName::parse`],
//! and [`test_name::TestName`].

pub mod envelope;
pub mod file_name;
pub mod snapshot;
pub mod test_name;
