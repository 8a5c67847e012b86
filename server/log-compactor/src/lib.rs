//! Log Compactor — sliding-window compaction of plain-text log streams.
//!
//! Parses `<timestamp> <LEVEL> key=value ...` lines, merges consecutive
//! field-identical events inside a time window into one summary line with a
//! count and timestamp range, and escalates repeated ERROR events to CRITICAL.
//!
//! No DB, no network, no persisted state; pure computation + in-memory window.

pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod group;
pub mod parser;
pub mod source;
pub mod types;

pub use config::Config;
pub use engine::{Compaction, CompactionStats, Engine, SlidingWindow};
pub use error::CompactorError;
pub use group::Group;
pub use source::{compact_file, compact_reader};
pub use types::{Event, Level, Timestamp};
