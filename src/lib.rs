//! Files Sorter - fan-out organizer for camera cards and download folders
//!
//! This library copies every file of a source directory into one or more
//! destination roots, laid out as `<root>/<YYYY>/<Month YYYY>/<Category>/`:
//! - Capture time from embedded EXIF metadata, falling back to file mtime
//! - Category (RAW, JPEG, PNG, Video, Unclassified) from the file extension
//! - Existing destination files are never overwritten
//! - Optional author tagging of fresh copies
//! - Optional parallel processing with Rayon
//! - Per-month, per-category counters in the run report

pub mod cancel;
pub mod classify;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod media;
pub mod report;
pub mod tagger;
pub mod time;

#[cfg(test)]
mod test_support;

pub use cancel::CancellationToken;
pub use classify::{Category, Classifier};
pub use cli::Cli;
pub use config::{Config, ConfigError, DedupKey, FileOperation, Traversal, UnclassifiedPolicy};
pub use engine::Sorter;
pub use error::{Error, Result};
pub use layout::{MonthBucket, MonthNames};
pub use report::{CopyOutcome, FileRecord, FileStatus, RunCounters, RunReport};
pub use tagger::{ExifToolTagger, MetadataTagger, TagOutcome};
pub use time::{CaptureTimestamp, TimeSource};
