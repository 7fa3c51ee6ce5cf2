//! Capture time resolution
//!
//! A file's capture time comes from embedded EXIF metadata when the format
//! can carry it, and from the file system modification time otherwise.

pub mod exif;

use crate::config::Config;
use crate::media::MediaFile;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

/// Provenance of a resolved capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeSource {
    /// Read from an embedded "original capture time" field
    EmbeddedMetadata,
    /// Taken from the file's last modification time
    FilesystemMtime,
}

/// Capture time of one file, used only to pick its destination slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureTimestamp {
    /// Local wall-clock time
    pub timestamp: NaiveDateTime,
    /// Where the timestamp came from
    pub source: TimeSource,
}

/// Resolve the capture time of a file
///
/// Never fails: any problem reading embedded metadata (unsupported format,
/// missing tag, unparsable value, corrupt or unreadable file) falls back to
/// the modification time captured at enumeration.
pub fn resolve_capture_time(file: &MediaFile, config: &Config) -> CaptureTimestamp {
    if config.carries_capture_metadata(&file.extension) {
        match exif::read_capture_time(&file.path) {
            Ok(timestamp) => {
                debug!(path = ?file.path, %timestamp, "Extracted capture time from EXIF");
                return CaptureTimestamp {
                    timestamp,
                    source: TimeSource::EmbeddedMetadata,
                };
            }
            Err(e) => {
                debug!(path = ?file.path, error = %e, "No EXIF capture time, using modification time");
            }
        }
    }

    let modified: DateTime<Local> = file.modified.into();
    CaptureTimestamp {
        timestamp: modified.naive_local(),
        source: TimeSource::FilesystemMtime,
    }
}
