//! Fixtures shared by the unit tests

use crate::tagger::{MetadataTagger, TagOutcome};
use chrono::{Local, TimeZone};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Smallest JPEG kamadak-exif accepts: SOI, one APP1 Exif segment holding
/// IFD0 -> Exif IFD -> DateTimeOriginal, EOI
pub fn jpeg_with_capture_time(datetime: &str) -> Vec<u8> {
    let mut value = datetime.as_bytes().to_vec();
    value.push(0);

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM");
    tiff.extend_from_slice(&42u16.to_be_bytes());
    tiff.extend_from_slice(&8u32.to_be_bytes());

    // IFD0 at 8: one entry pointing at the Exif IFD at 26
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x8769u16.to_be_bytes());
    tiff.extend_from_slice(&4u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&26u32.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());

    // Exif IFD at 26: DateTimeOriginal, value at 44 unless it fits inline
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&0x9003u16.to_be_bytes());
    tiff.extend_from_slice(&2u16.to_be_bytes());
    tiff.extend_from_slice(&(value.len() as u32).to_be_bytes());
    if value.len() <= 4 {
        let mut inline = value.clone();
        inline.resize(4, 0);
        tiff.extend_from_slice(&inline);
        tiff.extend_from_slice(&0u32.to_be_bytes());
    } else {
        tiff.extend_from_slice(&44u32.to_be_bytes());
        tiff.extend_from_slice(&0u32.to_be_bytes());
        tiff.extend_from_slice(&value);
    }

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// Pin a file's modification time to noon local time on the given day
pub fn set_mtime(path: &Path, year: i32, month: u32, day: u32) {
    let when = Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap();
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(when.timestamp(), 0))
        .unwrap();
}

/// Tagger fake that records every call and answers with a fixed outcome
pub struct RecordingTagger {
    outcome: TagOutcome,
    calls: Mutex<Vec<(PathBuf, String)>>,
}

impl RecordingTagger {
    pub fn new(outcome: TagOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl MetadataTagger for RecordingTagger {
    fn tag(&self, path: &Path, author: &str) -> TagOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), author.to_string()));
        self.outcome.clone()
    }
}
