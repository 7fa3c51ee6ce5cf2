//! EXIF capture time extraction

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// EXIF tags holding the capture time, in priority order
const CAPTURE_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal,  // When the original image was taken
    Tag::DateTimeDigitized, // When the image was digitized
];

/// Read the embedded capture time of an image
pub fn read_capture_time(path: &Path) -> Result<NaiveDateTime> {
    let metadata_error = |message: String| Error::MetadataRead {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| metadata_error(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let exif = Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| metadata_error(e.to_string()))?;

    for tag in CAPTURE_TAGS {
        if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
            let raw = match &field.value {
                Value::Ascii(parts) => parts
                    .first()
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    .unwrap_or_default(),
                _ => field.display_value().to_string(),
            };
            if let Some(datetime) = parse_exif_datetime(&raw) {
                trace!(?path, ?tag, "Found EXIF capture time");
                return Ok(datetime);
            }
        }
    }

    Err(metadata_error("no valid capture time tag".to_string()))
}

/// Parse the EXIF layout `YYYY:MM:DD HH:MM:SS`
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches(|c| c == '"' || c == '\0');

    NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::jpeg_with_capture_time;
    use chrono::{Datelike, Timelike};
    use tempfile::tempdir;

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2024:01:15 14:30:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 15));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (14, 30, 0));

        assert!(parse_exif_datetime("\"2024:01:15 14:30:00\"").is_some());
        assert!(parse_exif_datetime("2024:01:15 14:30:00.25").is_some());

        // Placeholder written by some cameras when the clock is unset
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("2024-01-15").is_none());
        assert!(parse_exif_datetime("").is_none());
    }

    #[test]
    fn test_read_capture_time_from_jpeg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, jpeg_with_capture_time("2023:06:15 10:30:00")).unwrap();

        let dt = read_capture_time(&path).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2023, 6, 15, 10));
    }

    #[test]
    fn test_unparsable_tag_is_a_metadata_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, jpeg_with_capture_time("sometime in june")).unwrap();

        let err = read_capture_time(&path).unwrap_err();
        assert!(matches!(err, Error::MetadataRead { .. }));
    }

    #[test]
    fn test_missing_file_is_a_metadata_error() {
        let err = read_capture_time(Path::new("/no/such/file.jpg")).unwrap_err();
        assert!(matches!(err, Error::MetadataRead { .. }));
    }
}
