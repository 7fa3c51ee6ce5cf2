//! Destination layout: `root/YYYY/<Month> YYYY/<Category>/`

use crate::classify::Category;
use crate::error::{Error, Result};
use chrono::{Datelike, Locale, Month, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Produces full month names, in English or in a chrono locale
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthNames {
    locale: Option<Locale>,
}

impl MonthNames {
    /// English month names
    pub fn english() -> Self {
        Self::default()
    }

    /// Month names for a POSIX locale name (`fr_FR`, `de_DE`, ...)
    ///
    /// Unknown locales fall back to English.
    pub fn for_locale(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return Self::english();
        };
        // Strip encoding/modifier suffixes: "de_DE.UTF-8@euro"
        let bare = name.split(['.', '@']).next().unwrap_or(name);
        match Locale::try_from(bare) {
            Ok(locale) => Self {
                locale: Some(locale),
            },
            Err(_) => {
                warn!(locale = name, "Unknown month locale, using English month names");
                Self::english()
            }
        }
    }

    /// Full name of month `month` (1-12)
    pub fn name(&self, year: i32, month: u32) -> String {
        if let Some(locale) = self.locale
            && let Some(date) = NaiveDate::from_ymd_opt(year, month, 1)
        {
            let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
            return midnight.format_localized("%B", locale).to_string();
        }
        u8::try_from(month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name().to_string())
            .unwrap_or_else(|| format!("{month:02}"))
    }
}

/// The `(year, month)` bucket of a destination slot, with its folder label
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    /// `"{MonthName} {Year}"`, e.g. `June 2023`
    pub label: String,
}

impl MonthBucket {
    pub fn new(timestamp: &NaiveDateTime, names: &MonthNames) -> Self {
        let (year, month) = (timestamp.year(), timestamp.month());
        Self {
            year,
            month,
            label: format!("{} {}", names.name(year, month), year),
        }
    }

    /// Directory of this bucket relative to a destination root
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(format!("{:04}", self.year)).join(&self.label)
    }
}

/// Directory that holds files of `category` for `bucket` under `root`
pub fn slot_dir(root: &Path, bucket: &MonthBucket, category: Category) -> PathBuf {
    root.join(bucket.relative_dir()).join(category.label())
}

/// Create `dir` and its parents, treating "already there" as success
///
/// Safe against other workers or runs creating the same directory
/// concurrently. Fails if something that is not a directory sits in the way.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(source) => Err(Error::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
