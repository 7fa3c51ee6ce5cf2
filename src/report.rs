//! Per-run outcomes and the aggregated run report

use crate::classify::Category;
use crate::layout::MonthBucket;
use crate::tagger::TagOutcome;
use crate::time::CaptureTimestamp;
use chrono::{DateTime, Local};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What happened to one file at one destination root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum CopyOutcome {
    /// The file was written to the slot
    Copied,
    /// A file with the same name already sat in the slot; left untouched
    SkippedExisting,
    /// The file matched no category and unclassified files are dropped
    SkippedUnclassified,
    /// Dry run: the file would have been copied
    Planned,
    /// Directory creation or copy failed for this root
    Failed(String),
}

impl CopyOutcome {
    /// Whether the slot counts toward the per-month report
    pub fn is_counted(&self) -> bool {
        matches!(
            self,
            CopyOutcome::Copied | CopyOutcome::SkippedExisting | CopyOutcome::Planned
        )
    }
}

/// Outcome of one file at one destination root
#[derive(Debug, Clone, Serialize)]
pub struct SlotRecord {
    /// Destination root
    pub root: PathBuf,
    /// Full destination file path, when one was derived
    pub destination: Option<PathBuf>,
    pub outcome: CopyOutcome,
    /// Tagging result; `None` when tagging was not attempted
    pub tag: Option<TagOutcome>,
}

/// Terminal state of one enumerated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum FileStatus {
    /// At least one destination holds the file
    Sorted,
    /// Another file with the same dedup key was handled earlier in the run
    Duplicate,
    /// Unclassified and dropped by policy
    Dropped,
    /// No destination holds the file
    Failed(String),
}

/// Everything the engine decided about one source file
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub source: PathBuf,
    pub relative_path: PathBuf,
    pub capture: Option<CaptureTimestamp>,
    pub category: Option<Category>,
    pub bucket: Option<MonthBucket>,
    pub status: FileStatus,
    pub slots: Vec<SlotRecord>,
    /// Move mode: the source was deleted after reaching every destination
    pub source_removed: bool,
}

impl FileRecord {
    pub(crate) fn new(source: PathBuf, relative_path: PathBuf, status: FileStatus) -> Self {
        Self {
            source,
            relative_path,
            capture: None,
            category: None,
            bucket: None,
            status,
            slots: Vec::new(),
            source_removed: false,
        }
    }
}

/// Destination slot events per month, then per category
///
/// Serializes as `{"June 2023": {"JPEG": 1}, ...}` in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    months: BTreeMap<MonthBucket, BTreeMap<Category, usize>>,
}

impl RunCounters {
    /// Count one slot event
    pub fn increment(&mut self, bucket: &MonthBucket, category: Category) {
        *self
            .months
            .entry(bucket.clone())
            .or_default()
            .entry(category)
            .or_insert(0) += 1;
    }

    /// Count for a `"{Month} {Year}"` label and category (0 if absent)
    pub fn get(&self, label: &str, category: Category) -> usize {
        self.months
            .iter()
            .find(|(bucket, _)| bucket.label == label)
            .and_then(|(_, counts)| counts.get(&category).copied())
            .unwrap_or(0)
    }

    /// Month buckets with their per-category counts, oldest first
    pub fn iter(&self) -> impl Iterator<Item = (&MonthBucket, &BTreeMap<Category, usize>)> {
        self.months.iter()
    }

    /// Plain `label -> category -> count` view
    pub fn to_label_map(&self) -> BTreeMap<String, BTreeMap<Category, usize>> {
        self.months
            .iter()
            .map(|(bucket, counts)| (bucket.label.clone(), counts.clone()))
            .collect()
    }

    /// Sum of all counts
    pub fn total(&self) -> usize {
        self.months.values().flat_map(|c| c.values()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

impl Serialize for RunCounters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.months.len()))?;
        for (bucket, counts) in &self.months {
            map.serialize_entry(&bucket.label, counts)?;
        }
        map.end()
    }
}

/// A destination root that was left out of the run
#[derive(Debug, Clone, Serialize)]
pub struct RejectedDestination {
    pub path: PathBuf,
    pub reason: String,
}

/// One failed destination slot, flattened for display
#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub message: String,
}

/// Read-only snapshot of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub counters: RunCounters,
    /// Files enumerated from the source
    pub files_seen: usize,
    /// Files skipped because their dedup key was already claimed
    pub duplicates: usize,
    /// Unclassified files dropped by policy
    pub dropped: usize,
    /// Slots written
    pub copied: usize,
    /// Slots already holding a file of that name
    pub skipped_existing: usize,
    /// Dry run slots
    pub planned: usize,
    /// Slots that failed
    pub failed: usize,
    pub tags_applied: usize,
    pub tags_unsupported: usize,
    pub tags_failed: usize,
    /// Move mode: sources deleted
    pub sources_removed: usize,
    /// Empty directories removed after the run
    pub dirs_pruned: usize,
    pub rejected_destinations: Vec<RejectedDestination>,
    pub dry_run: bool,
    pub cancelled: bool,
    /// Per-file records in enumeration order
    pub files: Vec<FileRecord>,
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

impl RunReport {
    /// Every failed slot with its source file
    pub fn failures(&self) -> Vec<FailureEntry> {
        self.files
            .iter()
            .flat_map(|file| {
                file.slots.iter().filter_map(move |slot| match &slot.outcome {
                    CopyOutcome::Failed(message) => Some(FailureEntry {
                        source: file.source.clone(),
                        destination: slot.destination.clone().or_else(|| Some(slot.root.clone())),
                        message: message.clone(),
                    }),
                    _ => None,
                })
            })
            .collect()
    }

    /// Elapsed wall-clock time as `H:MM:SS`
    pub fn format_elapsed(&self) -> String {
        let secs = self.elapsed.as_secs();
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }

    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Seen: {}, Copied: {}, Existing: {}, Duplicates: {}, Dropped: {}, Failed: {}, Time: {}",
            self.files_seen,
            self.copied + self.planned,
            self.skipped_existing,
            self.duplicates,
            self.dropped,
            self.failed,
            self.format_elapsed()
        )
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Mutable accumulator fed with file records in enumeration order
#[derive(Debug)]
pub(crate) struct RunReportBuilder {
    started_at: DateTime<Local>,
    clock: Instant,
    counters: RunCounters,
    files_seen: usize,
    duplicates: usize,
    dropped: usize,
    copied: usize,
    skipped_existing: usize,
    planned: usize,
    failed: usize,
    tags_applied: usize,
    tags_unsupported: usize,
    tags_failed: usize,
    sources_removed: usize,
    files: Vec<FileRecord>,
}

impl RunReportBuilder {
    pub fn start() -> Self {
        Self {
            started_at: Local::now(),
            clock: Instant::now(),
            counters: RunCounters::default(),
            files_seen: 0,
            duplicates: 0,
            dropped: 0,
            copied: 0,
            skipped_existing: 0,
            planned: 0,
            failed: 0,
            tags_applied: 0,
            tags_unsupported: 0,
            tags_failed: 0,
            sources_removed: 0,
            files: Vec::new(),
        }
    }

    pub fn set_files_seen(&mut self, count: usize) {
        self.files_seen = count;
    }

    /// Fold one file's outcomes into the totals and counters
    pub fn record(&mut self, file: FileRecord) {
        match file.status {
            FileStatus::Duplicate => self.duplicates += 1,
            FileStatus::Dropped => self.dropped += 1,
            FileStatus::Sorted | FileStatus::Failed(_) => {}
        }
        if file.source_removed {
            self.sources_removed += 1;
        }

        for slot in &file.slots {
            match slot.outcome {
                CopyOutcome::Copied => self.copied += 1,
                CopyOutcome::SkippedExisting => self.skipped_existing += 1,
                CopyOutcome::Planned => self.planned += 1,
                CopyOutcome::Failed(_) => self.failed += 1,
                CopyOutcome::SkippedUnclassified => {}
            }
            if slot.outcome.is_counted()
                && let (Some(bucket), Some(category)) = (&file.bucket, file.category)
            {
                self.counters.increment(bucket, category);
            }
            match slot.tag {
                Some(TagOutcome::Applied) => self.tags_applied += 1,
                Some(TagOutcome::Unsupported) => self.tags_unsupported += 1,
                Some(TagOutcome::Failed(_)) => self.tags_failed += 1,
                None => {}
            }
        }

        self.files.push(file);
    }

    pub fn build(
        self,
        rejected_destinations: Vec<RejectedDestination>,
        dirs_pruned: usize,
        dry_run: bool,
        cancelled: bool,
    ) -> RunReport {
        let elapsed = self.clock.elapsed();
        let finished_at = Local::now();
        RunReport {
            started_at: self.started_at,
            finished_at,
            elapsed,
            counters: self.counters,
            files_seen: self.files_seen,
            duplicates: self.duplicates,
            dropped: self.dropped,
            copied: self.copied,
            skipped_existing: self.skipped_existing,
            planned: self.planned,
            failed: self.failed,
            tags_applied: self.tags_applied,
            tags_unsupported: self.tags_unsupported,
            tags_failed: self.tags_failed,
            sources_removed: self.sources_removed,
            dirs_pruned,
            rejected_destinations,
            dry_run,
            cancelled,
            files: self.files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::MonthNames;
    use chrono::NaiveDate;

    fn bucket(y: i32, m: u32) -> MonthBucket {
        let ts = NaiveDate::from_ymd_opt(y, m, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        MonthBucket::new(&ts, &MonthNames::english())
    }

    fn sorted_file(b: MonthBucket, category: Category, outcomes: Vec<CopyOutcome>) -> FileRecord {
        let mut record = FileRecord::new("src/a".into(), "a".into(), FileStatus::Sorted);
        record.bucket = Some(b);
        record.category = Some(category);
        record.slots = outcomes
            .into_iter()
            .map(|outcome| SlotRecord {
                root: "/dest".into(),
                destination: None,
                outcome,
                tag: None,
            })
            .collect();
        record
    }

    #[test]
    fn test_counters_count_copies_and_existing_but_not_failures() {
        let mut builder = RunReportBuilder::start();
        builder.record(sorted_file(
            bucket(2023, 6),
            Category::Jpeg,
            vec![
                CopyOutcome::Copied,
                CopyOutcome::SkippedExisting,
                CopyOutcome::Failed("disk full".into()),
            ],
        ));
        let report = builder.build(vec![], 0, false, false);

        assert_eq!(report.counters.get("June 2023", Category::Jpeg), 2);
        assert_eq!(report.copied, 1);
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].message, "disk full");
    }

    #[test]
    fn test_counters_serialize_chronologically() {
        let mut counters = RunCounters::default();
        counters.increment(&bucket(2023, 6), Category::Jpeg);
        counters.increment(&bucket(2022, 1), Category::Png);
        counters.increment(&bucket(2022, 1), Category::Png);

        let json = serde_json::to_string(&counters).unwrap();
        assert_eq!(json, r#"{"January 2022":{"PNG":2},"June 2023":{"JPEG":1}}"#);
        assert_eq!(counters.total(), 3);
    }

    #[test]
    fn test_format_elapsed() {
        let mut report = RunReportBuilder::start().build(vec![], 0, false, false);
        report.elapsed = Duration::from_secs(3 * 3600 + 5 * 60 + 9);
        assert_eq!(report.format_elapsed(), "3:05:09");
        assert!(report.summary().contains("Time: 3:05:09"));
    }

    #[test]
    fn test_duplicates_and_dropped_are_tallied() {
        let mut builder = RunReportBuilder::start();
        builder.set_files_seen(2);
        builder.record(FileRecord::new("a".into(), "a".into(), FileStatus::Duplicate));
        builder.record(FileRecord::new("b".into(), "b".into(), FileStatus::Dropped));
        let report = builder.build(vec![], 0, false, false);
        assert_eq!((report.files_seen, report.duplicates, report.dropped), (2, 1, 1));
        assert!(report.counters.is_empty());
    }
}
