//! Classification and fan-out copy engine
//!
//! Handles the core logic of:
//! - Enumerating the source directory once
//! - Skipping repeated file names within a run
//! - Resolving capture time and category
//! - Copying each file into every destination root without overwriting
//! - Tagging fresh copies with the author
//! - Pruning empty directories afterwards

use crate::cancel::CancellationToken;
use crate::classify::{Category, Classifier};
use crate::cleanup::prune_empty_dirs;
use crate::config::{Config, DedupKey, FileOperation, UnclassifiedPolicy};
use crate::error::{Error, Result};
use crate::layout::{MonthBucket, MonthNames, ensure_dir, slot_dir};
use crate::media::{MediaFile, enumerate, nested_roots, normalize_path};
use crate::report::{
    CopyOutcome, FileRecord, FileStatus, RejectedDestination, RunReport, RunReportBuilder,
    SlotRecord,
};
use crate::tagger::{ExifToolTagger, MetadataTagger, TagOutcome};
use crate::time::resolve_capture_time;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{Level, debug, info, span, warn};

/// Copy buffer size
const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// Dedup keys already claimed during one run
///
/// `claim` checks and marks in one step under a lock, so the set can be
/// shared by parallel workers.
#[derive(Debug, Default)]
pub struct ProcessedNames {
    seen: Mutex<HashSet<String>>,
}

impl ProcessedNames {
    /// Returns `true` the first time `key` is claimed, `false` afterwards
    pub fn claim(&self, key: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sorts one source tree into one or more destination roots
pub struct Sorter {
    config: Config,
    classifier: Classifier,
    month_names: MonthNames,
    tagger: Arc<dyn MetadataTagger>,
    cancel: CancellationToken,
}

impl Sorter {
    /// Create a sorter with the bundled ExifTool tagger
    pub fn new(config: Config) -> Result<Self> {
        if config.jpeg_extensions.is_empty()
            && config.png_extensions.is_empty()
            && config.raw_extensions.is_empty()
            && config.video_extensions.is_empty()
            && config.unclassified == UnclassifiedPolicy::Drop
        {
            return Err(Error::Config(
                "every category table is empty and unclassified files are dropped".into(),
            ));
        }

        let classifier = Classifier::from_config(&config);
        let month_names = MonthNames::for_locale(config.resolved_month_locale().as_deref());

        Ok(Self {
            config,
            classifier,
            month_names,
            tagger: Arc::new(ExifToolTagger::default()),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the metadata tagger
    pub fn with_tagger(mut self, tagger: Arc<dyn MetadataTagger>) -> Self {
        self.tagger = tagger;
        self
    }

    /// Handle that stops the run before its next file
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run with the source, destinations and author from the configuration
    pub fn run_configured(&self) -> Result<RunReport> {
        self.run(
            &self.config.source_dir,
            &self.config.destination_dirs,
            self.config.author.as_deref(),
        )
    }

    /// Sort every file under `source_root` into each of `destination_roots`
    ///
    /// Fails only when the source cannot be read or no destination is
    /// usable. Per-file problems are recorded in the report.
    pub fn run(
        &self,
        source_root: &Path,
        destination_roots: &[PathBuf],
        author: Option<&str>,
    ) -> Result<RunReport> {
        let _span = span!(Level::INFO, "sorter_run", source = ?source_root).entered();
        let mut builder = RunReportBuilder::start();

        if destination_roots.is_empty() {
            return Err(Error::NoDestinations);
        }

        let (roots, rejected) =
            validate_destinations(destination_roots, source_root, self.config.operation);
        if roots.is_empty() {
            return Err(Error::NoWritableDestination);
        }

        let skip_roots = nested_roots(source_root, &roots);

        info!("Scanning source directory...");
        let files = enumerate(source_root, &self.config, &skip_roots)?;
        info!(count = files.len(), destinations = roots.len(), "Found source files");
        builder.set_files_seen(files.len());

        let author = author.map(str::trim).filter(|a| !a.is_empty());
        if author.is_some() && !self.tagger.is_available() {
            warn!("Metadata tagger is not available, copies will not be tagged");
        }

        let names = ProcessedNames::default();
        let workers = self.config.worker_count();
        let cancelled = if workers > 1 {
            self.sort_parallel(files, &roots, author, &names, workers, &mut builder)
        } else {
            self.sort_sequential(files, &roots, author, &names, &mut builder)
        };

        if cancelled {
            warn!("Run cancelled, remaining files were not processed");
        }

        let mut dirs_pruned = 0;
        if self.config.prune_empty_dirs && !self.config.dry_run {
            dirs_pruned += prune_empty_dirs(source_root, &skip_roots);
            for root in &roots {
                dirs_pruned += prune_empty_dirs(root, &[]);
            }
        }

        let report = builder.build(rejected, dirs_pruned, self.config.dry_run, cancelled);
        info!("{}", report.summary());
        Ok(report)
    }

    /// Returns `true` if the run was cancelled before all files were seen
    fn sort_sequential(
        &self,
        files: Vec<MediaFile>,
        roots: &[PathBuf],
        author: Option<&str>,
        names: &ProcessedNames,
        builder: &mut RunReportBuilder,
    ) -> bool {
        for file in &files {
            if let Err(e) = self.cancel.check() {
                debug!(error = %e, path = ?file.path, "Stopping before file");
                return true;
            }
            let record = if names.claim(&self.dedup_key(file)) {
                self.sort_file(file, roots, author)
            } else {
                duplicate_record(file)
            };
            builder.record(record);
        }
        false
    }

    /// Claims are made up front in enumeration order so the first file with
    /// a given key wins regardless of scheduling; results keep that order.
    fn sort_parallel(
        &self,
        files: Vec<MediaFile>,
        roots: &[PathBuf],
        author: Option<&str>,
        names: &ProcessedNames,
        workers: usize,
        builder: &mut RunReportBuilder,
    ) -> bool {
        let pool = match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, "Failed to build thread pool, sorting sequentially");
                return self.sort_sequential(files, roots, author, names, builder);
            }
        };

        let claimed: Vec<(MediaFile, bool)> = files
            .into_iter()
            .map(|file| {
                let first = names.claim(&self.dedup_key(&file));
                (file, first)
            })
            .collect();

        let records: Vec<Option<FileRecord>> = pool.install(|| {
            claimed
                .par_iter()
                .map(|(file, first)| {
                    if self.cancel.is_cancelled() {
                        None
                    } else if *first {
                        Some(self.sort_file(file, roots, author))
                    } else {
                        Some(duplicate_record(file))
                    }
                })
                .collect()
        });

        let mut cancelled = false;
        for record in records {
            match record {
                Some(record) => builder.record(record),
                None => cancelled = true,
            }
        }
        cancelled
    }

    fn dedup_key(&self, file: &MediaFile) -> String {
        match self.config.dedup {
            DedupKey::Basename => file.file_name.clone(),
            DedupKey::RelativePath => file.relative_path.to_string_lossy().into_owned(),
        }
    }

    /// Resolve, classify and fan one file out to every destination root
    fn sort_file(&self, file: &MediaFile, roots: &[PathBuf], author: Option<&str>) -> FileRecord {
        let _file_span = span!(Level::DEBUG, "sort_file", path = ?file.path).entered();

        let capture = resolve_capture_time(file, &self.config);
        let category = self.classifier.classify(&file.extension);
        let bucket = MonthBucket::new(&capture.timestamp, &self.month_names);

        let mut record = FileRecord::new(
            file.path.clone(),
            file.relative_path.clone(),
            FileStatus::Sorted,
        );
        record.capture = Some(capture);
        record.category = Some(category);
        record.bucket = Some(bucket.clone());

        if category == Category::Unclassified
            && self.config.unclassified == UnclassifiedPolicy::Drop
        {
            debug!(path = ?file.path, "Dropping unclassified file");
            record.status = FileStatus::Dropped;
            record.slots = roots
                .iter()
                .map(|root| SlotRecord {
                    root: root.clone(),
                    destination: None,
                    outcome: CopyOutcome::SkippedUnclassified,
                    tag: None,
                })
                .collect();
            return record;
        }

        for root in roots {
            record
                .slots
                .push(self.place(file, root, &bucket, category, author));
        }

        if let Some(message) = all_failed(&record.slots) {
            record.status = FileStatus::Failed(message);
        }

        if self.config.operation == FileOperation::Move && !self.config.dry_run {
            record.source_removed = self.remove_moved_source(file, &record.slots);
        }

        record
    }

    /// Copy one file into its slot under one destination root
    fn place(
        &self,
        file: &MediaFile,
        root: &Path,
        bucket: &MonthBucket,
        category: Category,
        author: Option<&str>,
    ) -> SlotRecord {
        let dir = slot_dir(root, bucket, category);
        let destination = dir.join(&file.file_name);
        let slot = |outcome, tag| SlotRecord {
            root: root.to_path_buf(),
            destination: Some(destination.clone()),
            outcome,
            tag,
        };

        if self.config.dry_run {
            let outcome = if destination.exists() {
                CopyOutcome::SkippedExisting
            } else {
                CopyOutcome::Planned
            };
            info!(source = ?file.path, ?destination, ?outcome, "Would copy file");
            return slot(outcome, None);
        }

        if let Err(e) = ensure_dir(&dir) {
            warn!(source = ?file.path, error = %e, "Failed to create destination directory");
            return slot(CopyOutcome::Failed(e.to_string()), None);
        }

        match copy_if_absent(&file.path, &destination) {
            Ok(true) => {
                info!(source = ?file.path, ?destination, "Copied file");
                let tag = author.map(|author| self.tag_copy(file, &destination, author));
                slot(CopyOutcome::Copied, tag)
            }
            Ok(false) => {
                debug!(source = ?file.path, ?destination, "Destination already exists, skipping");
                slot(CopyOutcome::SkippedExisting, None)
            }
            Err(e) => {
                warn!(source = ?file.path, ?destination, error = %e, "Failed to copy file");
                slot(CopyOutcome::Failed(e.to_string()), None)
            }
        }
    }

    /// Tag a fresh copy; never touches the source or non-image kinds
    fn tag_copy(&self, file: &MediaFile, destination: &Path, author: &str) -> TagOutcome {
        if !self.config.is_taggable(&file.extension) {
            return TagOutcome::Unsupported;
        }
        let outcome = self.tagger.tag(destination, author);
        match &outcome {
            TagOutcome::Applied => debug!(?destination, "Tagged author"),
            TagOutcome::Unsupported => debug!(?destination, "Tagging not supported for file"),
            TagOutcome::Failed(reason) => {
                let e = Error::Tag {
                    path: destination.to_path_buf(),
                    message: reason.clone(),
                };
                warn!(error = %e, "Tagging failed, copy kept");
            }
        }
        outcome
    }

    /// Move mode: delete the source once every destination holds it
    ///
    /// A pre-existing destination only counts if it is a separate file with
    /// the same bytes as the source.
    fn remove_moved_source(&self, file: &MediaFile, slots: &[SlotRecord]) -> bool {
        let all_landed = slots.iter().all(|slot| match slot.outcome {
            CopyOutcome::Copied => true,
            CopyOutcome::SkippedExisting => slot
                .destination
                .as_deref()
                .is_some_and(|dest| holds_copy_of(&file.path, dest)),
            _ => false,
        });
        if !all_landed {
            debug!(path = ?file.path, "Keeping source, not every destination holds it");
            return false;
        }

        match fs::remove_file(&file.path) {
            Ok(()) => {
                debug!(path = ?file.path, "Removed moved source");
                true
            }
            Err(e) => {
                warn!(path = ?file.path, error = %e, "Failed to remove moved source");
                false
            }
        }
    }
}

fn duplicate_record(file: &MediaFile) -> FileRecord {
    debug!(path = ?file.path, "Skipping repeated file name");
    FileRecord::new(
        file.path.clone(),
        file.relative_path.clone(),
        FileStatus::Duplicate,
    )
}

/// First failure message if no slot holds the file
fn all_failed(slots: &[SlotRecord]) -> Option<String> {
    if slots.is_empty() || slots.iter().any(|s| s.outcome.is_counted()) {
        return None;
    }
    slots.iter().find_map(|s| match &s.outcome {
        CopyOutcome::Failed(message) => Some(message.clone()),
        _ => None,
    })
}

/// Whether `dest` is a separate file with the same bytes as `source`
fn holds_copy_of(source: &Path, dest: &Path) -> bool {
    if normalize_path(source) == normalize_path(dest) {
        warn!(?source, "Destination slot is the source file itself, keeping it");
        return false;
    }
    match contents_equal(source, dest) {
        Ok(true) => true,
        Ok(false) => {
            warn!(?source, ?dest, "Existing destination differs from source, keeping source");
            false
        }
        Err(e) => {
            warn!(?source, ?dest, error = %e, "Failed to compare with existing destination, keeping source");
            false
        }
    }
}

/// Streaming byte comparison of two files
fn contents_equal(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut left = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(a)?);
    let mut right = BufReader::with_capacity(COPY_BUFFER_SIZE, File::open(b)?);
    loop {
        let left_chunk = left.fill_buf()?;
        let right_chunk = right.fill_buf()?;
        let n = left_chunk.len().min(right_chunk.len());
        if n == 0 {
            return Ok(left_chunk.is_empty() && right_chunk.is_empty());
        }
        if left_chunk[..n] != right_chunk[..n] {
            return Ok(false);
        }
        left.consume(n);
        right.consume(n);
    }
}

/// Create and remove a marker file to prove `root` accepts new files
fn probe_writable(root: &Path) -> io::Result<()> {
    let marker = root.join(format!(".files-sorter-{}.probe", std::process::id()));
    match OpenOptions::new().write(true).create_new(true).open(&marker) {
        Ok(_) => fs::remove_file(&marker),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Split destination roots into usable ones and rejected ones
///
/// A root is unusable if it is missing, not a writable directory, or the
/// source itself. In move mode a root that contains the source is also
/// refused, since source files could already sit at their own slot paths.
fn validate_destinations(
    roots: &[PathBuf],
    source_root: &Path,
    operation: FileOperation,
) -> (Vec<PathBuf>, Vec<RejectedDestination>) {
    let source = normalize_path(source_root);
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for root in roots {
        let reason = match fs::metadata(root) {
            Ok(meta) if !meta.is_dir() => Some("not a directory".to_string()),
            Ok(_) => {
                let normalized = normalize_path(root);
                if normalized == source {
                    Some("is the source directory".to_string())
                } else if operation == FileOperation::Move && source.starts_with(&normalized) {
                    Some("contains the source directory, not allowed when moving".to_string())
                } else {
                    probe_writable(root)
                        .err()
                        .map(|e| format!("not writable: {e}"))
                }
            }
            Err(e) => Some(e.to_string()),
        };
        match reason {
            None => accepted.push(root.clone()),
            Some(reason) => {
                warn!(destination = ?root, %reason, "Skipping unusable destination");
                rejected.push(RejectedDestination {
                    path: root.clone(),
                    reason,
                });
            }
        }
    }

    (accepted, rejected)
}

/// Copy `source` to `dest` unless `dest` already exists
///
/// The destination is opened with create-new semantics, so an existing file
/// is never overwritten even if another run creates it concurrently. Returns
/// `Ok(false)` when the destination already existed. A partially written
/// destination is removed on failure.
fn copy_if_absent(source: &Path, dest: &Path) -> Result<bool> {
    let copy_error = |e: io::Error| Error::Copy {
        source_path: source.to_path_buf(),
        destination: dest.to_path_buf(),
        source: e,
    };

    let dest_file = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(e)),
    };

    if let Err(e) = copy_contents(source, dest_file) {
        let _ = fs::remove_file(dest);
        return Err(copy_error(e));
    }

    preserve_metadata(source, dest);
    Ok(true)
}

/// Copy file with buffered I/O and flush it to disk
fn copy_contents(source: &Path, dest_file: File) -> io::Result<()> {
    let src_file = File::open(source)?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    let dest_file = writer.into_inner().map_err(|e| e.into_error())?;
    dest_file.sync_all()
}

/// Carry permissions and modification time over, best-effort
fn preserve_metadata(source: &Path, dest: &Path) {
    if let Ok(metadata) = fs::metadata(source) {
        let _ = fs::set_permissions(dest, metadata.permissions());
        if let Ok(mtime) = metadata.modified() {
            let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
        }
    }
}
