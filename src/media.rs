//! Source enumeration

use crate::config::{Config, Traversal, normalize_extension};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// One regular file found under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Absolute or caller-relative path to the file
    pub path: PathBuf,
    /// Path relative to the source root
    pub relative_path: PathBuf,
    /// Base filename
    pub file_name: String,
    /// Lower-cased extension without the dot (empty if none)
    pub extension: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl MediaFile {
    /// Build a `MediaFile` from a path below `root`
    pub fn from_path(root: &Path, path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Config(format!("{} has no file name", path.display())))?;
        let extension = path
            .extension()
            .map(|e| normalize_extension(&e.to_string_lossy()))
            .unwrap_or_default();
        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        Ok(Self {
            path: path.to_path_buf(),
            relative_path,
            file_name,
            extension,
            size: metadata.len(),
            modified: metadata.modified()?,
        })
    }
}

/// Files of a directory come before its subdirectories, then by name
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Check if a directory should be skipped while scanning
fn is_excluded_dir(path: &Path, exclude_dirs: &[PathBuf], skip_roots: &[PathBuf]) -> bool {
    if skip_roots.iter().any(|root| path == root) {
        debug!(?path, "Skipping destination root inside source");
        return true;
    }

    for exclude in exclude_dirs {
        if exclude.is_absolute() {
            if path.starts_with(exclude) {
                debug!(?path, ?exclude, "Excluding directory (absolute path match)");
                return true;
            }
        } else if let Some(exclude_name) = exclude.file_name()
            && path.file_name() == Some(exclude_name)
        {
            debug!(?path, ?exclude, "Excluding directory (folder name match)");
            return true;
        }
    }

    false
}

/// Enumerate regular files under `root`
///
/// Symlinks and other non-regular entries are skipped. `skip_roots` lists
/// directories (typically destination roots nested in the source) that must
/// not be descended into. Unreadable entries below the root are logged and
/// skipped; an unreadable root is an error.
pub fn enumerate(root: &Path, config: &Config, skip_roots: &[PathBuf]) -> Result<Vec<MediaFile>> {
    if !root.is_dir() {
        return Err(Error::InvalidSource {
            path: root.to_path_buf(),
            message: "not a directory".into(),
        });
    }
    fs::read_dir(root).map_err(|e| Error::InvalidSource {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;

    let max_depth = match config.traversal {
        Traversal::Flat => 1,
        Traversal::Recursive => usize::MAX,
    };

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by(files_first)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir() && is_excluded_dir(e.path(), &config.exclude_dirs, skip_roots))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable source entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match MediaFile::from_path(root, entry.path()) {
            Ok(file) => files.push(file),
            Err(e) => warn!(path = ?entry.path(), error = %e, "Skipping unreadable file"),
        }
    }

    debug!(count = files.len(), ?root, "Enumerated source files");
    Ok(files)
}

/// Return the destination roots that sit inside the source root, spelled
/// relative to `source` so they compare equal to walked paths
pub fn nested_roots(source: &Path, destinations: &[PathBuf]) -> Vec<PathBuf> {
    let normalized_source = normalize_path(source);
    destinations
        .iter()
        .filter_map(|d| {
            normalize_path(d)
                .strip_prefix(&normalized_source)
                .ok()
                .filter(|rel| !rel.as_os_str().is_empty())
                .map(|rel| source.join(rel))
        })
        .collect()
}

/// Canonical form of `path`, or the path without `.` components when it
/// cannot be resolved
pub fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        path.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    })
}
