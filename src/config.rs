//! Configuration types for the files sorter

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How the source directory is enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Traversal {
    /// Only the immediate children of the source directory
    Flat,
    /// The whole tree below the source directory, files of a directory
    /// before the files of its subdirectories
    #[default]
    Recursive,
}

/// Key used to decide whether a file was already handled during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupKey {
    /// Base filename only: `a/IMG_1.jpg` and `b/IMG_1.jpg` collide
    #[default]
    Basename,
    /// Path relative to the source root: only true repeats collide
    RelativePath,
}

/// What happens to files whose extension is in none of the category tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnclassifiedPolicy {
    /// Copy them into an `Unclassified` folder next to the other categories
    #[default]
    Copy,
    /// Leave them out of the run entirely (not copied, not counted)
    Drop,
}

/// File operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    /// Copy files to every destination, leave the source untouched
    #[default]
    Copy,
    /// Copy files to every destination, then remove the source once all
    /// destinations hold it
    Move,
}

/// Configuration for the files sorter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory to read media files from
    pub source_dir: PathBuf,

    /// Destination roots, processed in this order for every file
    pub destination_dirs: Vec<PathBuf>,

    /// Author written into the Artist field of every copied image
    pub author: Option<String>,

    /// Flat or recursive enumeration of the source directory
    pub traversal: Traversal,

    /// Dedup key for files seen twice within one run
    pub dedup: DedupKey,

    /// Copy or drop files that match no category
    pub unclassified: UnclassifiedPolicy,

    /// Copy or move
    pub operation: FileOperation,

    /// Directories to exclude from scanning (absolute paths or folder names)
    pub exclude_dirs: Vec<PathBuf>,

    /// Worker threads (1 = sequential, 0 = one per core)
    pub threads: usize,

    /// Remove empty directories under the source and destinations after a run
    pub prune_empty_dirs: bool,

    /// Dry run mode - plan everything, write nothing
    pub dry_run: bool,

    /// Locale for month folder names (unset = English, "auto" = system locale)
    pub month_locale: Option<String>,

    /// RAW extensions
    pub raw_extensions: Vec<String>,

    /// JPEG extensions
    pub jpeg_extensions: Vec<String>,

    /// PNG extensions
    pub png_extensions: Vec<String>,

    /// Video extensions
    pub video_extensions: Vec<String>,

    /// Extensions probed for an embedded capture time
    pub metadata_extensions: Vec<String>,

    /// Extensions the metadata tagger is allowed to rewrite
    pub tag_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            destination_dirs: vec![],
            author: None,
            traversal: Traversal::default(),
            dedup: DedupKey::default(),
            unclassified: UnclassifiedPolicy::default(),
            operation: FileOperation::default(),
            exclude_dirs: vec![],
            threads: 1,
            prune_empty_dirs: true,
            dry_run: false,
            month_locale: None,
            raw_extensions: vec!["cr3".into(), "raw".into(), "dng".into()],
            jpeg_extensions: vec!["jpg".into(), "jpeg".into()],
            png_extensions: vec!["png".into()],
            video_extensions: vec!["mp4".into(), "mov".into(), "crm".into(), "mxf".into()],
            metadata_extensions: vec![
                "jpg".into(), "jpeg".into(), "png".into(), "tif".into(),
                "tiff".into(), "heic".into(), "heif".into(), "webp".into(),
                "dng".into(),
            ],
            tag_extensions: vec![
                "jpg".into(), "jpeg".into(), "png".into(), "tif".into(),
                "tiff".into(), "cr3".into(), "raw".into(), "dng".into(),
            ],
        }
    }
}

/// Lower-case an extension and strip a leading dot
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn list_contains(list: &[String], ext: &str) -> bool {
    let ext = normalize_extension(ext);
    list.iter().any(|e| normalize_extension(e) == ext)
}

impl Config {
    /// Check if the DateResolver should look for embedded capture time
    pub fn carries_capture_metadata(&self, ext: &str) -> bool {
        list_contains(&self.metadata_extensions, ext)
    }

    /// Check if the metadata tagger may touch files with this extension
    pub fn is_taggable(&self, ext: &str) -> bool {
        list_contains(&self.tag_extensions, ext)
    }

    /// Resolve the configured month locale to a concrete locale name
    ///
    /// Returns `None` for English month names.
    pub fn resolved_month_locale(&self) -> Option<String> {
        match self.month_locale.as_deref() {
            None | Some("") => None,
            Some("auto") => sys_locale::get_locale().map(|l| l.replace('-', "_")),
            Some(name) => Some(name.replace('-', "_")),
        }
    }

    /// Worker count after resolving `0` to the number of cores
    pub fn worker_count(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Files Sorter Configuration File
# This file uses TOML format (https://toml.io)

# Directory holding the files to sort
source_dir = "D:/Card"

# Destination roots; every file is copied into each of them
destination_dirs = [
    "D:/Photos",
    "E:/Backup/Photos",
]

# Written into the Artist field of copied images (remove to skip tagging)
author = "Jane Doe"

# "flat" (top-level files only) or "recursive"
traversal = "recursive"

# When the same file name shows up twice in one run:
# - basename: only the first one is copied
# - relative-path: files in different subfolders are both copied
dedup = "basename"

# Files matching no category: "copy" (into Unclassified/) or "drop"
unclassified = "copy"

# "copy" or "move" (move removes the source once every destination has it)
operation = "copy"

# Directories to skip while scanning (folder names or absolute paths)
exclude_dirs = [".thumbnails", "@eaDir"]

# Worker threads: 1 = sequential, 0 = one per core
threads = 1

# Remove empty directories after the run
prune_empty_dirs = true

# Plan everything, write nothing
dry_run = false

# Month folder names: leave unset for English, "auto" for the system
# locale, or a locale name such as "fr_FR"
# month_locale = "auto"

# Category tables (extensions without the dot, case-insensitive)
raw_extensions = ["cr3", "raw", "dng"]
jpeg_extensions = ["jpg", "jpeg"]
png_extensions = ["png"]
video_extensions = ["mp4", "mov", "crm", "mxf"]

# Formats probed for an embedded capture date
metadata_extensions = ["jpg", "jpeg", "png", "tif", "tiff", "heic", "heif", "webp", "dng"]

# Formats the author tagger may rewrite
tag_extensions = ["jpg", "jpeg", "png", "tif", "tiff", "cr3", "raw", "dng"]
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
