//! Error types for the files sorter

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for files sorter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the files sorter
///
/// Only the run-fatal variants (`InvalidSource`, `NoDestinations`,
/// `NoWritableDestination`, `Config`) ever escape [`crate::Sorter::run`].
/// Everything else is caught at the per-file boundary and recorded in the
/// [`crate::RunReport`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read embedded metadata from {path}: {message}")]
    MetadataRead { path: PathBuf, message: String },

    #[error("Failed to copy {source_path} to {destination}: {source}")]
    Copy {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to tag {path}: {message}")]
    Tag { path: PathBuf, message: String },

    #[error("Source directory {path} is not usable: {message}")]
    InvalidSource { path: PathBuf, message: String },

    #[error("No destination directory was given")]
    NoDestinations,

    #[error("None of the destination directories is writable")]
    NoWritableDestination,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run was cancelled")]
    Cancelled,
}

impl Error {
    /// Short machine-friendly name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::MetadataRead { .. } => "metadata-read",
            Error::Copy { .. } => "copy",
            Error::DirectoryCreate { .. } => "directory-create",
            Error::Tag { .. } => "tag",
            Error::InvalidSource { .. } => "invalid-source",
            Error::NoDestinations => "no-destinations",
            Error::NoWritableDestination => "no-writable-destination",
            Error::Config(_) => "config",
            Error::Cancelled => "cancelled",
        }
    }
}
