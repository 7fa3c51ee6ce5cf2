//! Author tagging of copied files
//!
//! The engine only talks to the [`MetadataTagger`] trait. The bundled
//! [`ExifToolTagger`] shells out to ExifTool; embedders can plug in any
//! other backend.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Result of one tagging attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum TagOutcome {
    /// The author field was written
    Applied,
    /// The file kind cannot carry an author field (or is not ours to touch)
    Unsupported,
    /// The backend tried and failed
    Failed(String),
}

/// Writes an author/artist field into a file that was already copied
///
/// Implementations must only modify the file at `path`, and must be safe to
/// call from several worker threads.
pub trait MetadataTagger: Send + Sync {
    /// Stamp `author` into the file at `path`
    fn tag(&self, path: &Path, author: &str) -> TagOutcome;

    /// Whether the backend can work at all (checked once per run)
    fn is_available(&self) -> bool {
        true
    }
}

/// Tagger backed by the `exiftool` command line tool
#[derive(Debug, Clone)]
pub struct ExifToolTagger {
    program: PathBuf,
    available: OnceLock<bool>,
}

impl Default for ExifToolTagger {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ExifToolTagger {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            available: OnceLock::new(),
        }
    }
}

impl MetadataTagger for ExifToolTagger {
    fn tag(&self, path: &Path, author: &str) -> TagOutcome {
        if !self.is_available() {
            return TagOutcome::Failed(format!("{} not found", self.program.display()));
        }

        // -P keeps the modification time carried over from the source
        let output = Command::new(&self.program)
            .arg("-overwrite_original")
            .arg("-P")
            .arg(format!("-Artist={author}"))
            .arg(path)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                trace!(?path, "ExifTool wrote Artist");
                TagOutcome::Applied
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                debug!(?path, %stderr, "ExifTool refused to tag file");
                if stderr.contains("not yet supported") || stderr.contains("Can't currently write") {
                    TagOutcome::Unsupported
                } else {
                    TagOutcome::Failed(stderr.trim().to_string())
                }
            }
            Err(e) => TagOutcome::Failed(format!("failed to execute exiftool: {e}")),
        }
    }

    fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| Command::new(&self.program).arg("-ver").output().is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_fails_without_panicking() {
        let tagger = ExifToolTagger::new("/nonexistent/exiftool-for-tests");
        assert!(!tagger.is_available());
        match tagger.tag(Path::new("/tmp/a.jpg"), "Jane") {
            TagOutcome::Failed(reason) => assert!(reason.contains("not found")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&TagOutcome::Applied).unwrap(),
            r#"{"status":"applied"}"#
        );
        assert_eq!(
            serde_json::to_string(&TagOutcome::Failed("boom".into())).unwrap(),
            r#"{"status":"failed","reason":"boom"}"#
        );
    }
}
