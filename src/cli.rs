//! CLI argument parsing with clap

use crate::config::{Config, DedupKey, FileOperation, Traversal, UnclassifiedPolicy};
use clap::Parser;
use std::path::PathBuf;

/// Files Sorter - copy camera files into dated, per-type folders
///
/// Sorts every file of a source directory into
/// `<destination>/<YYYY>/<Month YYYY>/<Category>/`, fanning each file out to
/// all destination roots. Existing files are never overwritten.
#[derive(Parser, Debug)]
#[command(name = "files-sorter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Source directory to sort
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Destination root (repeat for several roots)
    #[arg(short, long = "dest", num_args = 1..)]
    pub dest: Option<Vec<PathBuf>>,

    /// Author written into the Artist field of copied images
    #[arg(short, long, env = "FILES_SORTER_AUTHOR")]
    pub author: Option<String>,

    /// Only sort files directly inside the source directory
    #[arg(long)]
    pub flat: bool,

    /// Key used to skip repeated files within one run
    #[arg(long, value_enum)]
    pub dedup: Option<DedupKey>,

    /// Skip files that match no category instead of copying them
    #[arg(long)]
    pub drop_unclassified: bool,

    /// Remove each source file once every destination holds it
    #[arg(long = "move")]
    pub move_files: bool,

    /// Number of worker threads (1 = sequential, 0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Keep empty directories after the run
    #[arg(long)]
    pub no_prune: bool,

    /// Locale for month folder names (e.g. fr_FR, or "auto")
    #[arg(long)]
    pub month_locale: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Write the full run report as JSON to this file
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub sample_config: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_dir = source.clone();
        }
        if let Some(ref dest) = self.dest {
            config.destination_dirs = dest.clone();
        }
        if let Some(ref author) = self.author {
            config.author = Some(author.clone());
        }
        if self.flat {
            config.traversal = Traversal::Flat;
        }
        if let Some(dedup) = self.dedup {
            config.dedup = dedup;
        }
        if self.drop_unclassified {
            config.unclassified = UnclassifiedPolicy::Drop;
        }
        if self.move_files {
            config.operation = FileOperation::Move;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.no_prune {
            config.prune_empty_dirs = false;
        }
        if let Some(ref locale) = self.month_locale {
            config.month_locale = Some(locale.clone());
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_destinations() {
        let cli = Cli::try_parse_from([
            "files-sorter",
            "--source",
            "/card",
            "--dest",
            "/a",
            "--dest",
            "/b",
            "--author",
            "Jane Doe",
            "--flat",
            "--dedup",
            "relative-path",
        ])
        .unwrap();

        let config = cli.to_config();
        assert_eq!(config.source_dir, PathBuf::from("/card"));
        assert_eq!(
            config.destination_dirs,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert_eq!(config.author.as_deref(), Some("Jane Doe"));
        assert_eq!(config.traversal, Traversal::Flat);
        assert_eq!(config.dedup, DedupKey::RelativePath);
    }

    #[test]
    fn test_cli_overrides_file_settings() {
        let file_config = Config {
            destination_dirs: vec![PathBuf::from("/from-file")],
            threads: 8,
            author: Some("File Author".into()),
            ..Config::default()
        };
        let cli = Cli::try_parse_from(["files-sorter", "--threads", "2", "--move", "--no-prune"])
            .unwrap();

        let config = cli.merge_with_config(file_config);
        assert_eq!(config.threads, 2);
        assert_eq!(config.operation, FileOperation::Move);
        assert!(!config.prune_empty_dirs);
        assert_eq!(config.destination_dirs, vec![PathBuf::from("/from-file")]);
        assert_eq!(config.author.as_deref(), Some("File Author"));
    }
}
