//! Files Sorter - copy camera files into dated, per-type folders
//!
//! Command line front end: parses arguments, merges them over an optional
//! TOML configuration file, sets up logging, runs the sorter and prints the
//! per-month summary.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use files_sorter::media::normalize_path;
use files_sorter::{Category, Cli, Config, RunReport, Sorter};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored terminal output for the run summary

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!(
            "{}{} {}{}\n",
            left_pad,
            "╔".bold().stylize(),
            title.bold().stylize(),
            "╗".bold().stylize(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style("Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Files Sorter starting");

    let config = load_config(&cli, &exe_dir)?;
    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    validate_config(&config)?;

    let sorter = Sorter::new(config)?;
    let report = match sorter.run_configured() {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Sorting failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    print_summary(&report, cli.verbose);

    if let Some(ref path) = cli.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(report = %path.display(), "Run report written");
    }

    cli_output::print_separator();
    cli_output::print_log_path(&log_path.display().to_string());
    info!(log_file = %log_path.display(), "Sorting complete. Log saved to");

    if report.failed > 0 {
        std::process::exit(2);
    }
    Ok(())
}

/// Print the counters table and the failure list
fn print_summary(report: &RunReport, verbose: bool) {
    use cli_output::*;

    print_separator();
    print_title("Sorting complete");
    print_separator();

    print_blank();
    print_stat("Files seen", &report.files_seen.to_string(), CliTheme::ACCENT);
    if report.dry_run {
        print_stat("Planned", &report.planned.to_string(), CliTheme::SUCCESS);
    } else {
        print_stat("Copied", &report.copied.to_string(), CliTheme::SUCCESS);
    }
    print_stat(
        "Already present",
        &report.skipped_existing.to_string(),
        CliTheme::WARNING,
    );
    print_stat("Duplicates", &report.duplicates.to_string(), CliTheme::ACCENT);
    if report.dropped > 0 {
        print_stat("Dropped", &report.dropped.to_string(), CliTheme::HINT);
    }
    print_stat("Failed", &report.failed.to_string(), CliTheme::ERROR);
    if report.sources_removed > 0 {
        print_stat(
            "Sources removed",
            &report.sources_removed.to_string(),
            CliTheme::HINT,
        );
    }
    print_stat("Elapsed", &report.format_elapsed(), CliTheme::ACCENT);
    print_blank();

    if !report.counters.is_empty() {
        print_separator();
        for (bucket, categories) in report.counters.iter() {
            let line = Category::ALL
                .iter()
                .filter_map(|c| categories.get(c).map(|n| format!("{}: {}", c, n)))
                .collect::<Vec<_>>()
                .join(", ");
            print_key_value(&bucket.label, &line, None);
        }
        print_blank();
    }

    if verbose && report.tags_applied + report.tags_unsupported + report.tags_failed > 0 {
        print_hint(&format!(
            "Author tags: {} applied, {} unsupported, {} failed",
            report.tags_applied, report.tags_unsupported, report.tags_failed
        ));
    }

    for rejected in &report.rejected_destinations {
        print_warning(&format!(
            "Destination skipped: {} ({})",
            rejected.path.display(),
            rejected.reason
        ));
    }

    let failures = report.failures();
    if !failures.is_empty() {
        print_separator();
        print_error(&format!("Failed copies: {}", failures.len()));
        print_blank();
        for failure in &failures {
            print_key_value(
                &failure.source.display().to_string(),
                &failure.message,
                Some(CliTheme::ERROR),
            );
        }
    }

    if report.cancelled {
        print_separator();
        print_warning("Run was cancelled before every file was sorted");
    }

    if report.dry_run {
        print_separator();
        print_warning("Dry run: nothing was written");
    }
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        log_dir
            .join(&config_name)
            .join(format!("{}_{}.log", config_name, timestamp))
    } else {
        log_dir.join(format!("CLIRun_{}.log", timestamp))
    }
}

/// Resolve config path - supports shorthand syntax
///
/// `-C camera` finds `camera`, `camera.toml`, or `Config/camera.toml` next to
/// the executable.
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());
    let mut in_config_dir = exe_dir.join("Config").join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.destination_dirs.is_empty() {
        anyhow::bail!("No destination directory given (use --dest or destination_dirs)");
    }

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}

/// Validate configuration before sorting
fn validate_config(config: &Config) -> Result<()> {
    if !config.source_dir.is_dir() {
        anyhow::bail!(
            "Source directory does not exist: {}",
            config.source_dir.display()
        );
    }

    let source = normalize_path(&config.source_dir);
    for dest in &config.destination_dirs {
        if !dest.exists() {
            eprintln!("Destination directory does not exist: {}", dest.display());
        }
        if normalize_path(dest) == source {
            anyhow::bail!(
                "Destination {} is the source directory itself",
                dest.display()
            );
        }
    }

    Ok(())
}
