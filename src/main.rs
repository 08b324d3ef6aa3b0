// LogKeeper - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation
// 3. Dispatch to the analysis engine
// 4. Rendering results on stdout (JSON or CSV)
//
// Diagnostics go to stderr; stdout carries only command results.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use logkeeper::app::engine::{EngineConfig, LogAnalysisEngine};
use logkeeper::app::upload::UploadPolicy;
use logkeeper::core::export::{self, OutputFormat};
use logkeeper::core::model::{Period, Scanned, SizeRange};
use logkeeper::platform::config;
use logkeeper::util::{self, error::Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// LogKeeper - search, analyse, archive and retire log files.
#[derive(Parser, Debug)]
#[command(name = "logkeeper", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Directory containing config.toml (defaults to the platform config dir).
    #[arg(long = "config-dir", global = true)]
    config_dir: Option<PathBuf>,

    /// Output format for results.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Json, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search log files under several directories for a literal pattern.
    Search {
        /// Directory to search; repeatable. Missing directories are skipped.
        #[arg(long = "dir", required = true)]
        dirs: Vec<PathBuf>,
        /// Literal text to look for.
        #[arg(long)]
        pattern: String,
    },
    /// Search log files under one directory for a literal pattern.
    SearchDir {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        pattern: String,
    },
    /// List log files whose size in bytes lies in [min, max].
    SearchSize {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        min: u64,
        #[arg(long)]
        max: u64,
    },
    /// Count, per line, the files containing it at least once.
    CountUnique {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Count, per line, the files containing it more than once.
    CountDuplicated {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Count log files created within a period.
    Count(PeriodArgs),
    /// Archive log files created within a period, then delete them.
    Archive(PeriodArgs),
    /// Delete log files created within a period.
    DeleteLogs(PeriodArgs),
    /// Delete archives created within a period.
    DeleteArchives(PeriodArgs),
    /// Upload files to an HTTP endpoint as multipart form posts.
    Upload {
        /// Endpoint receiving one POST per file.
        #[arg(long)]
        url: String,
        /// Keep uploading after a failure instead of stopping.
        #[arg(long = "continue-on-error")]
        continue_on_error: bool,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct PeriodArgs {
    #[arg(long)]
    dir: PathBuf,
    /// Start of the window: YYYY-MM-DD (start of day) or RFC 3339.
    #[arg(long, value_parser = parse_start)]
    start: DateTime<Utc>,
    /// End of the window: YYYY-MM-DD (end of day) or RFC 3339.
    #[arg(long, value_parser = parse_end)]
    end: DateTime<Utc>,
}

impl PeriodArgs {
    fn period(&self) -> Period {
        Period::new(self.start, self.end)
    }
}

fn parse_start(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_instant(s, |date| Period::from_dates(date, date).start)
}

fn parse_end(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_instant(s, |date| Period::from_dates(date, date).end)
}

fn parse_instant(
    s: &str,
    from_date: impl Fn(NaiveDate) -> DateTime<Utc>,
) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(from_date)
        .map_err(|e| format!("expected YYYY-MM-DD or RFC 3339, got '{s}': {e}"))
}

/// Engine settings from validated config; `--continue-on-error` wins over
/// the configured upload policy.
fn engine_config(config: config::AppConfig, continue_flag: bool) -> EngineConfig {
    let upload_policy = if continue_flag || config.upload_continue_on_error {
        UploadPolicy::Continue
    } else {
        UploadPolicy::FailFast
    };
    EngineConfig {
        log_pattern: config.log_pattern,
        archive_extension: config.archive_extension,
        max_depth: config.max_depth,
        upload_policy,
        upload_timeout: config.upload_timeout,
        cancel_flag: None,
    }
}

/// Whether a completed command left per-file failures behind.
enum Completion {
    Clean,
    WithFailures,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(config::default_config_dir);
    let (app_config, config_warnings) = config::load_config(&config_dir);

    util::logging::init(cli.debug, app_config.log_level.as_deref());
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    tracing::info!(
        version = util::constants::APP_VERSION,
        command = ?cli.command,
        "LogKeeper starting"
    );

    let continue_flag = matches!(
        cli.command,
        Command::Upload {
            continue_on_error: true,
            ..
        }
    );
    let engine_config = engine_config(app_config, continue_flag);

    let result = match LogAnalysisEngine::new(engine_config) {
        Ok(engine) => run(&engine, cli.command, cli.format.into()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(Completion::Clean) => ExitCode::SUCCESS,
        Ok(Completion::WithFailures) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(engine: &LogAnalysisEngine, command: Command, format: OutputFormat) -> Result<Completion> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Search { dirs, pattern } => {
            let found = engine.search_by_content_across_directories(&dirs, &pattern)?;
            emit_paths(&found, format, &mut out)
        }
        Command::SearchDir { dir, pattern } => {
            let found = engine.search_by_content_in_directory(&dir, &pattern)?;
            emit_paths(&found, format, &mut out)
        }
        Command::SearchSize { dir, min, max } => {
            let found = engine.search_by_size_range(&dir, SizeRange::new(min, max))?;
            emit_paths(&found, format, &mut out)
        }
        Command::CountUnique { files } => {
            let table = engine.count_unique_error_lines(&files);
            emit_table(&table, format, &mut out)
        }
        Command::CountDuplicated { files } => {
            let table = engine.count_duplicated_error_lines(&files);
            emit_table(&table, format, &mut out)
        }
        Command::Count(args) => {
            let count = engine.count_logs_in_period(&args.dir, args.period())?;
            match format {
                OutputFormat::Json => {
                    export::export_json(&serde_json::json!({ "count": count }), &mut out)?
                }
                OutputFormat::Csv => writeln!(out, "count\n{count}").map_err(export_io)?,
            }
            Ok(Completion::Clean)
        }
        Command::Archive(args) => {
            let outcome = engine.archive_logs_in_period(&args.dir, args.period())?;
            match format {
                OutputFormat::Json => export::export_json(&outcome, &mut out)?,
                OutputFormat::Csv => {
                    let archived: Vec<PathBuf> = outcome.archive.iter().cloned().collect();
                    export::export_paths_csv(&archived, &mut out)?;
                }
            }
            report_failures(outcome.skipped.iter().chain(&outcome.removal.failures));
            Ok(completion(outcome.skipped.is_empty() && outcome.removal.is_clean()))
        }
        Command::DeleteLogs(args) => {
            let report = engine.delete_logs_in_period(&args.dir, args.period())?;
            emit_report(&report, format, &mut out)
        }
        Command::DeleteArchives(args) => {
            let report = engine.delete_archives_in_period(&args.dir, args.period())?;
            emit_report(&report, format, &mut out)
        }
        Command::Upload { url, files, .. } => {
            let report = engine.upload_logs_to_endpoint(&files, &url).await?;
            emit_report(&report, format, &mut out)
        }
    }
}

fn emit_paths<W: Write>(
    found: &Scanned<Vec<PathBuf>>,
    format: OutputFormat,
    out: &mut W,
) -> Result<Completion> {
    match format {
        OutputFormat::Json => export::export_json(found, &mut *out)?,
        OutputFormat::Csv => {
            export::export_paths_csv(&found.value, &mut *out)?;
        }
    }
    report_failures(&found.skipped);
    Ok(completion(found.is_complete()))
}

fn emit_table<W: Write>(
    table: &Scanned<logkeeper::core::model::LineOccurrenceTable>,
    format: OutputFormat,
    out: &mut W,
) -> Result<Completion> {
    match format {
        OutputFormat::Json => export::export_json(table, &mut *out)?,
        OutputFormat::Csv => {
            export::export_table_csv(&table.value, &mut *out)?;
        }
    }
    report_failures(&table.skipped);
    Ok(completion(table.is_complete()))
}

fn emit_report<W: Write>(
    report: &logkeeper::core::model::BatchReport,
    format: OutputFormat,
    out: &mut W,
) -> Result<Completion> {
    match format {
        OutputFormat::Json => export::export_json(report, &mut *out)?,
        OutputFormat::Csv => {
            export::export_paths_csv(&report.completed, &mut *out)?;
        }
    }
    report_failures(&report.failures);
    Ok(completion(report.is_clean()))
}

fn report_failures<'a, I>(failures: I)
where
    I: IntoIterator<Item = &'a logkeeper::core::model::FileFailure>,
{
    for failure in failures {
        eprintln!("warning: {failure}");
    }
}

fn completion(clean: bool) -> Completion {
    if clean {
        Completion::Clean
    } else {
        Completion::WithFailures
    }
}

fn export_io(source: std::io::Error) -> logkeeper::util::error::LogKeeperError {
    logkeeper::util::error::ExportError::Io { source }.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_carries_validated_settings() {
        let app = config::AppConfig {
            log_pattern: "*.txt".to_string(),
            max_depth: 4,
            ..Default::default()
        };
        let engine = engine_config(app, false);
        assert_eq!(engine.log_pattern, "*.txt");
        assert_eq!(engine.max_depth, 4);
        assert_eq!(engine.upload_policy, UploadPolicy::FailFast);
    }

    #[test]
    fn test_continue_flag_or_config_selects_continue_policy() {
        let from_flag = engine_config(config::AppConfig::default(), true);
        assert_eq!(from_flag.upload_policy, UploadPolicy::Continue);

        let app = config::AppConfig {
            upload_continue_on_error: true,
            ..Default::default()
        };
        assert_eq!(engine_config(app, false).upload_policy, UploadPolicy::Continue);
    }
}
