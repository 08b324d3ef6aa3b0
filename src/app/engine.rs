// LogKeeper - app/engine.rs
//
// The analysis engine: the public entry points consumed by callers (the CLI
// in this crate, or any embedding service).
//
// The engine keeps configuration only. Every call re-derives its result
// from the filesystem as it is at call time; reads are idempotent and only
// archiving, deletion and upload have side effects.

use crate::app::upload::{UploadConfig, UploadPolicy, Uploader};
use crate::core::archive;
use crate::core::content;
use crate::core::filter;
use crate::core::frequency::{self, CountMode};
use crate::core::locate::{self, LocateConfig};
use crate::core::model::{
    ArchiveOutcome, BatchReport, LineOccurrenceTable, Period, Scanned, SizeRange,
};
use crate::core::retention;
use crate::util::constants;
use crate::util::error::{LogKeeperError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// Engine settings. Defaults select `*.log` files and `zip` archives.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Filename glob selecting log files.
    pub log_pattern: String,

    /// Extension of archives created and retired, without the leading dot.
    pub archive_extension: String,

    /// Maximum directory recursion depth.
    pub max_depth: usize,

    /// Behaviour of the remaining uploads after one fails.
    pub upload_policy: UploadPolicy,

    /// Per-request upload timeout.
    pub upload_timeout: Duration,

    /// Cooperative cancel flag shared by every operation; checked between
    /// files, never mid-file.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_pattern: constants::DEFAULT_LOG_PATTERN.to_string(),
            archive_extension: constants::DEFAULT_ARCHIVE_EXTENSION.to_string(),
            max_depth: constants::DEFAULT_MAX_DEPTH,
            upload_policy: UploadPolicy::default(),
            upload_timeout: Duration::from_secs(constants::DEFAULT_UPLOAD_TIMEOUT_SECS),
            cancel_flag: None,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Log search, counting, archiving, retention and upload over live directories.
#[derive(Debug, Clone)]
pub struct LogAnalysisEngine {
    locate: LocateConfig,
    archive_extension: String,
    upload: UploadConfig,
}

impl LogAnalysisEngine {
    /// Build an engine, rejecting an invalid log glob or archive extension.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let pattern = glob::Pattern::new(&config.log_pattern).map_err(|e| {
            LogKeeperError::invalid("log_pattern", format!("'{}': {e}", config.log_pattern))
        })?;

        let extension = config.archive_extension.trim_start_matches('.').to_string();
        if extension.is_empty() || extension.contains(['/', '\\']) {
            return Err(LogKeeperError::invalid(
                "archive_extension",
                format!("'{}' is not a file extension", config.archive_extension),
            ));
        }

        let locate = LocateConfig {
            pattern,
            max_depth: config.max_depth.clamp(1, constants::ABSOLUTE_MAX_DEPTH),
            cancel_flag: config.cancel_flag.clone(),
        };

        Ok(Self {
            locate,
            archive_extension: extension,
            upload: UploadConfig {
                policy: config.upload_policy,
                timeout: config.upload_timeout,
                cancel_flag: config.cancel_flag,
            },
        })
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Log files under any of `directories` whose content contains `pattern`.
    ///
    /// Directories that do not exist are skipped; an empty list is invalid.
    /// An empty `pattern` matches every readable file.
    pub fn search_by_content_across_directories(
        &self,
        directories: &[PathBuf],
        pattern: &str,
    ) -> Result<Scanned<Vec<PathBuf>>> {
        if directories.is_empty() {
            return Err(LogKeeperError::invalid("directories", "at least one directory is required"));
        }
        for dir in directories {
            validate_directory(dir)?;
        }

        let located = locate::locate_in_directories(directories, &self.locate);
        log_warnings(&located.warnings);

        let mut result =
            content::filter_by_content(located.files, pattern, self.locate.cancel_flag.as_ref());
        result.cancelled |= located.cancelled;

        tracing::debug!(
            directories = directories.len(),
            matches = result.value.len(),
            skipped = result.skipped.len(),
            "Content search across directories complete"
        );
        Ok(result)
    }

    /// Log files under the required `directory` whose content contains `pattern`.
    /// An empty `pattern` matches every readable file.
    pub fn search_by_content_in_directory(
        &self,
        directory: &Path,
        pattern: &str,
    ) -> Result<Scanned<Vec<PathBuf>>> {
        validate_directory(directory)?;

        let located = locate::locate_files(directory, &self.locate)?;
        log_warnings(&located.warnings);

        let mut result =
            content::filter_by_content(located.files, pattern, self.locate.cancel_flag.as_ref());
        result.cancelled |= located.cancelled;

        tracing::debug!(
            directory = %directory.display(),
            matches = result.value.len(),
            skipped = result.skipped.len(),
            "Content search complete"
        );
        Ok(result)
    }

    /// Log files under `directory` whose size lies in `range` (inclusive).
    pub fn search_by_size_range(
        &self,
        directory: &Path,
        range: SizeRange,
    ) -> Result<Scanned<Vec<PathBuf>>> {
        validate_directory(directory)?;

        let located = locate::locate_files(directory, &self.locate)?;
        log_warnings(&located.warnings);

        let stats = filter::stat_all(located.files, self.locate.cancel_flag.as_ref());
        let kept = filter::filter_by_size(stats.value, range);

        tracing::debug!(
            directory = %directory.display(),
            min = range.min,
            max = range.max,
            matches = kept.len(),
            "Size search complete"
        );
        Ok(Scanned {
            value: kept.into_iter().map(|f| f.path).collect(),
            skipped: stats.skipped,
            cancelled: stats.cancelled || located.cancelled,
        })
    }

    // -------------------------------------------------------------------------
    // Line counting
    // -------------------------------------------------------------------------

    /// Per line, the number of `files` containing it at least once.
    pub fn count_unique_error_lines(&self, files: &[PathBuf]) -> Scanned<LineOccurrenceTable> {
        frequency::count_lines(files, CountMode::Unique, self.locate.cancel_flag.as_ref())
    }

    /// Per line, the number of `files` containing it more than once.
    pub fn count_duplicated_error_lines(&self, files: &[PathBuf]) -> Scanned<LineOccurrenceTable> {
        frequency::count_lines(files, CountMode::Duplicated, self.locate.cancel_flag.as_ref())
    }

    // -------------------------------------------------------------------------
    // Period operations
    // -------------------------------------------------------------------------

    /// Number of log files under `directory` created within `period`.
    pub fn count_logs_in_period(&self, directory: &Path, period: Period) -> Result<usize> {
        validate_directory(directory)?;
        Ok(retention::count_in_period(directory, &self.locate, period)?)
    }

    /// Bundle the period's log files into one archive inside `directory`,
    /// then delete them.
    pub fn archive_logs_in_period(&self, directory: &Path, period: Period) -> Result<ArchiveOutcome> {
        validate_directory(directory)?;
        archive::archive_period(directory, &self.locate, period, &self.archive_extension)
    }

    /// Delete log files under `directory` created within `period`.
    pub fn delete_logs_in_period(&self, directory: &Path, period: Period) -> Result<BatchReport> {
        validate_directory(directory)?;
        Ok(retention::delete_in_period(directory, &self.locate, period)?)
    }

    /// Delete archives under `directory` created within `period`.
    pub fn delete_archives_in_period(&self, directory: &Path, period: Period) -> Result<BatchReport> {
        validate_directory(directory)?;
        Ok(archive::delete_archives_in_period(
            directory,
            &self.locate,
            period,
            &self.archive_extension,
        )?)
    }

    // -------------------------------------------------------------------------
    // Upload
    // -------------------------------------------------------------------------

    /// Send each of `files` to `endpoint` as a multipart upload, in order.
    pub async fn upload_logs_to_endpoint(
        &self,
        files: &[PathBuf],
        endpoint: &str,
    ) -> Result<BatchReport> {
        if endpoint.trim().is_empty() {
            return Err(LogKeeperError::invalid("endpoint", "must not be empty"));
        }
        let uploader = Uploader::new(endpoint, self.upload.clone())?;
        Ok(uploader.upload_all(files).await)
    }
}

// =============================================================================
// Input validation
// =============================================================================

fn validate_directory(directory: &Path) -> Result<()> {
    if directory.as_os_str().is_empty() {
        return Err(LogKeeperError::invalid("directory", "must not be empty"));
    }
    Ok(())
}

fn log_warnings(warnings: &[String]) {
    for warning in warnings {
        tracing::warn!(warning = %warning, "Locate warning");
    }
}
