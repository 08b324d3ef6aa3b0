// LogKeeper - core/retention.rs
//
// Period-based selection, counting and deletion of files.
//
// Each deletion is its own unit of work: a failure is recorded and the
// remaining files are still attempted. Nothing is transactional.

use crate::core::cancel_requested;
use crate::core::filter;
use crate::core::locate::{self, LocateConfig};
use crate::core::model::{BatchReport, FileFailure, LogFile, Period, Scanned};
use crate::util::error::{FileError, LocateError};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Files under `root` matching `config.pattern` whose creation time falls in
/// `period`.
pub fn select_in_period(
    root: &Path,
    config: &LocateConfig,
    period: Period,
) -> Result<Scanned<Vec<LogFile>>, LocateError> {
    let located = locate::locate_files(root, config)?;
    for warning in &located.warnings {
        tracing::warn!(warning = %warning, "Locate warning");
    }

    if period.is_inverted() {
        tracing::warn!(
            start = %period.start,
            end = %period.end,
            "Inverted period matches nothing"
        );
        let mut empty = Scanned::new(Vec::new());
        empty.cancelled = located.cancelled;
        return Ok(empty);
    }

    let mut stats = filter::stat_all(located.files, config.cancel_flag.as_ref());
    stats.cancelled |= located.cancelled;
    stats.value = filter::filter_by_period(stats.value, period);
    Ok(stats)
}

/// Count files selected by [`select_in_period`]. Never modifies anything.
pub fn count_in_period(
    root: &Path,
    config: &LocateConfig,
    period: Period,
) -> Result<usize, LocateError> {
    let selected = select_in_period(root, config, period)?;
    tracing::debug!(root = %root.display(), count = selected.value.len(), "Counted files in period");
    Ok(selected.value.len())
}

/// Delete every file selected by [`select_in_period`].
pub fn delete_in_period(
    root: &Path,
    config: &LocateConfig,
    period: Period,
) -> Result<BatchReport, LocateError> {
    let selected = select_in_period(root, config, period)?;
    let mut report = delete_files(
        selected.value.into_iter().map(|f| f.path),
        config.cancel_flag.as_ref(),
    );
    report.cancelled |= selected.cancelled;
    report.failures.extend(selected.skipped);

    tracing::info!(
        root = %root.display(),
        deleted = report.completed.len(),
        failed = report.failures.len(),
        "Period deletion finished"
    );
    Ok(report)
}

/// Delete each of `paths` independently.
///
/// A file already gone is neither a success nor a failure; it is skipped.
pub fn delete_files<I>(paths: I, cancel: Option<&Arc<AtomicBool>>) -> BatchReport
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut report = BatchReport::default();

    for path in paths {
        if cancel_requested(cancel) {
            report.cancelled = true;
            break;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(file = %path.display(), "Deleted");
                report.completed.push(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(file = %path.display(), "Already gone");
            }
            Err(source) => {
                tracing::warn!(file = %path.display(), error = %source, "Delete failed");
                report
                    .failures
                    .push(FileFailure::new(path, FileError::DeleteFailed { source }));
            }
        }
    }

    report
}
