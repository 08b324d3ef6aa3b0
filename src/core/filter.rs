// LogKeeper - core/filter.rs
//
// Size and creation-period selection over located files.
// The predicates are pure; `stat_all` is the only step touching the disk.

use crate::core::cancel_requested;
use crate::core::model::{FileFailure, LogFile, Period, Scanned, SizeRange};
use crate::util::error::FileError;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Stat every path in `files`.
///
/// Files removed since enumeration are dropped quietly: they are no longer
/// part of the snapshot. Any other metadata failure is recorded in `skipped`.
pub fn stat_all(files: Vec<PathBuf>, cancel: Option<&Arc<AtomicBool>>) -> Scanned<Vec<LogFile>> {
    let mut result = Scanned::new(Vec::with_capacity(files.len()));

    for path in files {
        if cancel_requested(cancel) {
            result.cancelled = true;
            break;
        }
        match LogFile::stat(&path) {
            Ok(file) => result.value.push(file),
            Err(FileError::Vanished) => {
                tracing::trace!(file = %path.display(), "File vanished before stat");
            }
            Err(error) => {
                tracing::warn!(file = %path.display(), error = %error, "Cannot read metadata");
                result.skipped.push(FileFailure::new(path, error));
            }
        }
    }

    result
}

/// Keep files whose byte length lies in `range` (inclusive).
/// An inverted range keeps nothing.
pub fn filter_by_size(files: Vec<LogFile>, range: SizeRange) -> Vec<LogFile> {
    if range.is_inverted() {
        tracing::warn!(min = range.min, max = range.max, "Inverted size range matches nothing");
        return Vec::new();
    }
    files.into_iter().filter(|f| range.contains(f.size)).collect()
}

/// Keep files whose creation time lies in `period` (inclusive).
/// An inverted period keeps nothing.
pub fn filter_by_period(files: Vec<LogFile>, period: Period) -> Vec<LogFile> {
    if period.is_inverted() {
        tracing::warn!(
            start = %period.start,
            end = %period.end,
            "Inverted period matches nothing"
        );
        return Vec::new();
    }
    files
        .into_iter()
        .filter(|f| {
            let keep = period.contains(f.created);
            tracing::trace!(file = %f.path.display(), created = %f.created, keep, "Period check");
            keep
        })
        .collect()
}
