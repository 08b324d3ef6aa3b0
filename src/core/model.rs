// LogKeeper - core/model.rs
//
// Core data model types shared across all layers. Values here are built
// fresh per call; nothing is cached between operations.

use crate::util::constants;
use crate::util::error::FileError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// Log file
// =============================================================================

/// A file observed on disk at query time.
///
/// Identity is the path alone; size and creation time are whatever the
/// filesystem reported when the file was stat'ed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFile {
    /// Full path to the file.
    pub path: PathBuf,

    /// File size in bytes.
    pub size: u64,

    /// Creation timestamp (modification time where birth time is unrecorded).
    pub created: DateTime<Utc>,
}

impl LogFile {
    /// Stat `path`. A file removed since enumeration yields `FileError::Vanished`.
    pub fn stat(path: &Path) -> Result<Self, FileError> {
        let metadata = std::fs::metadata(path).map_err(FileError::from_read)?;
        let created =
            crate::platform::fs::creation_time(&metadata).ok_or_else(|| FileError::Unreadable {
                source: std::io::Error::other("no creation or modification time recorded"),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            created,
        })
    }
}

// =============================================================================
// Selection windows
// =============================================================================

/// Inclusive creation-time window `[start, end]`.
///
/// An inverted window (`start > end`) is legal and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whole-day window in local time: `start` 00:00:00 through the last
    /// nanosecond of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        let start_of = start.and_time(NaiveTime::MIN);
        let end_of =
            end.and_time(NaiveTime::MIN) + chrono::Duration::days(1) - chrono::Duration::nanoseconds(1);
        Self {
            start: local_to_utc(start_of),
            end: local_to_utc(end_of),
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Archive file stem for this window: `DD_MM_YYYY-DD_MM_YYYY`, using
    /// local calendar dates.
    pub fn archive_stem(&self) -> String {
        format!(
            "{}-{}",
            self.start
                .with_timezone(&Local)
                .format(constants::ARCHIVE_DATE_FORMAT),
            self.end
                .with_timezone(&Local)
                .format(constants::ARCHIVE_DATE_FORMAT)
        )
    }
}

/// Interpret a naive local time, choosing the earlier instant on DST overlap
/// and treating a DST gap as UTC.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// Inclusive byte-length window `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeRange {
    pub min: u64,
    pub max: u64,
}

impl SizeRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, size: u64) -> bool {
        (self.min..=self.max).contains(&size)
    }
}

// =============================================================================
// Line occurrence table
// =============================================================================

/// Mapping from exact line text to the number of files it was counted in.
///
/// Keys are case-sensitive and compared byte-for-byte after the line
/// terminator is stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LineOccurrenceTable {
    counts: HashMap<String, usize>,
}

impl LineOccurrenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `line`, zero when absent.
    pub fn get(&self, line: &str) -> usize {
        self.counts.get(line).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Increment the count of `line` by one.
    pub fn increment(&mut self, line: String) {
        *self.counts.entry(line).or_insert(0) += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Entries ordered by count descending, then line ascending.
    pub fn sorted(&self) -> Vec<(&str, usize)> {
        let mut rows: Vec<_> = self.iter().collect();
        rows.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        rows
    }
}

// =============================================================================
// Results carrying recoverable failures
// =============================================================================

/// A per-file failure recorded while the rest of the batch carried on.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: FileError,
}

impl FileFailure {
    pub fn new(path: impl Into<PathBuf>, error: FileError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.path.display(), self.error)
    }
}

impl Serialize for FileFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FileFailure", 2)?;
        s.serialize_field("path", &self.path)?;
        s.serialize_field("error", &self.error.to_string())?;
        s.end()
    }
}

/// Result of a read-only scan: the data plus every file that was skipped.
#[derive(Debug, Serialize)]
pub struct Scanned<T> {
    pub value: T,

    /// Files that could not be read; they contributed nothing to `value`.
    pub skipped: Vec<FileFailure>,

    /// True when the scan stopped early on a cancel request.
    pub cancelled: bool,
}

impl<T> Scanned<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            skipped: Vec::new(),
            cancelled: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && !self.cancelled
    }
}

/// Outcome of a batch of independent per-file side effects
/// (deletions, uploads).
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Files the operation succeeded on, in processing order.
    pub completed: Vec<PathBuf>,

    /// Files the operation failed on, in processing order.
    pub failures: Vec<FileFailure>,

    /// True when the batch stopped early on a cancel request.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// One source file written into an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedEntry {
    pub source: PathBuf,

    /// Name inside the archive (base name, disambiguated on collision).
    pub entry_name: String,
}

/// Outcome of archiving a period.
#[derive(Debug, Default, Serialize)]
pub struct ArchiveOutcome {
    /// Path of the created archive; `None` when nothing matched the period.
    pub archive: Option<PathBuf>,

    pub entries: Vec<ArchivedEntry>,

    /// Files in the period whose metadata could not be read; not archived.
    pub skipped: Vec<FileFailure>,

    /// Removal of the archived sources, run only after the archive was
    /// completely written.
    pub removal: BatchReport,
}
