// LogKeeper - core/frequency.rs
//
// Per-line occurrence counting across a set of files.
//
// Lines are streamed, never materialised as a whole-file list. Each file
// builds its own set of qualifying lines, and that set is merged into the
// global table only once the file has been read to the end, so a file that
// fails halfway contributes nothing. Memory per file is bounded by its
// number of distinct lines.

use crate::core::cancel_requested;
use crate::core::model::{FileFailure, LineOccurrenceTable, Scanned};
use crate::platform;
use crate::util::error::FileError;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Which lines of a file count towards the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// Every distinct line, once per file.
    Unique,
    /// Only lines occurring more than once in the file, once per file.
    Duplicated,
}

/// Build a line occurrence table over `files` using `mode`.
///
/// For `Unique` the count of a line is the number of files containing it at
/// least once; for `Duplicated` it is the number of files containing it more
/// than once. Unreadable files are skipped and reported in `skipped`.
pub fn count_lines(
    files: &[PathBuf],
    mode: CountMode,
    cancel: Option<&Arc<AtomicBool>>,
) -> Scanned<LineOccurrenceTable> {
    let mut result = Scanned::new(LineOccurrenceTable::new());

    for path in files {
        if cancel_requested(cancel) {
            result.cancelled = true;
            break;
        }

        match qualifying_lines(path, mode) {
            Ok(lines) => {
                tracing::trace!(file = %path.display(), lines = lines.len(), ?mode, "File counted");
                for line in lines {
                    result.value.increment(line);
                }
            }
            Err(error) => {
                tracing::warn!(file = %path.display(), error = %error, "Skipping unreadable file");
                result.skipped.push(FileFailure::new(path.clone(), error));
            }
        }
    }

    if !result.skipped.is_empty() {
        tracing::warn!(
            skipped = result.skipped.len(),
            counted = files.len() - result.skipped.len(),
            "Line counting skipped unreadable files"
        );
    }

    result
}

/// Distinct lines of `path` that count under `mode`.
fn qualifying_lines(path: &Path, mode: CountMode) -> Result<Vec<String>, FileError> {
    let lines = platform::fs::open_lines(path)?;

    match mode {
        CountMode::Unique => {
            let mut seen = HashSet::new();
            for line in lines {
                seen.insert(line.map_err(FileError::from_read)?);
            }
            Ok(seen.into_iter().collect())
        }
        CountMode::Duplicated => {
            let mut groups: HashMap<String, usize> = HashMap::new();
            for line in lines {
                *groups.entry(line.map_err(FileError::from_read)?).or_insert(0) += 1;
            }
            Ok(groups
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|(line, _)| line)
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_unique_counts_files_not_occurrences() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.log", "E1\nE1\nE1\nE1\nE1\nE2\n");
        let b = write(dir.path(), "b.log", "E1\n");
        let c = write(dir.path(), "c.log", "E1\nE3\n");

        let table = count_lines(&[a, b, c], CountMode::Unique, None);
        assert!(table.is_complete());
        assert_eq!(table.value.get("E1"), 3);
        assert_eq!(table.value.get("E2"), 1);
        assert_eq!(table.value.get("E3"), 1);
        assert_eq!(table.value.len(), 3);
    }

    #[test]
    fn test_unique_never_exceeds_file_count() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "a.log", "x\nx\ny\n"),
            write(dir.path(), "b.log", "x\ny\ny\nz\n"),
        ];
        let table = count_lines(&files, CountMode::Unique, None);
        assert!(table.value.iter().all(|(_, n)| n <= files.len()));
    }

    #[test]
    fn test_duplicated_only_counts_repeated_lines() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.log", "E1\nE1\nE2\n");
        let b = write(dir.path(), "b.log", "E1\nE2\nE2\nE2\n");
        let c = write(dir.path(), "c.log", "E1\nE1\n");

        let table = count_lines(&[a, b, c], CountMode::Duplicated, None);
        assert_eq!(table.value.get("E1"), 2);
        assert_eq!(table.value.get("E2"), 1);
        assert_eq!(table.value.len(), 2);
    }

    #[test]
    fn test_keys_are_case_sensitive_and_terminator_free() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.log", "Error\r\nerror\n");
        let table = count_lines(&[a], CountMode::Unique, None);
        assert_eq!(table.value.get("Error"), 1);
        assert_eq!(table.value.get("error"), 1);
        assert_eq!(table.value.get("Error\r"), 0);
    }

    #[test]
    fn test_missing_file_is_skipped_and_others_still_count() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.log", "dup\ndup\n");
        let missing = dir.path().join("missing.log");

        let table = count_lines(&[missing.clone(), good], CountMode::Duplicated, None);
        assert_eq!(table.value.get("dup"), 1);
        assert_eq!(table.skipped.len(), 1);
        assert_eq!(table.skipped[0].path, missing);
    }

    #[test]
    fn test_latin1_bytes_are_counted_with_replacement() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        fs::write(&a, b"caf\xe9\ncaf\xe9\nok\n").unwrap();

        let table = count_lines(&[a], CountMode::Duplicated, None);
        assert!(table.is_complete());
        assert_eq!(table.value.get("caf\u{fffd}"), 1);
        assert_eq!(table.value.len(), 1);
    }

    #[test]
    fn test_byte_order_mark_does_not_split_keys() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.log", "\u{feff}ERROR x\n");
        let b = write(dir.path(), "b.log", "ERROR x\n");

        let table = count_lines(&[a, b], CountMode::Unique, None);
        assert_eq!(table.value.get("ERROR x"), 2);
        assert_eq!(table.value.len(), 1);
    }

    #[test]
    fn test_empty_file_list_yields_empty_table() {
        let table = count_lines(&[], CountMode::Unique, None);
        assert!(table.value.is_empty());
        assert!(table.is_complete());
    }
}
