// LogKeeper - core/archive.rs
//
// Bundling a creation period of log files into one zip archive, and
// retiring archives by period.
//
// Ordering is write, finalise, rename, then delete: the archive is written
// to `<name>.partial`, renamed into place only once complete, and source
// files are removed only after the rename. Any failure before that point
// removes the partial file and leaves every source untouched. A source that
// disappears between selection and writing is left out of the archive and
// reported as vanished.

use crate::core::locate::LocateConfig;
use crate::core::model::{
    ArchiveOutcome, ArchivedEntry, BatchReport, FileFailure, LogFile, Period, Scanned,
};
use crate::core::retention;
use crate::util::constants;
use crate::util::error::{ArchiveError, FileError, LocateError, LogKeeperError};
use chrono::{DateTime, Datelike, Local, Timelike};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// File name of the archive covering `period`, e.g. `01_01_2024-31_01_2024.zip`.
pub fn archive_file_name(period: Period, extension: &str) -> String {
    format!("{}.{extension}", period.archive_stem())
}

/// Archive every file under `root` selected by `config` whose creation time
/// falls in `period`, then delete the archived sources.
///
/// The archive is created directly inside `root`. When nothing matches no
/// archive is created and `ArchiveOutcome::archive` is `None`.
pub fn archive_period(
    root: &Path,
    config: &LocateConfig,
    period: Period,
    extension: &str,
) -> Result<ArchiveOutcome, LogKeeperError> {
    let selected = retention::select_in_period(root, config, period)?;
    archive_selection(root, selected, period, extension)
}

/// Write `selected` into the period's archive under `root`, then delete the
/// sources that made it into the archive.
fn archive_selection(
    root: &Path,
    selected: Scanned<Vec<LogFile>>,
    period: Period,
    extension: &str,
) -> Result<ArchiveOutcome, LogKeeperError> {
    let mut skipped = selected.skipped;

    if selected.cancelled {
        tracing::info!(root = %root.display(), "Archive cancelled before writing");
        return Ok(ArchiveOutcome {
            skipped,
            removal: BatchReport {
                cancelled: true,
                ..BatchReport::default()
            },
            ..ArchiveOutcome::default()
        });
    }

    if selected.value.is_empty() {
        tracing::info!(root = %root.display(), "No files in period; no archive created");
        return Ok(ArchiveOutcome {
            skipped,
            ..ArchiveOutcome::default()
        });
    }

    let archive_path = root.join(archive_file_name(period, extension));
    if archive_path.exists() {
        return Err(ArchiveError::AlreadyExists { path: archive_path }.into());
    }

    let mut entries = assign_entry_names(&selected.value);
    let partial_path = partial_path_for(&archive_path);

    let vanished = match write_archive(&partial_path, &entries) {
        Ok(vanished) => vanished,
        Err(e) => {
            discard_partial(&partial_path);
            return Err(e.into());
        }
    };
    if !vanished.is_empty() {
        entries.retain(|e| !vanished.contains(&e.source));
        skipped.extend(
            vanished
                .into_iter()
                .map(|path| FileFailure::new(path, FileError::Vanished)),
        );
    }

    if entries.is_empty() {
        discard_partial(&partial_path);
        tracing::info!(root = %root.display(), "Every selected file vanished; no archive created");
        return Ok(ArchiveOutcome {
            skipped,
            ..ArchiveOutcome::default()
        });
    }

    if let Err(source) = fs::rename(&partial_path, &archive_path) {
        discard_partial(&partial_path);
        return Err(ArchiveError::Finalize {
            path: archive_path,
            source,
        }
        .into());
    }

    tracing::info!(
        archive = %archive_path.display(),
        entries = entries.len(),
        "Archive written"
    );

    let removal = retention::delete_files(entries.iter().map(|e| e.source.clone()), None);
    if !removal.failures.is_empty() {
        tracing::warn!(
            archive = %archive_path.display(),
            failed = removal.failures.len(),
            "Some archived sources could not be removed"
        );
    }

    Ok(ArchiveOutcome {
        archive: Some(archive_path),
        entries,
        skipped,
        removal,
    })
}

/// Delete archives under `root` whose creation time falls in `period`.
pub fn delete_archives_in_period(
    root: &Path,
    config: &LocateConfig,
    period: Period,
    extension: &str,
) -> Result<BatchReport, LocateError> {
    let archive_config = config.with_pattern(archive_pattern(extension));
    retention::delete_in_period(root, &archive_config, period)
}

/// Glob selecting archives with `extension`.
fn archive_pattern(extension: &str) -> glob::Pattern {
    let escaped = glob::Pattern::escape(extension);
    glob::Pattern::new(&format!("*.{escaped}")).unwrap_or_default()
}

/// Flattened entry names: each file is stored under its base name, and a
/// name already taken gets `_1`, `_2`, ... appended to its stem.
fn assign_entry_names(files: &[LogFile]) -> Vec<ArchivedEntry> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(files.len());

    for file in files {
        let base = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut name = base.clone();
        let mut suffix = 1u32;
        while taken.contains(&name) {
            name = suffixed_name(&base, suffix);
            suffix += 1;
        }
        if name != base {
            tracing::debug!(source = %file.path.display(), entry = %name, "Entry name collision");
        }

        taken.insert(name.clone());
        entries.push(ArchivedEntry {
            source: file.path.clone(),
            entry_name: name,
        });
    }

    entries
}

fn suffixed_name(base: &str, n: u32) -> String {
    let path = Path::new(base);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            format!("{}_{n}.{}", stem.to_string_lossy(), ext.to_string_lossy())
        }
        _ => format!("{base}_{n}"),
    }
}

fn partial_path_for(archive_path: &Path) -> PathBuf {
    let mut name = archive_path.as_os_str().to_os_string();
    name.push(".");
    name.push(constants::PARTIAL_ARCHIVE_SUFFIX);
    PathBuf::from(name)
}

fn discard_partial(partial_path: &Path) {
    if let Err(e) = fs::remove_file(partial_path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(file = %partial_path.display(), error = %e, "Cannot remove partial archive");
        }
    }
}

/// Write `entries` into a new zip at `dest` and flush it to disk.
///
/// Returns the sources that no longer existed when their turn came; they
/// have no entry in the archive.
fn write_archive(dest: &Path, entries: &[ArchivedEntry]) -> Result<Vec<PathBuf>, ArchiveError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|source| ArchiveError::Create {
            path: dest.to_path_buf(),
            source,
        })?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let mut vanished = Vec::new();

    for entry in entries {
        let source_err = |source: io::Error| ArchiveError::Source {
            path: entry.source.clone(),
            source,
        };
        let mut input = match File::open(&entry.source) {
            Ok(input) => input,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(source = %entry.source.display(), "Source vanished before archiving");
                vanished.push(entry.source.clone());
                continue;
            }
            Err(e) => return Err(source_err(e)),
        };
        let metadata = input.metadata().map_err(source_err)?;

        let mut options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .large_file(metadata.len() >= u64::from(u32::MAX));
        if let Some(stamp) = metadata.modified().ok().and_then(zip_timestamp) {
            options = options.last_modified_time(stamp);
        }

        zip.start_file(entry.entry_name.as_str(), options)
            .map_err(|source| ArchiveError::Write {
                path: dest.to_path_buf(),
                source,
            })?;
        io::copy(&mut input, &mut zip).map_err(source_err)?;
        tracing::trace!(source = %entry.source.display(), entry = %entry.entry_name, "Entry written");
    }

    let writer = zip.finish().map_err(|source| ArchiveError::Write {
        path: dest.to_path_buf(),
        source,
    })?;
    let finalize_err = |source: io::Error| ArchiveError::Finalize {
        path: dest.to_path_buf(),
        source,
    };
    let mut file = writer.into_inner().map_err(|e| finalize_err(e.into_error()))?;
    file.flush().map_err(finalize_err)?;
    file.sync_all().map_err(finalize_err)?;
    Ok(vanished)
}

/// Local-time zip timestamp; `None` outside the zip-representable range.
fn zip_timestamp(time: std::time::SystemTime) -> Option<zip::DateTime> {
    let local: DateTime<Local> = time.into();
    let year = u16::try_from(local.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};

    fn log_config() -> LocateConfig {
        LocateConfig::new(glob::Pattern::new("*.log").unwrap())
    }

    fn around_now() -> Period {
        let now = Utc::now();
        Period::new(now - Duration::days(1), now + Duration::days(1))
    }

    fn entry_names(archive: &Path) -> Vec<String> {
        let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn test_archive_file_name_from_dates() {
        let p = Period::from_dates(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        assert_eq!(archive_file_name(p, "zip"), "01_01_2024-31_01_2024.zip");
    }

    #[test]
    fn test_archive_then_sources_removed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "alpha\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let outcome = archive_period(dir.path(), &log_config(), around_now(), "zip").unwrap();
        let archive = outcome.archive.expect("archive created");
        assert_eq!(archive.parent(), Some(dir.path()));
        assert_eq!(entry_names(&archive), vec!["a.log"]);
        assert!(outcome.removal.is_clean());
        assert!(!dir.path().join("a.log").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(!partial_path_for(&archive).exists());
    }

    #[test]
    fn test_archived_content_is_preserved() {
        use std::io::Read;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "line one\nline two\n").unwrap();

        let outcome = archive_period(dir.path(), &log_config(), around_now(), "zip").unwrap();
        let mut zip = zip::ZipArchive::new(File::open(outcome.archive.unwrap()).unwrap()).unwrap();
        let mut content = String::new();
        zip.by_name("a.log").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "line one\nline two\n");
    }

    #[test]
    fn test_empty_period_creates_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "alpha\n").unwrap();
        let now = Utc::now();
        let past = Period::new(now - Duration::days(900), now - Duration::days(800));

        let outcome = archive_period(dir.path(), &log_config(), past, "zip").unwrap();
        assert!(outcome.archive.is_none());
        assert!(dir.path().join("a.log").exists());
        let zips = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref().unwrap().path().extension() == Some(std::ffi::OsStr::new("zip"))
            })
            .count();
        assert_eq!(zips, 0);
    }

    #[test]
    fn test_same_named_files_are_disambiguated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "root\n").unwrap();
        for sub in ["one", "two"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("app.log"), sub).unwrap();
        }

        let outcome = archive_period(dir.path(), &log_config(), around_now(), "zip").unwrap();
        assert_eq!(
            entry_names(&outcome.archive.unwrap()),
            vec!["app.log", "app_1.log", "app_2.log"]
        );
        assert_eq!(outcome.removal.completed.len(), 3);
    }

    #[test]
    fn test_existing_archive_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "alpha\n").unwrap();
        let period = around_now();
        let existing = dir.path().join(archive_file_name(period, "zip"));
        fs::write(&existing, "previous").unwrap();

        let result = archive_period(dir.path(), &log_config(), period, "zip");
        assert!(matches!(
            result,
            Err(LogKeeperError::Archive(ArchiveError::AlreadyExists { .. }))
        ));
        assert!(dir.path().join("a.log").exists(), "sources must survive");
        assert_eq!(fs::read_to_string(existing).unwrap(), "previous");
    }

    #[test]
    fn test_failed_write_deletes_no_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "alpha\n").unwrap();
        let period = around_now();
        // A directory squatting on the partial path makes creation fail.
        let archive_path = dir.path().join(archive_file_name(period, "zip"));
        fs::create_dir(partial_path_for(&archive_path)).unwrap();

        let result = archive_period(dir.path(), &log_config(), period, "zip");
        assert!(matches!(
            result,
            Err(LogKeeperError::Archive(ArchiveError::Create { .. }))
        ));
        assert!(dir.path().join("a.log").exists());
        assert!(!archive_path.exists());
    }

    fn selection(files: Vec<LogFile>) -> Scanned<Vec<LogFile>> {
        Scanned::new(files)
    }

    fn stat(path: &Path) -> LogFile {
        LogFile::stat(path).unwrap()
    }

    #[test]
    fn test_vanished_source_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.log");
        let gone = dir.path().join("gone.log");
        fs::write(&kept, "kept\n").unwrap();
        fs::write(&gone, "gone\n").unwrap();
        let files = vec![stat(&gone), stat(&kept)];
        fs::remove_file(&gone).unwrap();

        let outcome = archive_selection(dir.path(), selection(files), around_now(), "zip").unwrap();
        let archive = outcome.archive.expect("archive created");
        assert_eq!(entry_names(&archive), vec!["kept.log"]);
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].source, kept);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].path, gone);
        assert!(matches!(outcome.skipped[0].error, FileError::Vanished));
        assert_eq!(outcome.removal.completed, vec![kept.clone()]);
        assert!(!kept.exists());
    }

    #[test]
    fn test_all_sources_vanished_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone.log");
        fs::write(&gone, "gone\n").unwrap();
        let files = vec![stat(&gone)];
        fs::remove_file(&gone).unwrap();
        let period = around_now();

        let outcome = archive_selection(dir.path(), selection(files), period, "zip").unwrap();
        assert!(outcome.archive.is_none());
        assert_eq!(outcome.skipped.len(), 1);
        let archive_path = dir.path().join(archive_file_name(period, "zip"));
        assert!(!archive_path.exists());
        assert!(!partial_path_for(&archive_path).exists());
    }

    #[test]
    fn test_delete_archives_in_period_only_touches_archives() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.zip"), "z").unwrap();
        fs::create_dir(dir.path().join("deep")).unwrap();
        fs::write(dir.path().join("deep").join("older.zip"), "z").unwrap();
        fs::write(dir.path().join("live.log"), "l").unwrap();

        let report =
            delete_archives_in_period(dir.path(), &log_config(), around_now(), "zip").unwrap();
        assert_eq!(report.completed.len(), 2);
        assert!(dir.path().join("live.log").exists());
        assert!(!dir.path().join("old.zip").exists());
    }

    #[test]
    fn test_suffixed_name_without_extension() {
        assert_eq!(suffixed_name("syslog", 2), "syslog_2");
        assert_eq!(suffixed_name("app.log", 1), "app_1.log");
    }
}
