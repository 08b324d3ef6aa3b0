// LogKeeper - tests/e2e_engine.rs
//
// End-to-end tests for the analysis engine.
//
// These tests exercise the real filesystem, real walkdir traversal, real
// zip archives and real creation timestamps -- no mocks, no stubs. Since
// creation times cannot be backdated portably, "in period" windows are built
// around the current time and "out of period" windows lie years in the past.

use chrono::{Duration, Utc};
use logkeeper::app::engine::{EngineConfig, LogAnalysisEngine};
use logkeeper::core::model::{Period, SizeRange};
use logkeeper::util::error::{LocateError, LogKeeperError};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

// =============================================================================
// Helpers
// =============================================================================

fn engine() -> LogAnalysisEngine {
    LogAnalysisEngine::new(EngineConfig::default()).expect("default engine")
}

fn around_now() -> Period {
    let now = Utc::now();
    Period::new(now - Duration::days(1), now + Duration::days(1))
}

fn years_ago() -> Period {
    let now = Utc::now();
    Period::new(now - Duration::days(3 * 365), now - Duration::days(2 * 365))
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    let mut names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// `/logs` with `a.log` (100 bytes) and `b.log` (50 bytes).
fn scenario_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.log"), "a".repeat(100)).unwrap();
    fs::write(dir.path().join("b.log"), "b".repeat(50)).unwrap();
    dir
}

// =============================================================================
// Search
// =============================================================================

#[test]
fn e2e_size_search_selects_small_file() {
    let dir = scenario_dir();
    let found = engine()
        .search_by_size_range(dir.path(), SizeRange::new(0, 80))
        .unwrap();
    assert_eq!(names(&found.value), vec!["b.log"]);
    assert!(found.is_complete());
}

#[test]
fn e2e_zero_size_range_returns_only_empty_files() {
    let dir = scenario_dir();
    fs::write(dir.path().join("empty.log"), "").unwrap();
    let found = engine()
        .search_by_size_range(dir.path(), SizeRange::new(0, 0))
        .unwrap();
    assert_eq!(names(&found.value), vec!["empty.log"]);
    for path in &found.value {
        assert_eq!(fs::metadata(path).unwrap().len(), 0);
    }
}

#[test]
fn e2e_inverted_size_range_is_empty_not_error() {
    let dir = scenario_dir();
    let found = engine()
        .search_by_size_range(dir.path(), SizeRange::new(80, 0))
        .unwrap();
    assert!(found.value.is_empty());
}

#[test]
fn e2e_content_search_in_directory_is_recursive() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.log"), "INFO ok\nERROR db timeout\n").unwrap();
    fs::write(dir.path().join("other.log"), "INFO fine\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "ERROR db timeout\n").unwrap();
    fs::create_dir(dir.path().join("2024")).unwrap();
    fs::write(dir.path().join("2024").join("old.log"), "ERROR db timeout\n").unwrap();

    let found = engine()
        .search_by_content_in_directory(dir.path(), "ERROR db")
        .unwrap();
    assert_eq!(names(&found.value), vec!["app.log", "old.log"]);
}

#[test]
fn e2e_content_search_skips_missing_directories_and_decodes_lossily() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::write(first.path().join("a.log"), "needle\n").unwrap();
    fs::write(second.path().join("b.log"), "hay needle hay\n").unwrap();
    fs::write(second.path().join("c.log"), "hay\n").unwrap();
    fs::write(second.path().join("latin1.log"), b"caf\xe9 needle\n").unwrap();
    fs::write(second.path().join("binary.log"), [0xffu8, 0xfe, 0xfd]).unwrap();

    let dirs = vec![
        first.path().to_path_buf(),
        PathBuf::from("/nonexistent/logkeeper/e2e"),
        second.path().to_path_buf(),
    ];
    let found = engine()
        .search_by_content_across_directories(&dirs, "needle")
        .unwrap();
    assert_eq!(names(&found.value), vec!["a.log", "b.log", "latin1.log"]);
    assert!(found.is_complete());
}

#[test]
fn e2e_single_missing_directory_is_not_found() {
    let result = engine().search_by_content_in_directory(Path::new("/nonexistent/logkeeper"), "x");
    assert!(
        matches!(
            result,
            Err(LogKeeperError::Locate(LocateError::DirectoryNotFound { .. }))
        ),
        "expected DirectoryNotFound, got {result:?}"
    );
}

// =============================================================================
// Line counting
// =============================================================================

#[test]
fn e2e_unique_and_duplicated_counts() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.log");
    let b = dir.path().join("b.log");
    fs::write(&a, "E timeout\nE timeout\nE disk\n").unwrap();
    fs::write(&b, "E timeout\nE disk\nE disk\nE auth\n").unwrap();
    let files = vec![a, b];

    let unique = engine().count_unique_error_lines(&files);
    assert_eq!(unique.value.get("E timeout"), 2);
    assert_eq!(unique.value.get("E disk"), 2);
    assert_eq!(unique.value.get("E auth"), 1);

    let duplicated = engine().count_duplicated_error_lines(&files);
    assert_eq!(duplicated.value.get("E timeout"), 1);
    assert_eq!(duplicated.value.get("E disk"), 1);
    assert_eq!(duplicated.value.get("E auth"), 0);
    assert_eq!(duplicated.value.len(), 2);
}

#[test]
fn e2e_duplicated_lines_repeat_in_some_contributing_file() {
    let dir = tempfile::tempdir().unwrap();
    let contents = ["x\ny\nx\n", "y\nz\nz\nz\n", "w\n"];
    let files: Vec<PathBuf> = contents
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let p = dir.path().join(format!("{i}.log"));
            fs::write(&p, c).unwrap();
            p
        })
        .collect();

    let duplicated = engine().count_duplicated_error_lines(&files);
    for (line, _) in duplicated.value.iter() {
        let repeats_somewhere = contents
            .iter()
            .any(|c| c.lines().filter(|l| *l == line).count() > 1);
        assert!(repeats_somewhere, "'{line}' never repeats in a file");
    }
}

#[test]
fn e2e_counting_reports_unreadable_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.log");
    fs::write(&good, "E\nE\n").unwrap();
    let missing = dir.path().join("missing.log");

    let duplicated = engine().count_duplicated_error_lines(&[missing.clone(), good]);
    assert_eq!(duplicated.value.get("E"), 1);
    assert_eq!(duplicated.skipped.len(), 1);
    assert_eq!(duplicated.skipped[0].path, missing);
}

// =============================================================================
// Period operations
// =============================================================================

#[test]
fn e2e_count_in_period() {
    let dir = scenario_dir();
    assert_eq!(engine().count_logs_in_period(dir.path(), around_now()).unwrap(), 2);
    assert_eq!(engine().count_logs_in_period(dir.path(), years_ago()).unwrap(), 0);
}

#[test]
fn e2e_archive_period_bundles_then_removes_sources() {
    let dir = scenario_dir();
    let period = around_now();

    let outcome = engine().archive_logs_in_period(dir.path(), period).unwrap();
    let archive = outcome.archive.clone().expect("archive created");
    let archive_name = format!("{}.zip", period.archive_stem());

    assert_eq!(archive, dir.path().join(&archive_name));
    assert_eq!(dir_listing(dir.path()), vec![archive_name]);
    assert!(outcome.removal.is_clean());

    // Re-scanning the period finds nothing left to archive.
    assert_eq!(engine().count_logs_in_period(dir.path(), period).unwrap(), 0);

    // The archive holds exactly the selected files with their content.
    let mut zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    let mut entries: Vec<String> = zip.file_names().map(str::to_string).collect();
    entries.sort();
    assert_eq!(entries, vec!["a.log", "b.log"]);
    let mut content = String::new();
    zip.by_name("b.log")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "b".repeat(50));
}

#[test]
fn e2e_archive_with_no_matches_leaves_directory_untouched() {
    let dir = scenario_dir();
    let before = dir_listing(dir.path());
    let outcome = engine().archive_logs_in_period(dir.path(), years_ago()).unwrap();
    assert!(outcome.archive.is_none());
    assert_eq!(dir_listing(dir.path()), before);
}

#[test]
fn e2e_delete_logs_with_inverted_period_changes_nothing() {
    let dir = scenario_dir();
    let before = dir_listing(dir.path());
    let p = around_now();
    let report = engine()
        .delete_logs_in_period(dir.path(), Period::new(p.end, p.start))
        .unwrap();
    assert!(report.completed.is_empty());
    assert_eq!(dir_listing(dir.path()), before);
}

#[test]
fn e2e_delete_logs_in_period() {
    let dir = scenario_dir();
    fs::write(dir.path().join("keep.zip"), "z").unwrap();
    let report = engine().delete_logs_in_period(dir.path(), around_now()).unwrap();
    assert_eq!(names(&report.completed), vec!["a.log", "b.log"]);
    assert_eq!(dir_listing(dir.path()), vec!["keep.zip"]);
}

#[test]
fn e2e_delete_archives_after_archiving() {
    let dir = scenario_dir();
    let period = around_now();
    engine().archive_logs_in_period(dir.path(), period).unwrap();
    fs::write(dir.path().join("fresh.log"), "new").unwrap();

    let report = engine().delete_archives_in_period(dir.path(), period).unwrap();
    assert_eq!(report.completed.len(), 1);
    assert!(report.is_clean());
    assert_eq!(dir_listing(dir.path()), vec!["fresh.log"]);
}

#[test]
fn e2e_custom_extensions_from_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("service.txt"), "x").unwrap();
    fs::write(dir.path().join("ignored.log"), "x").unwrap();

    let engine = LogAnalysisEngine::new(EngineConfig {
        log_pattern: "*.txt".to_string(),
        archive_extension: "bundle".to_string(),
        ..Default::default()
    })
    .unwrap();
    let outcome = engine.archive_logs_in_period(dir.path(), around_now()).unwrap();
    let archive = outcome.archive.unwrap();
    assert_eq!(archive.extension().unwrap(), "bundle");
    assert!(dir.path().join("ignored.log").exists());
    assert!(!dir.path().join("service.txt").exists());
}

#[test]
fn e2e_cancelled_engine_does_no_work() {
    let dir = scenario_dir();
    let engine = LogAnalysisEngine::new(EngineConfig {
        cancel_flag: Some(Arc::new(AtomicBool::new(true))),
        ..Default::default()
    })
    .unwrap();

    let report = engine.delete_logs_in_period(dir.path(), around_now()).unwrap();
    assert!(report.cancelled);
    assert!(report.completed.is_empty());
    assert_eq!(dir_listing(dir.path()), vec!["a.log", "b.log"]);
}
