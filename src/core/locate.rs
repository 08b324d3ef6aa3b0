// LogKeeper - core/locate.rs
//
// Recursive enumeration of files whose name matches a glob.
//
// Only names are inspected here; size and creation time are read later by
// the filters so a file that disappears in between is skipped there.
// Inaccessible subdirectories are non-fatal and collected as warnings.
// Symlinked directories are not descended into, but a symlink to a regular
// file is listed under the link's own path.

use crate::util::constants;
use crate::util::error::LocateError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a locate operation.
#[derive(Debug, Clone)]
pub struct LocateConfig {
    /// Glob matched against the file name only (not the directory part).
    pub pattern: glob::Pattern,

    /// Maximum directory recursion depth below each root.
    pub max_depth: usize,

    /// Optional cancel flag, checked on every walker iteration. When set the
    /// walk stops and the partial result is returned with `cancelled = true`.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl LocateConfig {
    pub fn new(pattern: glob::Pattern) -> Self {
        Self {
            pattern,
            max_depth: constants::DEFAULT_MAX_DEPTH,
            cancel_flag: None,
        }
    }

    /// Same depth and cancel flag, different file-name glob.
    pub fn with_pattern(&self, pattern: glob::Pattern) -> Self {
        Self {
            pattern,
            ..self.clone()
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Files found by a locate operation.
#[derive(Debug, Default)]
pub struct Located {
    /// Matching files, sorted by path.
    pub files: Vec<PathBuf>,

    /// Human-readable notes about entries that could not be visited.
    pub warnings: Vec<String>,

    /// True when the walk stopped early on a cancel request.
    pub cancelled: bool,
}

// =============================================================================
// Locate
// =============================================================================

/// Locate matching files under a single required `root`.
///
/// # Fatal errors
/// Returns `Err` when the root does not exist (`DirectoryNotFound`), is not a
/// directory (`NotADirectory`), or cannot be accessed (`PermissionDenied`),
/// so "no logs" stays distinguishable from "bad input".
pub fn locate_files(root: &Path, config: &LocateConfig) -> Result<Located, LocateError> {
    check_root(root)?;
    let mut located = Located::default();
    walk_into(root, config, &mut located);
    located.files.sort();
    Ok(located)
}

/// Locate matching files under each of `roots`.
///
/// Roots that do not exist or are not directories are skipped with a debug
/// log; they are never an error.
pub fn locate_in_directories(roots: &[PathBuf], config: &LocateConfig) -> Located {
    let mut located = Located::default();
    for root in roots {
        if located.cancelled {
            break;
        }
        if let Err(e) = check_root(root) {
            tracing::debug!(root = %root.display(), reason = %e, "Skipping directory");
            continue;
        }
        walk_into(root, config, &mut located);
    }
    located.files.sort();
    located.files.dedup();
    located
}

/// Pre-flight validation of a root directory.
///
/// Uses `fs::metadata()` rather than `Path::is_dir()` so that access denied
/// is reported distinctly from not found.
fn check_root(root: &Path) -> Result<(), LocateError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(LocateError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(LocateError::PermissionDenied {
                path: root.to_path_buf(),
                source: e,
            })
        }
        Err(_) => Err(LocateError::DirectoryNotFound {
            path: root.to_path_buf(),
        }),
    }
}

fn walk_into(root: &Path, config: &LocateConfig, located: &mut Located) {
    let max_depth = config.max_depth.min(constants::ABSOLUTE_MAX_DEPTH);

    tracing::debug!(
        root = %root.display(),
        pattern = config.pattern.as_str(),
        max_depth,
        "Locate starting"
    );

    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter();

    let before = located.files.len();
    for entry_result in walker {
        if config.is_cancelled() {
            tracing::debug!("Locate cancelled by request");
            located.cancelled = true;
            break;
        }

        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Locate warning");
                located.warnings.push(msg);
                continue;
            }
        };

        let path = entry.path();
        let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && path.is_file());
        if !is_file {
            continue;
        }

        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => {
                located
                    .warnings
                    .push(format!("Skipping '{}': non-UTF-8 filename", path.display()));
                continue;
            }
        };

        if !config.pattern.matches(file_name) {
            tracing::trace!(file = file_name, "Not matched by pattern");
            continue;
        }

        located.files.push(path.to_path_buf());
    }

    tracing::debug!(
        root = %root.display(),
        found = located.files.len() - before,
        warnings = located.warnings.len(),
        "Locate complete"
    );
}

// =============================================================================
// Tests
// =============================================================================
