// LogKeeper - core/content.rs
//
// Literal substring search over file content. No regex semantics: the
// pattern is matched against the decoded text, where undecodable bytes
// read as U+FFFD. An empty pattern matches every readable file.

use crate::core::cancel_requested;
use crate::core::model::{FileFailure, Scanned};
use crate::platform;
use crate::util::error::FileError;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Returns whether `pattern` occurs anywhere in the content of `path`.
pub fn file_contains(path: &Path, pattern: &str) -> Result<bool, FileError> {
    platform::fs::with_text(path, |text| text.contains(pattern))
}

/// Keep the files of `files` whose content contains `pattern`.
///
/// Unreadable files are skipped and recorded in `skipped`; they never abort
/// the batch. `cancel` is checked between files.
pub fn filter_by_content(
    files: Vec<PathBuf>,
    pattern: &str,
    cancel: Option<&Arc<AtomicBool>>,
) -> Scanned<Vec<PathBuf>> {
    let mut result = Scanned::new(Vec::new());

    for path in files {
        if cancel_requested(cancel) {
            result.cancelled = true;
            break;
        }
        match file_contains(&path, pattern) {
            Ok(true) => {
                tracing::trace!(file = %path.display(), "Content matched");
                result.value.push(path);
            }
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(file = %path.display(), error = %error, "Skipping unreadable file");
                result.skipped.push(FileFailure::new(path, error));
            }
        }
    }

    result
}
