// LogKeeper - platform/fs.rs
//
// Filesystem helpers shared by the core scanners: creation-time resolution
// and text reading with transient-error retries.

use crate::util::constants;
use crate::util::error::FileError;
use chrono::{DateTime, Utc};
use std::fs::{self, File, Metadata};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

/// Resolve the creation timestamp recorded in `metadata`.
///
/// Filesystems that do not record a birth time (some Linux mounts, older
/// kernels) fall back to the last-modification time, which is the closest
/// stable approximation available. Returns `None` only when neither is
/// readable.
pub fn creation_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    match metadata.created() {
        Ok(created) => Some(DateTime::<Utc>::from(created)),
        Err(e) => {
            tracing::trace!(error = %e, "Birth time unavailable, using modification time");
            metadata.modified().ok().map(DateTime::<Utc>::from)
        }
    }
}

/// Read `path` as text and hand the content to `f`.
///
/// Invalid UTF-8 sequences decode to U+FFFD and a leading byte-order mark
/// is dropped, so only I/O failures make a file unusable. Files at or above
/// `LARGE_FILE_THRESHOLD` are memory-mapped; valid UTF-8 is then borrowed
/// from the map rather than copied. Smaller files are read with
/// transient-error retries.
pub fn with_text<F, R>(path: &Path, f: F) -> Result<R, FileError>
where
    F: FnOnce(&str) -> R,
{
    let file = File::open(path).map_err(FileError::from_read)?;
    let size = file.metadata().map_err(FileError::from_read)?.len();

    if size >= constants::LARGE_FILE_THRESHOLD {
        // SAFETY: the map is read-only and dropped before returning. External
        // truncation while mapped is accepted as a risk of scanning live logs.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(FileError::from_read)?;
        let text = String::from_utf8_lossy(&mmap);
        return Ok(f(strip_bom(&text)));
    }
    drop(file);

    let bytes = read_with_retry(path).map_err(FileError::from_read)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(f(strip_bom(&text)))
}

/// Open `path` for line-by-line streaming.
///
/// Lines are decoded like [`with_text`]: lossy UTF-8, `\n` or `\r\n`
/// terminator stripped, byte-order mark removed from the first line.
pub fn open_lines(path: &Path) -> Result<LossyLines, FileError> {
    let file = File::open(path).map_err(FileError::from_read)?;
    Ok(LossyLines {
        reader: BufReader::new(file),
        buf: Vec::new(),
        first: true,
    })
}

/// Iterator over the lines of a file, see [`open_lines`].
pub struct LossyLines {
    reader: BufReader<File>,
    buf: Vec<u8>,
    first: bool,
}

impl Iterator for LossyLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                let decoded = String::from_utf8_lossy(&self.buf);
                let line = if std::mem::take(&mut self.first) {
                    strip_bom(&decoded).to_string()
                } else {
                    decoded.into_owned()
                };
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Read a small file with transient-error retries.
fn read_with_retry(path: &Path) -> io::Result<Vec<u8>> {
    let mut last_err: Option<io::Error> = None;

    for (attempt, delay_ms) in constants::READ_RETRY_DELAYS_MS
        .iter()
        .enumerate()
        .take(constants::MAX_READ_RETRIES as usize)
    {
        match fs::read(path) {
            Ok(bytes) => return Ok(bytes),
            Err(e) if is_transient_error(&e) => {
                tracing::debug!(
                    file = %path.display(),
                    attempt = attempt + 1,
                    error = %e,
                    "Transient I/O error, retrying"
                );
                std::thread::sleep(Duration::from_millis(*delay_ms));
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::other("Unknown read error")))
}

/// Returns true for transient I/O errors that are worth retrying.
fn is_transient_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}
