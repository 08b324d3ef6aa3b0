// LogKeeper - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Fatal errors abort an operation; per-file errors (`FileError`) are
// recoverable and travel back to the caller as data.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogKeeper operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogKeeperError {
    /// A required directory could not be enumerated.
    Locate(LocateError),

    /// Archive creation failed. No source file has been deleted.
    Archive(ArchiveError),

    /// Upload setup failed before any file was attempted.
    Upload(UploadError),

    /// Rendering results failed.
    Export(ExportError),

    /// Caller-supplied input was rejected before touching the filesystem.
    InvalidInput { field: &'static str, reason: String },
}

impl fmt::Display for LogKeeperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locate(e) => write!(f, "Locate error: {e}"),
            Self::Archive(e) => write!(f, "Archive error: {e}"),
            Self::Upload(e) => write!(f, "Upload error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::InvalidInput { field, reason } => {
                write!(f, "Invalid input '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for LogKeeperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Locate(e) => Some(e),
            Self::Archive(e) => Some(e),
            Self::Upload(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::InvalidInput { .. } => None,
        }
    }
}

impl LogKeeperError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Locate errors
// ---------------------------------------------------------------------------

/// Errors raised when a required root directory is unusable.
#[derive(Debug)]
pub enum LocateError {
    /// The directory does not exist.
    DirectoryNotFound { path: PathBuf },

    /// The path exists but is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the directory.
    PermissionDenied { path: PathBuf, source: io::Error },
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryNotFound { path } => {
                write!(f, "Directory '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Path '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(
                    f,
                    "Permission denied accessing '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for LocateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<LocateError> for LogKeeperError {
    fn from(e: LocateError) -> Self {
        Self::Locate(e)
    }
}

// ---------------------------------------------------------------------------
// Per-file errors
// ---------------------------------------------------------------------------

/// A recoverable failure affecting a single file inside a batch.
#[derive(Debug)]
pub enum FileError {
    /// The file could not be opened or read.
    Unreadable { source: io::Error },

    /// The file disappeared between enumeration and use.
    Vanished,

    /// Removing the file failed.
    DeleteFailed { source: io::Error },

    /// Sending the file to the remote endpoint failed.
    Upload(UploadError),

    /// Skipped because an earlier failure stopped a fail-fast batch.
    NotAttempted,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { source } => write!(f, "unreadable: {source}"),
            Self::Vanished => write!(f, "file vanished before it could be used"),
            Self::DeleteFailed { source } => write!(f, "delete failed: {source}"),
            Self::Upload(e) => write!(f, "upload failed: {e}"),
            Self::NotAttempted => write!(f, "not attempted after an earlier failure"),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unreadable { source } => Some(source),
            Self::DeleteFailed { source } => Some(source),
            Self::Upload(e) => Some(e),
            _ => None,
        }
    }
}

impl FileError {
    /// Classify a read failure, treating `NotFound` as a vanished file.
    pub fn from_read(source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::Vanished,
            _ => Self::Unreadable { source },
        }
    }
}

// ---------------------------------------------------------------------------
// Archive errors
// ---------------------------------------------------------------------------

/// Errors raised while writing an archive. Every variant means the archive
/// was not produced and no source file was removed.
#[derive(Debug)]
pub enum ArchiveError {
    /// An archive with the target name is already present.
    AlreadyExists { path: PathBuf },

    /// The archive file could not be created.
    Create { path: PathBuf, source: io::Error },

    /// The zip writer rejected an entry or failed to finish.
    Write {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// A selected source file could not be read into the archive.
    Source { path: PathBuf, source: io::Error },

    /// The completed archive could not be moved into place.
    Finalize { path: PathBuf, source: io::Error },
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists { path } => {
                write!(f, "Archive '{}' already exists", path.display())
            }
            Self::Create { path, source } => {
                write!(f, "Cannot create archive '{}': {source}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "Cannot write archive '{}': {source}", path.display())
            }
            Self::Source { path, source } => {
                write!(f, "Cannot read '{}' into archive: {source}", path.display())
            }
            Self::Finalize { path, source } => {
                write!(f, "Cannot finalise archive '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create { source, .. } => Some(source),
            Self::Write { source, .. } => Some(source),
            Self::Source { source, .. } => Some(source),
            Self::Finalize { source, .. } => Some(source),
            Self::AlreadyExists { .. } => None,
        }
    }
}

impl From<ArchiveError> for LogKeeperError {
    fn from(e: ArchiveError) -> Self {
        Self::Archive(e)
    }
}

// ---------------------------------------------------------------------------
// Upload errors
// ---------------------------------------------------------------------------

/// Errors related to sending files to a remote endpoint.
#[derive(Debug)]
pub enum UploadError {
    /// The endpoint URL could not be parsed.
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be constructed.
    Client { source: reqwest::Error },

    /// The local file could not be read.
    Read { source: io::Error },

    /// The request failed at the transport level.
    Request { source: reqwest::Error },

    /// The endpoint answered with a non-2xx status.
    Status { status: u16, body: String },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url, reason } => write!(f, "Invalid URL '{url}': {reason}"),
            Self::Client { source } => write!(f, "Cannot build HTTP client: {source}"),
            Self::Read { source } => write!(f, "Cannot read file: {source}"),
            Self::Request { source } => write!(f, "Request failed: {source}"),
            Self::Status { status, body } if body.is_empty() => {
                write!(f, "Endpoint responded with HTTP {status}")
            }
            Self::Status { status, body } => {
                write!(f, "Endpoint responded with HTTP {status}: {body}")
            }
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Client { source } => Some(source),
            Self::Read { source } => Some(source),
            Self::Request { source } => Some(source),
            _ => None,
        }
    }
}

impl From<UploadError> for LogKeeperError {
    fn from(e: UploadError) -> Self {
        Self::Upload(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to rendering results as CSV or JSON.
#[derive(Debug)]
pub enum ExportError {
    /// CSV serialisation error.
    Csv { source: csv::Error },

    /// JSON serialisation error.
    Json { source: serde_json::Error },

    /// I/O error flushing the output.
    Io { source: io::Error },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv { source } => write!(f, "CSV export error: {source}"),
            Self::Json { source } => write!(f, "JSON export error: {source}"),
            Self::Io { source } => write!(f, "Export I/O error: {source}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Csv { source } => Some(source),
            Self::Json { source } => Some(source),
            Self::Io { source } => Some(source),
        }
    }
}

impl From<ExportError> for LogKeeperError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading. Never fatal: `load_config`
/// reports them as warnings and falls back to defaults.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for LogKeeper results.
pub type Result<T> = std::result::Result<T, LogKeeperError>;
