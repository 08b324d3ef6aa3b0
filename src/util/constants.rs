// LogKeeper - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogKeeper";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// File selection
// =============================================================================

/// Filename glob used to select log files when none is configured.
pub const DEFAULT_LOG_PATTERN: &str = "*.log";

/// Extension (without the dot) of archives produced and retired by LogKeeper.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "zip";

/// Maximum directory recursion depth during enumeration.
///
/// Enumeration is meant to cover "all subdirectories"; this only guards
/// against pathological trees.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Hard upper bound on max depth (prevents configuration mistakes).
pub const ABSOLUTE_MAX_DEPTH: usize = 256;

// =============================================================================
// Reading
// =============================================================================

/// Files at or above this size are memory-mapped for content matching
/// instead of being copied into a heap buffer.
pub const LARGE_FILE_THRESHOLD: u64 = 64 * 1024 * 1024; // 64 MB

/// Retry limits for transient I/O errors while reading.
pub const MAX_READ_RETRIES: u32 = 3;

/// Delay before each retry, indexed by attempt.
pub const READ_RETRY_DELAYS_MS: [u64; 3] = [50, 100, 200];

// =============================================================================
// Archiving
// =============================================================================

/// `chrono` format for each date in an archive file name (`DD_MM_YYYY`).
pub const ARCHIVE_DATE_FORMAT: &str = "%d_%m_%Y";

/// Suffix of the in-progress archive before it is renamed into place.
pub const PARTIAL_ARCHIVE_SUFFIX: &str = "partial";

// =============================================================================
// Upload
// =============================================================================

/// Multipart form field name carrying each uploaded file.
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Default per-request timeout for uploads.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Bounds for the configurable upload timeout.
pub const MIN_UPLOAD_TIMEOUT_SECS: u64 = 1;
pub const MAX_UPLOAD_TIMEOUT_SECS: u64 = 3_600;

/// Longest response body excerpt kept in an upload failure.
pub const MAX_ERROR_BODY_CHARS: usize = 512;

// =============================================================================
// Logging / config
// =============================================================================

/// Default log level when neither RUST_LOG, --debug, nor config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
