// LogKeeper - platform/config.rs
//
// Platform config directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolve the platform-appropriate configuration directory.
///
/// Falls back to the current directory if platform dirs cannot be determined.
pub fn default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
        let config_dir = proj_dirs.config_dir().to_path_buf();
        tracing::debug!(config = %config_dir.display(), "Platform config directory resolved");
        config_dir
    } else {
        tracing::warn!("Could not determine platform directories, using current directory");
        PathBuf::from(".")
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[search]` section.
    pub search: SearchSection,
    /// `[archive]` section.
    pub archive: ArchiveSection,
    /// `[upload]` section.
    pub upload: UploadSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[search]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Filename glob selecting log files.
    pub log_pattern: Option<String>,
    /// Maximum directory recursion depth.
    pub max_depth: Option<usize>,
}

/// `[archive]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ArchiveSection {
    /// Archive file extension.
    pub extension: Option<String>,
}

/// `[upload]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// "fail-fast" or "continue".
    pub policy: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Plain values only; the caller turns these into engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Filename glob selecting log files (already checked to compile).
    pub log_pattern: String,

    /// Archive extension without the leading dot.
    pub archive_extension: String,

    /// Maximum directory recursion depth.
    pub max_depth: usize,

    /// Keep uploading after a failed file instead of stopping.
    pub upload_continue_on_error: bool,

    /// Per-request upload timeout.
    pub upload_timeout: Duration,

    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_pattern: constants::DEFAULT_LOG_PATTERN.to_string(),
            archive_extension: constants::DEFAULT_ARCHIVE_EXTENSION.to_string(),
            max_depth: constants::DEFAULT_MAX_DEPTH,
            upload_continue_on_error: false,
            upload_timeout: Duration::from_secs(constants::DEFAULT_UPLOAD_TIMEOUT_SECS),
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from `config_dir`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file yields defaults with no warnings. An unreadable or
/// unparseable file yields defaults plus a warning; the error is surfaced
/// but never stops the program.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let raw = match read_raw(&config_path) {
        Ok(raw) => raw,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");
    let config = validate(raw, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate each field against named constants, accumulating all problems.
fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();

    // -- Search: log_pattern --
    if let Some(pattern) = raw.search.log_pattern {
        match glob::Pattern::new(&pattern) {
            Ok(_) => config.log_pattern = pattern,
            Err(e) => warnings.push(format!(
                "[search] log_pattern = \"{pattern}\" is not a valid glob ({e}). Using default ({}).",
                constants::DEFAULT_LOG_PATTERN,
            )),
        }
    }

    // -- Search: max_depth --
    if let Some(depth) = raw.search.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            warnings.push(
                ConfigError::ValueOutOfRange {
                    field: "[search] max_depth".to_string(),
                    value: depth.to_string(),
                    expected: format!(
                        "1-{} (using default {})",
                        constants::ABSOLUTE_MAX_DEPTH,
                        constants::DEFAULT_MAX_DEPTH
                    ),
                }
                .to_string(),
            );
        }
    }

    // -- Archive: extension --
    if let Some(ext) = raw.archive.extension {
        let trimmed = ext.trim_start_matches('.');
        if !trimmed.is_empty() && !trimmed.contains(['/', '\\']) {
            config.archive_extension = trimmed.to_string();
        } else {
            warnings.push(format!(
                "[archive] extension = \"{ext}\" is not a file extension. Using default ({}).",
                constants::DEFAULT_ARCHIVE_EXTENSION,
            ));
        }
    }

    // -- Upload: policy --
    if let Some(ref policy) = raw.upload.policy {
        match policy.to_lowercase().as_str() {
            "fail-fast" | "fail_fast" => config.upload_continue_on_error = false,
            "continue" => config.upload_continue_on_error = true,
            other => warnings.push(format!(
                "[upload] policy = \"{other}\" is not recognised. \
                 Expected \"fail-fast\" or \"continue\". Using default (fail-fast).",
            )),
        }
    }

    // -- Upload: timeout_secs --
    if let Some(secs) = raw.upload.timeout_secs {
        if (constants::MIN_UPLOAD_TIMEOUT_SECS..=constants::MAX_UPLOAD_TIMEOUT_SECS).contains(&secs) {
            config.upload_timeout = Duration::from_secs(secs);
        } else {
            warnings.push(
                ConfigError::ValueOutOfRange {
                    field: "[upload] timeout_secs".to_string(),
                    value: secs.to_string(),
                    expected: format!(
                        "{}-{} (using default {})",
                        constants::MIN_UPLOAD_TIMEOUT_SECS,
                        constants::MAX_UPLOAD_TIMEOUT_SECS,
                        constants::DEFAULT_UPLOAD_TIMEOUT_SECS
                    ),
                }
                .to_string(),
            );
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    config
}
