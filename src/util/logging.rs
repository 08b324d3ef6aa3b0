// LogKeeper - util/logging.rs
//
// Diagnostics for CLI runs. Everything goes to stderr; stdout carries only
// command results so it can be piped into other tools.

use super::constants;
use tracing_subscriber::EnvFilter;

/// Which setting decided the active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterSource {
    Environment,
    DebugFlag,
    ConfigFile,
    BuiltIn,
}

/// Pick the filter directives: a non-blank `RUST_LOG` first, then
/// `--debug`, then `[logging] level`, then the built-in default.
fn choose_directives(
    env: Option<String>,
    debug_flag: bool,
    config_level: Option<&str>,
) -> (String, FilterSource) {
    match (env.filter(|v| !v.trim().is_empty()), debug_flag, config_level) {
        (Some(directives), _, _) => (directives, FilterSource::Environment),
        (None, true, _) => ("debug".to_string(), FilterSource::DebugFlag),
        (None, false, Some(level)) => (level.to_string(), FilterSource::ConfigFile),
        (None, false, None) => (constants::DEFAULT_LOG_LEVEL.to_string(), FilterSource::BuiltIn),
    }
}

/// Install the stderr subscriber for this process.
///
/// Unparseable directives fall back to the default level. Calling this when
/// a subscriber is already installed (an embedding host, repeated calls) is
/// a no-op.
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let (directives, source) =
        choose_directives(std::env::var("RUST_LOG").ok(), debug_flag, config_level);
    let (filter, rejected) = match EnvFilter::try_new(&directives) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(constants::DEFAULT_LOG_LEVEL), Some(e)),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok();
    if !installed {
        return;
    }

    if let Some(e) = rejected {
        tracing::warn!(directives = %directives, error = %e, "Ignoring invalid log filter");
    }
    tracing::debug!(
        version = constants::APP_VERSION,
        filter = %directives,
        ?source,
        "Diagnostics enabled"
    );
}
