// blob_backup/src/logging.rs
use crate::config::LogConfig;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Builds the log dispatcher that appends timestamped, level-tagged lines to the log file.
///
/// The caller decides its scope: `main` installs it process-wide, tests install it
/// for the duration of a single test.
pub fn build_dispatch(log_config: &LogConfig) -> Result<Dispatch> {
    if let Some(parent) = log_config.path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_config.path)
        .with_context(|| format!("Failed to open log file: {}", log_config.path.display()))?;

    // A bare level applies to this crate only; SDK internals stay at warn.
    let directives = if log_config.level.contains(['=', ',']) {
        log_config.level.clone()
    } else {
        format!("warn,{}={}", env!("CARGO_CRATE_NAME"), log_config.level)
    };
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log level: {}", log_config.level))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(false)
        .finish();
    Ok(Dispatch::new(subscriber))
}
