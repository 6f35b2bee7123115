//! Directory backup to object storage
//!
//! Zips a local directory into a timestamped archive and uploads it to a storage container.

// blob_backup/src/main.rs
mod backup;
mod config;
mod errors;
mod logging;
mod storage;

use anyhow::{Context, Result};
use config::{CONFIG_PATH, LogConfig};
use std::path::Path;
use std::process::ExitCode;

/// Runs a single backup cycle. Scheduling is left to cron or a systemd timer.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A .env file is optional; it only feeds the log settings.
    dotenv::dotenv().ok();

    if let Err(e) = init_logging(&LogConfig::from_env()) {
        eprintln!("❌ Error: {:?}", e);
        return ExitCode::FAILURE;
    }

    // Failures are already written to the log by the flow itself.
    match backup::run_backup_flow(Path::new(CONFIG_PATH)).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn init_logging(log_config: &LogConfig) -> Result<()> {
    let dispatch = logging::build_dispatch(log_config)?;
    tracing::dispatcher::set_global_default(dispatch)
        .context("Failed to install the log subscriber")
}
