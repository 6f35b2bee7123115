pub(crate) mod archive;
pub(crate) mod upload;

use crate::config::BackupConfig;
use crate::errors::Result;
use std::path::{Path, PathBuf};
use tracing::error;

/// Runs one backup cycle: load configuration, archive, upload.
///
/// This is the single containment point for failures: whatever goes wrong is logged once
/// at error level, with its kind, and then handed back so the caller can pick an exit status.
/// A local archive is left in place when the upload fails.
pub async fn run_backup_flow(config_path: &Path) -> Result<PathBuf> {
    match perform_backup(config_path).await {
        Ok(archive_path) => Ok(archive_path),
        Err(e) => {
            error!(kind = e.kind(), "Failed backup: {}", e);
            Err(e)
        }
    }
}

async fn perform_backup(config_path: &Path) -> Result<PathBuf> {
    let config = BackupConfig::load(config_path)?;
    let archive_path =
        archive::create_backup(&config.backup_dir, &config.output_dir, config.archive_format)?;
    upload::upload_archive(&archive_path, &config.connection_string, &config.container_name).await?;
    Ok(archive_path)
}
