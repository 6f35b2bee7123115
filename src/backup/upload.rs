// blob_backup/src/backup/upload.rs
use crate::errors::{BackupError, Result};
use crate::storage;
use std::path::Path;
use tracing::info;

/// Uploads the archive to `container_name` under its base file name, replacing any existing object.
pub async fn upload_archive(file_path: &Path, connection_string: &str, container_name: &str) -> Result<()> {
    let object_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            BackupError::SourceIo {
                message: format!(
                    "Archive path has no UTF-8 file name to use as object name: {}",
                    file_path.display()
                ),
                source: None,
            }
        })?;

    let store = storage::connect(connection_string).await?;
    store.put_object(container_name, object_name, file_path).await?;

    info!("Uploaded {} to container: {}", object_name, container_name);
    Ok(())
}
