// blob_backup/src/storage/local.rs
use super::{ConnectionString, ObjectStore};
use crate::errors::{BackupError, Result};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory-backed object store: containers are sub-directories of `root`, objects are files.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn connect(conn: &ConnectionString) -> Result<Self> {
        let root = PathBuf::from(conn.require("Root")?);
        if !root.is_dir() {
            return Err(BackupError::StorageAuth(format!(
                "Storage root is not an accessible directory: {}",
                root.display()
            )));
        }
        Ok(LocalStore { root })
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf> {
        if !is_single_component(container) {
            return Err(BackupError::StorageNotFound(format!(
                "Invalid container name: {}",
                container
            )));
        }
        let dir = self.root.join(container);
        if !dir.is_dir() {
            return Err(BackupError::StorageNotFound(format!(
                "Container {} does not exist under {}",
                container,
                self.root.display()
            )));
        }
        Ok(dir)
    }
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put_object(&self, container: &str, object_name: &str, file_path: &Path) -> Result<()> {
        let container_dir = self.container_dir(container)?;
        if !is_single_component(object_name) {
            return Err(BackupError::StorageTransfer(format!(
                "Invalid object name: {}",
                object_name
            )));
        }

        let transfer = |what: &str, e: std::io::Error| {
            BackupError::StorageTransfer(format!("{} for {}/{}: {}", what, container, object_name, e))
        };

        let mut source = File::open(file_path).map_err(|e| transfer("Failed to open upload source", e))?;
        // Stage next to the destination so the final rename stays on one filesystem.
        let mut staged =
            NamedTempFile::new_in(&container_dir).map_err(|e| transfer("Failed to stage object", e))?;
        std::io::copy(&mut source, &mut staged).map_err(|e| transfer("Failed to copy object", e))?;
        staged
            .persist(container_dir.join(object_name))
            .map_err(|e| transfer("Failed to commit object", e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_with_container(container: &str) -> (tempfile::TempDir, LocalStore) {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join(container)).unwrap();
        let conn = ConnectionString::parse(&format!("Provider=local;Root={}", root.path().display())).unwrap();
        let store = LocalStore::connect(&conn).unwrap();
        (root, store)
    }

    #[tokio::test]
    async fn second_upload_overwrites_first() {
        let (root, store) = store_with_container("backups-ct");
        let scratch = tempfile::tempdir().unwrap();
        let first = scratch.path().join("first.zip");
        let second = scratch.path().join("second.zip");
        fs::write(&first, b"first bytes").unwrap();
        fs::write(&second, b"second, longer bytes").unwrap();

        store.put_object("backups-ct", "backup-20240101-000000.zip", &first).await.unwrap();
        store.put_object("backups-ct", "backup-20240101-000000.zip", &second).await.unwrap();

        let entries: Vec<_> = fs::read_dir(root.path().join("backups-ct"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("backup-20240101-000000.zip")]);
        let stored = fs::read(root.path().join("backups-ct").join("backup-20240101-000000.zip")).unwrap();
        assert_eq!(stored, b"second, longer bytes");
    }

    #[tokio::test]
    async fn missing_container_is_not_found() {
        let (_root, store) = store_with_container("backups-ct");
        let scratch = tempfile::tempdir().unwrap();
        let file = scratch.path().join("a.zip");
        fs::write(&file, b"x").unwrap();

        let err = store.put_object("other", "a.zip", &file).await.unwrap_err();
        assert!(matches!(err, BackupError::StorageNotFound(_)));

        let err = store.put_object("../escape", "a.zip", &file).await.unwrap_err();
        assert!(matches!(err, BackupError::StorageNotFound(_)));
    }

    #[tokio::test]
    async fn unreadable_source_is_transfer_error() {
        let (_root, store) = store_with_container("backups-ct");
        let err = store
            .put_object("backups-ct", "a.zip", Path::new("/definitely/not/here.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::StorageTransfer(_)));
    }

    #[test]
    fn missing_root_is_auth_error() {
        let conn = ConnectionString::parse("Provider=local;Root=/definitely/not/a/root").unwrap();
        let err = LocalStore::connect(&conn).unwrap_err();
        assert!(matches!(err, BackupError::StorageAuth(_)));
    }
}
