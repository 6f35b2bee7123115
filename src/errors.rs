use thiserror::Error;

/// Every way a backup run can fail, grouped by pipeline stage.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source I/O error: {message}")]
    SourceIo {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Storage authentication failed: {0}")]
    StorageAuth(String),

    #[error("Storage container not found: {0}")]
    StorageNotFound(String),

    #[error("Storage transfer failed: {0}")]
    StorageTransfer(String),
}

impl BackupError {
    pub fn source_io(message: impl Into<String>, source: std::io::Error) -> Self {
        BackupError::SourceIo {
            message: format!("{}: {}", message.into(), source),
            source: Some(source),
        }
    }

    /// Short, stable name of the failure kind, written next to the message in the log.
    pub fn kind(&self) -> &'static str {
        match self {
            BackupError::Config(_) => "config",
            BackupError::SourceIo { .. } => "source_io",
            BackupError::StorageAuth(_) => "storage_auth",
            BackupError::StorageNotFound(_) => "storage_not_found",
            BackupError::StorageTransfer(_) => "storage_transfer",
        }
    }
}

impl From<walkdir::Error> for BackupError {
    fn from(err: walkdir::Error) -> Self {
        let message = match err.path() {
            Some(path) => format!("Failed to walk {}", path.display()),
            None => "Failed to walk source directory".to_string(),
        };
        match err.into_io_error() {
            Some(io) => BackupError::source_io(message, io),
            None => BackupError::SourceIo {
                message,
                source: None,
            },
        }
    }
}

impl From<zip::result::ZipError> for BackupError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => BackupError::source_io("Zip write failed", io),
            other => BackupError::SourceIo {
                message: format!("Zip write failed: {}", other),
                source: None,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_io_message_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = BackupError::source_io("Failed to open /data", io);

        assert_eq!(err.kind(), "source_io");
        assert!(err.to_string().contains("Failed to open /data"));
        assert!(err.to_string().contains("no such file"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            BackupError::Config("x".into()).kind(),
            BackupError::StorageAuth("x".into()).kind(),
            BackupError::StorageNotFound("x".into()).kind(),
            BackupError::StorageTransfer("x".into()).kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn zip_io_error_maps_to_source_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = BackupError::from(zip::result::ZipError::Io(io));
        assert!(matches!(err, BackupError::SourceIo { source: Some(_), .. }));
    }
}
