//! Object storage boundary.
//!
//! A connection string is a semicolon-separated list of `Key=Value` pairs, e.g.
//! `Provider=s3;Region=eu-west-1;AccessKeyId=...;SecretAccessKey=...`. The
//! `Provider` key picks the backend. A standard Azure storage connection string
//! (`AccountName=...;AccountKey=...`) needs no `Provider`.

pub(crate) mod azure;
pub(crate) mod local;
pub(crate) mod s3;

use crate::errors::{BackupError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// Minimal blob-store capability the uploader needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes the file's full contents as `object_name` in `container`, replacing any existing object.
    async fn put_object(&self, container: &str, object_name: &str, file_path: &Path) -> Result<()>;
}

/// Parsed `Key=Value;...` connection string. Keys are case-insensitive.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pairs: HashMap<String, String>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut pairs = HashMap::new();
        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                BackupError::StorageAuth(
                    "Malformed connection string: every segment must be Key=Value".to_string(),
                )
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(BackupError::StorageAuth(
                    "Malformed connection string: empty key".to_string(),
                ));
            }
            pairs.insert(key.to_ascii_lowercase(), value.trim().to_string());
        }
        if pairs.is_empty() {
            return Err(BackupError::StorageAuth("Connection string is empty".to_string()));
        }
        Ok(ConnectionString { pairs })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            BackupError::StorageAuth(format!("Connection string is missing {}", key))
        })
    }
}

// Values include secrets, so only keys are shown.
impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.pairs.keys().collect();
        keys.sort();
        f.debug_struct("ConnectionString").field("keys", &keys).finish()
    }
}

/// Opens a session against the backend named by the connection string.
pub async fn connect(connection_string: &str) -> Result<Box<dyn ObjectStore>> {
    let conn = ConnectionString::parse(connection_string)?;
    let provider = match conn.get("Provider") {
        Some(provider) => provider.to_ascii_lowercase(),
        None if azure::AzureStore::recognizes(&conn) => "azure".to_string(),
        None => {
            return Err(BackupError::StorageAuth(
                "Connection string is missing Provider".to_string(),
            ));
        }
    };
    match provider.as_str() {
        "azure" => Ok(Box::new(azure::AzureStore::connect(&conn)?)),
        "s3" => Ok(Box::new(s3::S3Store::connect(&conn).await?)),
        "local" | "file" => Ok(Box::new(local::LocalStore::connect(&conn)?)),
        other => Err(BackupError::StorageAuth(format!(
            "Unsupported storage provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_and_trims() -> Result<()> {
        let conn = ConnectionString::parse(" Provider = S3 ; region=us-east-1;Endpoint=http://h:9000/a=b; ")?;
        assert_eq!(conn.get("provider"), Some("S3"));
        assert_eq!(conn.get("REGION"), Some("us-east-1"));
        // only the first '=' splits
        assert_eq!(conn.get("Endpoint"), Some("http://h:9000/a=b"));
        assert_eq!(conn.get("AccessKeyId"), None);
        Ok(())
    }

    #[test]
    fn test_malformed_strings_are_auth_errors() {
        for raw in ["", " ; ", "Provider", "=value"] {
            let err = ConnectionString::parse(raw).unwrap_err();
            assert!(matches!(err, BackupError::StorageAuth(_)), "{raw:?}");
        }
    }

    #[test]
    fn test_debug_hides_values() -> Result<()> {
        let conn = ConnectionString::parse("Provider=s3;SecretAccessKey=hunter2")?;
        let rendered = format!("{:?}", conn);
        assert!(rendered.contains("secretaccesskey"));
        assert!(!rendered.contains("hunter2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_provider_is_rejected() {
        let err = connect("Provider=ftp;Host=example.com").await.err().unwrap();
        assert!(matches!(err, BackupError::StorageAuth(_)));
        assert!(err.to_string().contains("ftp"));
    }

    #[tokio::test]
    async fn test_azure_connection_string_needs_no_provider() {
        let store = connect(
            "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=c2VjcmV0LWFjY291bnQta2V5LWZvci10ZXN0cw==;EndpointSuffix=core.windows.net",
        )
        .await;
        assert!(store.is_ok());

        // a key that is not base64 is an unusable credential, not a missing provider
        let err = connect("DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=abc==;EndpointSuffix=core.windows.net")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BackupError::StorageAuth(_)));
        assert!(!err.to_string().contains("Provider"));
    }

    #[tokio::test]
    async fn test_missing_provider_is_rejected() {
        let err = connect("Root=/tmp").await.err().unwrap();
        assert!(err.to_string().contains("Provider"));
    }
}
