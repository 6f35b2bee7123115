// blob_backup/src/storage/azure.rs
use super::{ConnectionString, ObjectStore};
use crate::errors::{BackupError, Result};
use async_trait::async_trait;
use object_store::ObjectStore as _;
use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use object_store::path::Path as ObjectPath;
use object_store::PutPayload;
use std::path::Path;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Azure Blob Storage, configured from a standard storage-account connection string
/// (`DefaultEndpointsProtocol=https;AccountName=...;AccountKey=...;EndpointSuffix=...`).
pub struct AzureStore {
    builder: MicrosoftAzureBuilder,
}

impl AzureStore {
    /// Azure connection strings carry no `Provider` key; these keys identify one.
    pub fn recognizes(conn: &ConnectionString) -> bool {
        conn.get("AccountName").is_some()
            || conn.get("BlobEndpoint").is_some()
            || conn
                .get("UseDevelopmentStorage")
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn connect(conn: &ConnectionString) -> Result<Self> {
        let builder = builder_from(conn)?;
        // Building once checks the account key and endpoint before any transfer.
        // `$root` is the account's implicit root container.
        builder
            .clone()
            .with_container_name("$root")
            .build()
            .map_err(|e| BackupError::StorageAuth(format!("Invalid Azure connection string: {}", e)))?;
        Ok(AzureStore { builder })
    }
}

fn builder_from(conn: &ConnectionString) -> Result<MicrosoftAzureBuilder> {
    if conn
        .get("UseDevelopmentStorage")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return Ok(MicrosoftAzureBuilder::new().with_use_emulator(true));
    }

    let account = conn.require("AccountName")?;
    let mut builder = MicrosoftAzureBuilder::new().with_account(account);

    match (conn.get("AccountKey"), conn.get("SharedAccessSignature")) {
        (Some(key), _) => builder = builder.with_access_key(key),
        (None, Some(sas)) => builder = builder.with_config(AzureConfigKey::SasKey, sas),
        (None, None) => {
            return Err(BackupError::StorageAuth(
                "Connection string is missing AccountKey or SharedAccessSignature".to_string(),
            ));
        }
    }

    let protocol = conn
        .get("DefaultEndpointsProtocol")
        .unwrap_or("https")
        .to_ascii_lowercase();
    let endpoint = match conn.get("BlobEndpoint") {
        Some(endpoint) => Some(endpoint.trim_end_matches('/').to_string()),
        None => conn
            .get("EndpointSuffix")
            .filter(|suffix| !suffix.eq_ignore_ascii_case(DEFAULT_ENDPOINT_SUFFIX))
            .map(|suffix| format!("{}://{}.blob.{}", protocol, account, suffix)),
    };
    if let Some(endpoint) = endpoint {
        builder = builder
            .with_allow_http(endpoint.starts_with("http://"))
            .with_endpoint(endpoint);
    } else if protocol == "http" {
        builder = builder.with_allow_http(true);
    }
    Ok(builder)
}

#[async_trait]
impl ObjectStore for AzureStore {
    async fn put_object(&self, container: &str, object_name: &str, file_path: &Path) -> Result<()> {
        let client = self
            .builder
            .clone()
            .with_container_name(container)
            .build()
            .map_err(|e| classify_store_error(e, container, object_name))?;

        let bytes = tokio::fs::read(file_path).await.map_err(|e| {
            BackupError::StorageTransfer(format!(
                "Failed to read upload source {}: {}",
                file_path.display(),
                e
            ))
        })?;

        // Put Blob replaces an existing blob of the same name.
        client
            .put(&ObjectPath::from(object_name), PutPayload::from(bytes))
            .await
            .map_err(|e| classify_store_error(e, container, object_name))?;
        Ok(())
    }
}

fn classify_store_error(err: object_store::Error, container: &str, blob: &str) -> BackupError {
    let message = format!("Put Blob {}/{} failed: {}", container, blob, err);
    match err {
        object_store::Error::NotFound { .. } => BackupError::StorageNotFound(message),
        object_store::Error::PermissionDenied { .. } | object_store::Error::Unauthenticated { .. } => {
            BackupError::StorageAuth(message)
        }
        _ => {
            let code = error_code_in(&message);
            error_for_code(code, message)
        }
    }
}

/// Azure service error codes that show up in the response body of a failed request.
const KNOWN_CODES: &[&str] = &[
    "ContainerNotFound",
    "ResourceNotFound",
    "AuthenticationFailed",
    "AuthorizationFailure",
    "AuthorizationPermissionMismatch",
    "InvalidAuthenticationInfo",
    "AccountIsDisabled",
];

fn error_code_in(message: &str) -> Option<&'static str> {
    KNOWN_CODES.iter().copied().find(|code| message.contains(code))
}

/// Maps an Azure Blob error code onto the storage failure kinds.
fn error_for_code(code: Option<&str>, message: String) -> BackupError {
    match code {
        Some("ContainerNotFound" | "ResourceNotFound") => BackupError::StorageNotFound(message),
        Some(
            "AuthenticationFailed"
            | "AuthorizationFailure"
            | "AuthorizationPermissionMismatch"
            | "InvalidAuthenticationInfo"
            | "AccountIsDisabled",
        ) => BackupError::StorageAuth(message),
        _ => BackupError::StorageTransfer(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT_KEY: &str = "c2VjcmV0LWFjY291bnQta2V5LWZvci10ZXN0cw==";

    fn boxed(msg: &str) -> Box<dyn std::error::Error + Send + Sync> {
        msg.to_string().into()
    }

    #[test]
    fn test_recognizes_standard_connection_string() {
        let conn = ConnectionString::parse(&format!(
            "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey={};EndpointSuffix=core.windows.net",
            ACCOUNT_KEY
        ))
        .unwrap();
        assert!(AzureStore::recognizes(&conn));
        assert_eq!(conn.get("AccountKey"), Some(ACCOUNT_KEY));
        assert!(AzureStore::connect(&conn).is_ok());

        let emulator = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        assert!(AzureStore::recognizes(&emulator));

        let s3 = ConnectionString::parse("Provider=s3;Region=us-east-1").unwrap();
        assert!(!AzureStore::recognizes(&s3));
    }

    #[test]
    fn test_connect_accepts_sovereign_cloud_and_blob_endpoint() {
        let sovereign = ConnectionString::parse(&format!(
            "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey={};EndpointSuffix=core.chinacloudapi.cn",
            ACCOUNT_KEY
        ))
        .unwrap();
        assert!(AzureStore::connect(&sovereign).is_ok());

        let azurite = ConnectionString::parse(&format!(
            "AccountName=devstoreaccount1;AccountKey={};BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1/",
            ACCOUNT_KEY
        ))
        .unwrap();
        assert!(AzureStore::connect(&azurite).is_ok());
    }

    #[test]
    fn test_connect_requires_a_secret() {
        let conn = ConnectionString::parse("AccountName=acct;EndpointSuffix=core.windows.net").unwrap();
        let err = AzureStore::connect(&conn).err().unwrap();
        assert!(matches!(err, BackupError::StorageAuth(_)));
        assert!(err.to_string().contains("AccountKey"));
    }

    #[test]
    fn test_error_codes_map_to_kinds() {
        assert!(matches!(
            error_for_code(Some("ContainerNotFound"), String::new()),
            BackupError::StorageNotFound(_)
        ));
        for code in ["AuthenticationFailed", "AuthorizationFailure", "InvalidAuthenticationInfo"] {
            assert!(matches!(
                error_for_code(Some(code), String::new()),
                BackupError::StorageAuth(_)
            ));
        }
        assert!(matches!(
            error_for_code(Some("ServerBusy"), String::new()),
            BackupError::StorageTransfer(_)
        ));
        assert!(matches!(
            error_for_code(None, String::new()),
            BackupError::StorageTransfer(_)
        ));
    }

    #[test]
    fn test_store_errors_map_to_kinds() {
        let not_found = object_store::Error::NotFound {
            path: "backup.zip".to_string(),
            source: boxed("404"),
        };
        assert!(matches!(
            classify_store_error(not_found, "ct", "backup.zip"),
            BackupError::StorageNotFound(_)
        ));

        let denied = object_store::Error::PermissionDenied {
            path: "backup.zip".to_string(),
            source: boxed("403"),
        };
        assert!(matches!(
            classify_store_error(denied, "ct", "backup.zip"),
            BackupError::StorageAuth(_)
        ));

        let generic_auth = object_store::Error::Generic {
            store: "MicrosoftAzure",
            source: boxed("Server returned 403: <Code>AuthenticationFailed</Code>"),
        };
        assert!(matches!(
            classify_store_error(generic_auth, "ct", "backup.zip"),
            BackupError::StorageAuth(_)
        ));

        let timeout = object_store::Error::Generic {
            store: "MicrosoftAzure",
            source: boxed("connection reset"),
        };
        assert!(matches!(
            classify_store_error(timeout, "ct", "backup.zip"),
            BackupError::StorageTransfer(_)
        ));
    }
}
