// blob_backup/src/storage/s3.rs
use super::{ConnectionString, ObjectStore};
use crate::errors::{BackupError, Result};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::{ProvideErrorMetadata, SdkError};
use s3::primitives::ByteStream;
use std::path::Path;

/// Any S3-compatible service (AWS, DigitalOcean Spaces, MinIO, ...).
pub struct S3Store {
    client: s3::Client,
}

impl S3Store {
    pub async fn connect(conn: &ConnectionString) -> Result<Self> {
        let region = conn.require("Region")?.to_string();
        let access_key_id = conn.require("AccessKeyId")?;
        let secret_access_key = conn.require("SecretAccessKey")?;
        let session_token = conn.get("SessionToken").map(str::to_string);

        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token,
                None,     // expiry
                "Static", // provider_name
            ));
        if let Some(endpoint) = conn.get("Endpoint") {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let force_path_style = conn
            .get("ForcePathStyle")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(force_path_style)
            .build();

        Ok(S3Store {
            client: s3::Client::from_conf(s3_config),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, container: &str, object_name: &str, file_path: &Path) -> Result<()> {
        let body = ByteStream::from_path(file_path).await.map_err(|e| {
            BackupError::StorageTransfer(format!(
                "Failed to create ByteStream from file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        // PutObject always replaces an existing key.
        self.client
            .put_object()
            .bucket(container)
            .key(object_name)
            .body(body)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, container, object_name))?;
        Ok(())
    }
}

fn classify_sdk_error<E, R>(err: SdkError<E, R>, bucket: &str, key: &str) -> BackupError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = match &err {
        SdkError::ServiceError(service) => service.err().code().map(str::to_string),
        _ => None,
    };
    let message = format!(
        "PutObject {}/{} failed{}: {}",
        bucket,
        key,
        code.as_deref().map(|c| format!(" ({})", c)).unwrap_or_default(),
        s3::error::DisplayErrorContext(err)
    );
    error_for_code(code.as_deref(), message)
}

/// Maps an S3 error code onto the storage failure kinds.
fn error_for_code(code: Option<&str>, message: String) -> BackupError {
    match code {
        Some("NoSuchBucket") => BackupError::StorageNotFound(message),
        Some(
            "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AccessDenied" | "InvalidToken"
            | "ExpiredToken" | "AuthorizationHeaderMalformed",
        ) => BackupError::StorageAuth(message),
        _ => BackupError::StorageTransfer(message),
    }
}
