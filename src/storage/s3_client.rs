//! S3-compatible storage client
//!
//! Wraps the AWS SDK for S3-compatible storage access. Path-style addressing
//! keeps MinIO and Synology endpoints working.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    Client,
};

use crate::config::StorageConfig;
use crate::error::StorageError;

use super::ContentStore;

/// S3-compatible content store
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl S3Store {
    /// Create a new S3 store from configuration
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(StorageError::Credentials(
                "S3 access key and secret key must be set".to_string(),
            ));
        }

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "arxiver",
        );

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let store = Self::from_client(Client::from_conf(s3_config), &config.bucket, &config.endpoint);

        match store.client.head_bucket().bucket(&store.bucket).send().await {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", store.bucket);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt operations anyway.",
                    store.bucket,
                    DisplayErrorContext(&e)
                );
            }
        }

        Ok(store)
    }

    /// Wrap a preconfigured client
    pub fn from_client(client: Client, bucket: &str, endpoint: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ContentStore for S3Store {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let length = content.len() as i64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content))
            .content_length(length)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| classify_sdk_error("put", key, e))?;

        tracing::debug!(key = %key, size = length, "Uploaded object");
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(e)) if e.err().is_not_found() => Ok(false),
            Err(e) => match classify_sdk_error("head", key, e) {
                StorageError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(SdkError::ServiceError(e)) if e.err().is_no_such_key() => return Ok(None),
            Err(e) => {
                return match classify_sdk_error("get", key, e) {
                    StorageError::NotFound(_) => Ok(None),
                    other => Err(other),
                }
            }
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transient(format!("Failed to read object body {}: {}", key, e)))?
            .into_bytes()
            .to_vec();

        Ok(Some(data))
    }

    async fn delete(&self, key: &str) -> bool {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(key = %key, "Error deleting file: {}", DisplayErrorContext(&e));
                false
            }
        }
    }

    fn resolve_url(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        Some(format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }
}

/// Map an SDK failure onto the storage error taxonomy
fn classify_sdk_error<E, R>(operation: &str, key: &str, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{} {}: {}", operation, key, DisplayErrorContext(&err));

    match &err {
        SdkError::ServiceError(_) => match err.code() {
            Some(
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken"
                | "InvalidToken",
            ) => StorageError::Credentials(message),
            Some("NoSuchKey" | "NotFound") => StorageError::NotFound(key.to_string()),
            Some("SlowDown" | "ServiceUnavailable" | "InternalError" | "RequestTimeout") => {
                StorageError::Transient(message)
            }
            _ => StorageError::Client(message),
        },
        _ if message.to_ascii_lowercase().contains("credential") => {
            StorageError::Credentials(message)
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StorageError::Transient(message)
        }
        _ => StorageError::Client(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::http::HttpResponse;
    use aws_sdk_s3::operation::head_object::HeadObjectError;

    fn offline_store(endpoint: &str) -> S3Store {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("key", "secret", None, None, "test"))
            .force_path_style(true)
            .build();
        S3Store::from_client(Client::from_conf(config), "papers", endpoint)
    }

    #[test]
    fn test_resolve_url_concatenates_endpoint_bucket_key() {
        let store = offline_store("https://nas.example.com:8443/");
        assert_eq!(
            store.resolve_url("9/thumbnails/2401.00001v1.png").as_deref(),
            Some("https://nas.example.com:8443/papers/9/thumbnails/2401.00001v1.png")
        );
        assert_eq!(store.resolve_url(""), None);
        assert_eq!(store.bucket(), "papers");
    }

    #[test]
    fn test_timeouts_are_transient() {
        let err: SdkError<HeadObjectError, HttpResponse> = SdkError::timeout_error("deadline exceeded");
        assert!(matches!(
            classify_sdk_error("head", "1/t/a.png", err),
            StorageError::Transient(_)
        ));
    }

    #[tokio::test]
    async fn test_connect_requires_credentials() {
        let config = StorageConfig {
            provider: crate::config::StorageProvider::Minio,
            endpoint: "http://localhost:9000".to_string(),
            bucket: "arxiver".to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            region: None,
            local_root: std::path::PathBuf::from("/tmp"),
            public_url: String::new(),
        };
        let result = S3Store::connect(&config).await;
        assert!(matches!(result, Err(StorageError::Credentials(_))));
    }
}
