//! Amazon S3 blob storage.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::clients::AwsClients;
use super::error::provider_error;
use crate::capability::{BlobStorage, CapabilityError, ErrorKind, Result};
use crate::config::DEFAULT_REGION;
use crate::validation::{validate_key, validate_name};

/// S3 implementation of [`BlobStorage`].
pub struct S3BlobStorage {
    clients: Arc<AwsClients>,
    client: OnceCell<Client>,
}

impl S3BlobStorage {
    pub fn new(clients: Arc<AwsClients>) -> Self {
        Self {
            clients,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| self.clients.s3()).await
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let client = self.client().await?;
        match client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = provider_error("head_bucket", bucket, e);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Every key under `prefix`, following continuation tokens.
    async fn collect_keys(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        let client = self.client().await?;
        let prefix = prefix.filter(|p| !p.is_empty());
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = client
                .list_objects_v2()
                .bucket(bucket)
                .set_prefix(prefix.map(str::to_string))
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| provider_error("list_objects_v2", bucket, e))?;

            keys.extend(
                output
                    .contents
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|o| o.key),
            );

            match output.next_continuation_token {
                Some(token) if output.is_truncated.unwrap_or(false) => continuation = Some(token),
                _ => return Ok(keys),
            }
        }
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        validate_name("bucket", bucket)?;
        if self.bucket_exists(bucket).await? {
            return Ok(());
        }

        let region = self.clients.region().await?;
        let client = self.client().await?;

        let mut request = client.create_bucket().bucket(bucket);
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = %bucket, region = %region, "Created S3 bucket");
                Ok(())
            }
            Err(e) => {
                let err = provider_error("create_bucket", bucket, e);
                if err.kind() == Some(ErrorKind::AlreadyExists) {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        validate_name("bucket", bucket)?;

        let keys = match self.collect_keys(bucket, None).await {
            Ok(keys) => keys,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        let client = self.client().await?;
        for key in &keys {
            if let Err(e) = client.delete_object().bucket(bucket).key(key).send().await {
                warn!(
                    bucket = %bucket,
                    key = %key,
                    error = %provider_error("delete_object", bucket, e),
                    "Failed to delete object while draining bucket"
                );
            }
        }

        match client.delete_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!(bucket = %bucket, objects = keys.len(), "Deleted S3 bucket");
                Ok(())
            }
            Err(e) => {
                let err = provider_error("delete_bucket", bucket, e);
                if err.is_not_found() {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        validate_name("bucket", bucket)?;
        validate_key("key", key)?;
        let size = data.len();

        let client = self.client().await?;
        client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| provider_error("put_object", bucket, e))?;

        debug!(bucket = %bucket, key = %key, size, "Stored object");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        validate_name("bucket", bucket)?;
        validate_key("key", key)?;

        let client = self.client().await?;
        let output = match client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                let err = provider_error("get_object", bucket, e);
                return if err.is_not_found() { Ok(None) } else { Err(err) };
            }
        };

        let bytes = output.body.collect().await.map_err(|e| {
            CapabilityError::UnexpectedResponse(format!(
                "failed to read body of {bucket}/{key}: {e}"
            ))
        })?;

        Ok(Some(bytes.into_bytes().to_vec()))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        validate_name("bucket", bucket)?;
        validate_key("key", key)?;

        let client = self.client().await?;
        match client.delete_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = provider_error("delete_object", bucket, e);
                if err.is_not_found() {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn list_keys(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        validate_name("bucket", bucket)?;
        match self.collect_keys(bucket, prefix).await {
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            other => other,
        }
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        validate_name("bucket", bucket)?;
        validate_key("key", key)?;

        let client = self.client().await?;
        match client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = provider_error("head_object", bucket, e);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }
}
