use crate::error::StorageError;
use crate::models::{ObjectMetadata, StorageObject};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Read-only view of the bucket the event logs are dropped into
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every object under `prefix`, in the order the store returns them
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StorageObject>, StorageError>;

    async fn get_object_metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError>;

    /// Streams the full object body into `dest` and returns the number of bytes written
    async fn download_object(
        &self,
        key: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError>;
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

fn request_error<E>(operation: &'static str, target: &str, err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Request {
        operation,
        target: target.to_string(),
        message: DisplayErrorContext(err).to_string(),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StorageObject>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(|e| request_error("ListObjectsV2", prefix, e))?;

            if let Some(contents) = res.contents {
                for object in contents {
                    let Some(key) = object.key else { continue };
                    let last_modified = object.last_modified.and_then(|d| {
                        chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos())
                    });
                    objects.push(StorageObject {
                        key,
                        size: object.size.unwrap_or(0),
                        last_modified,
                    });
                }
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn get_object_metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| request_error("HeadObject", key, e))?;

        Ok(ObjectMetadata {
            content_type: res.content_type,
            size: res.content_length.unwrap_or(0),
        })
    }

    async fn download_object(
        &self,
        key: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| request_error("GetObject", key, e))?;

        let mut body = Box::pin(res.body.into_async_read());
        let written = tokio::io::copy(&mut body, dest).await?;
        dest.flush().await?;
        Ok(written)
    }
}
