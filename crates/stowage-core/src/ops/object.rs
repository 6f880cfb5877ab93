//! Single-object operations: put, get, head, delete.

use std::fmt;
use std::io;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, TryStreamExt};
use mime_guess::MimeGuess;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::checksums::{StreamingHasher, quote_etag};
use crate::error::{GatewayError, GatewayResult};
use crate::keypath::ObjectPath;
use crate::provider::Gateway;
use crate::storage::ObjectReader;

/// Metadata returned by GET and HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Normalized key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Quoted content hash.
    pub etag: String,
    /// MIME type inferred from the key's extension.
    pub content_type: String,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Normalized key.
    pub key: String,
    /// Quoted content hash of the stored bytes.
    pub etag: String,
    /// Bytes written.
    pub size: u64,
}

/// An object ready to be streamed to the client.
pub struct GetObjectOutput {
    /// Object metadata.
    pub metadata: ObjectMetadata,
    /// Object body.
    pub body: ObjectReader,
}

impl fmt::Debug for GetObjectOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetObjectOutput")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Infer a content type from `key`, falling back to `application/octet-stream`.
#[must_use]
pub fn content_type_for(key: &str) -> String {
    MimeGuess::from_path(key)
        .first()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
        .to_string()
}

impl Gateway {
    /// Stream `body` into `bucket/key`, replacing any previous content.
    ///
    /// The ETag is the MD5 of the bytes as they are written. A body that
    /// fails mid-stream leaves whatever was already written on disk.
    pub async fn put_object<S>(
        &self,
        bucket: &str,
        key: &str,
        body: S,
    ) -> GatewayResult<PutObjectOutput>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let object = self.store.codec().resolve(bucket, key)?;
        let mut writer = self.store.open_write(&object).await?;
        let mut body = std::pin::pin!(body);
        let mut hasher = StreamingHasher::new();

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| write_error(&object, "read request body for", &e))?
        {
            hasher.update(&chunk);
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| write_error(&object, "write", &e))?;
        }
        writer
            .shutdown()
            .await
            .map_err(|e| write_error(&object, "flush", &e))?;

        let size = hasher.bytes();
        let etag = quote_etag(&hasher.finish());
        info!(bucket = %bucket, key = %object.key(), size, etag = %etag, "put_object completed");
        Ok(PutObjectOutput {
            key: object.key().to_owned(),
            etag,
            size,
        })
    }

    /// Open `bucket/key` for download.
    pub async fn get_object(&self, bucket: &str, key: &str) -> GatewayResult<GetObjectOutput> {
        let object = self.store.codec().resolve(bucket, key)?;
        let metadata = self.metadata(&object).await?;
        let body = self.store.open_read(&object).await?;
        debug!(bucket = %bucket, key = %object.key(), size = metadata.size, "get_object");
        Ok(GetObjectOutput { metadata, body })
    }

    /// Metadata of `bucket/key` without its body.
    pub async fn head_object(&self, bucket: &str, key: &str) -> GatewayResult<ObjectMetadata> {
        let object = self.store.codec().resolve(bucket, key)?;
        self.metadata(&object).await
    }

    /// Remove `bucket/key`. A missing object is `NoSuchKey`, never a no-op.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> GatewayResult<()> {
        let object = self.store.codec().resolve(bucket, key)?;
        self.store.delete(&object).await?;
        info!(bucket = %bucket, key = %object.key(), "delete_object completed");
        Ok(())
    }

    async fn metadata(&self, object: &ObjectPath) -> GatewayResult<ObjectMetadata> {
        let stat = self.store.stat(object).await?;
        let md5 = self.store.content_hash(object).await?;
        Ok(ObjectMetadata {
            key: object.key().to_owned(),
            size: stat.size,
            last_modified: stat.last_modified,
            etag: quote_etag(&md5),
            content_type: content_type_for(object.key()),
        })
    }
}

fn write_error(object: &ObjectPath, action: &str, e: &io::Error) -> GatewayError {
    GatewayError::Internal(anyhow::anyhow!(
        "failed to {action} {}/{}: {e}",
        object.bucket().name(),
        object.key()
    ))
}
