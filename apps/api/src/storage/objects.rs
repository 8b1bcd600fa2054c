//! S3-compatible document store (MinIO locally, AWS in production).
//!
//! Object key = `<parent>/<name>`. Names are unique per parent by key, so
//! `list` is an exact lookup filtered by content type.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::debug;

use crate::storage::{DocumentStore, StoreError, StoredRef};

#[derive(Clone)]
pub struct S3DocumentStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3DocumentStore {
    pub fn new(client: S3Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn view_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, encode_key(key))
    }

    async fn content_type_of(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => Ok(Some(head.content_type().unwrap_or_default().to_string())),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    Err(StoreError::Object(format!(
                        "head {key}: {}",
                        DisplayErrorContext(&service_error)
                    )))
                }
            }
        }
    }

    async fn put(&self, key: &str, mime: &str, content: Bytes) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(mime)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| StoreError::Object(format!("put {key}: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }
}

pub fn object_key(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Compares the media type part only (`text/html; charset=utf-8` matches `text/html`).
fn same_media_type(a: &str, b: &str) -> bool {
    let base = |m: &str| m.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    base(a) == base(b)
}

/// Percent-encodes everything except unreserved characters and `/`.
fn encode_key(key: &str) -> String {
    key.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn list(&self, parent: &str, name: &str, mime: &str) -> Result<Vec<String>, StoreError> {
        let key = object_key(parent, name);
        let found = match self.content_type_of(&key).await? {
            Some(content_type) if same_media_type(&content_type, mime) => vec![key],
            _ => Vec::new(),
        };
        debug!("Lookup {}/{} ({mime}): {} match(es)", parent, name, found.len());
        Ok(found)
    }

    async fn create(
        &self,
        parent: &str,
        name: &str,
        mime: &str,
        content: Bytes,
    ) -> Result<StoredRef, StoreError> {
        let key = object_key(parent, name);
        self.put(&key, mime, content).await?;
        Ok(StoredRef {
            view_url: self.view_url(&key),
            id: key,
        })
    }

    async fn update(&self, id: &str, content: Bytes) -> Result<String, StoreError> {
        let content_type = self
            .content_type_of(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.put(id, &content_type, content).await?;
        Ok(id.to_string())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|e| StoreError::Object(format!("delete {id}: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Bytes, StoreError> {
        let object = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
        {
            Ok(object) => object,
            Err(e) => {
                let service_error = e.into_service_error();
                return Err(if service_error.is_no_such_key() {
                    StoreError::NotFound(id.to_string())
                } else {
                    StoreError::Object(format!(
                        "get {id}: {}",
                        DisplayErrorContext(&service_error)
                    ))
                });
            }
        };

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Object(format!("read {id}: {e}")))?;
        Ok(body.into_bytes())
    }
}
