//! Catalog store: the read-only list of candidate records
//!
//! The catalog is a JSON array of [`CatalogRecord`]s republished weekly by a
//! separate batch job. It is loaded once per invocation.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;
use std::path::PathBuf;

use crate::error::{CatalogError, Result};
use crate::types::CatalogRecord;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch and parse the full catalog
    ///
    /// # Errors
    ///
    /// - `CatalogError::Retrieval` if the blob is missing or unreachable
    /// - `CatalogError::Parse` if the blob is not a JSON array of records
    /// - `CatalogError::Empty` if the array has no records
    async fn load(&self) -> Result<Vec<CatalogRecord>>;

    /// Human-readable location for logs and errors
    fn location(&self) -> String;
}

/// Parse a catalog blob
pub fn parse_catalog(bytes: &[u8], location: &str) -> Result<Vec<CatalogRecord>> {
    let records: Vec<CatalogRecord> = serde_json::from_slice(bytes).map_err(CatalogError::Parse)?;

    if records.is_empty() {
        return Err(CatalogError::Empty(location.to_string()).into());
    }

    Ok(records)
}

pub struct S3CatalogStore {
    client: S3Client,
    bucket: String,
    key: String,
}

impl S3CatalogStore {
    pub fn new(client: S3Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl CatalogStore for S3CatalogStore {
    async fn load(&self) -> Result<Vec<CatalogRecord>> {
        let location = self.location();

        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|e| CatalogError::Retrieval {
                location: location.clone(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| CatalogError::Retrieval {
                location: location.clone(),
                reason: format!("failed to read object body: {}", e),
            })?
            .into_bytes();

        tracing::debug!(location = %location, bytes = bytes.len(), "downloaded catalog");
        parse_catalog(&bytes, &location)
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

pub struct FileCatalogStore {
    path: PathBuf,
}

impl FileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogStore for FileCatalogStore {
    async fn load(&self) -> Result<Vec<CatalogRecord>> {
        let location = self.location();

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CatalogError::Retrieval {
                location: location.clone(),
                reason: e.to_string(),
            })?;

        parse_catalog(&bytes, &location)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
