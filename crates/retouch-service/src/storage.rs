//! Object-storage collaborator.
//!
//! Storage is invoked, not designed, by this service: the `ObjectStorage`
//! trait takes a provider-side image URL and returns the public URL of a
//! durable copy. The bundled implementation streams the source through an
//! HTTP upload endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// HTTP timeout for storage transfers.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storage API returned an error response.
    #[error("storage API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the storage service.
        message: String,
    },
}

/// Durable image persistence behind a trait seam.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Copy the image at `source_url` into durable storage and return
    /// the public URL of the copy.
    async fn persist(&self, source_url: &str) -> Result<String, StorageError>;
}

/// HTTP upload-endpoint storage implementation.
#[derive(Debug, Clone)]
pub struct BucketStorage {
    client: Client,
    upload_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

impl BucketStorage {
    /// Create a new storage client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(upload_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(TRANSFER_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            upload_url: upload_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ObjectStorage for BucketStorage {
    async fn persist(&self, source_url: &str) -> Result<String, StorageError> {
        let download = self.client.get(source_url).send().await?;
        let status = download.status();
        if !status.is_success() {
            return Err(StorageError::Api {
                status: status.as_u16(),
                message: format!("fetching {source_url} failed"),
            });
        }
        let bytes = download.bytes().await?;

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse = response.json().await?;
        Ok(parsed.url)
    }
}
