//! HTTP client for the Shelby storage RPC.
//!
//! Commitment generation, erasure coding and replication all happen behind
//! this service; the client only moves bytes and reshapes responses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::domain::{
    AppError, BlobCommitments, BlobMetadata, BlobStorageClient, StorageError, check_blob_name,
};

/// Default Shelby RPC endpoint.
pub const SHELBY_RPC_URL: &str = "https://api.shelbynet.shelby.xyz/shelby";

/// Builder for HttpBlobStorageClient configuration
pub struct HttpBlobStorageClientBuilder {
    client: Client,
    base_url: String,
}

impl Default for HttpBlobStorageClientBuilder {
    fn default() -> Self {
        Self {
            client: Client::new(),
            base_url: SHELBY_RPC_URL.to_string(),
        }
    }
}

impl HttpBlobStorageClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Set a custom RPC base URL
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn build(self) -> HttpBlobStorageClient {
        HttpBlobStorageClient {
            client: self.client,
            base_url: self.base_url,
        }
    }
}

/// Client for the Shelby storage RPC
pub struct HttpBlobStorageClient {
    client: Client,
    base_url: String,
}

impl Default for HttpBlobStorageClient {
    fn default() -> Self {
        HttpBlobStorageClientBuilder::default().build()
    }
}

/// Blob listing entry as returned by the RPC (timestamps in microseconds)
#[derive(Debug, Deserialize)]
struct WireBlob {
    name: String,
    content_hash: String,
    size: u64,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<WireBlob> for BlobMetadata {
    type Error = StorageError;

    fn try_from(blob: WireBlob) -> Result<Self, Self::Error> {
        let created_at = DateTime::<Utc>::from_timestamp_micros(blob.created_at)
            .ok_or_else(|| StorageError::InvalidResponse("created_at out of range".to_string()))?;
        let expires_at = DateTime::<Utc>::from_timestamp_micros(blob.expires_at)
            .ok_or_else(|| StorageError::InvalidResponse("expires_at out of range".to_string()))?;
        Ok(BlobMetadata {
            name: blob.name,
            content_hash: blob.content_hash,
            size: blob.size,
            created_at,
            expires_at,
        })
    }
}

fn map_transport_error(err: reqwest::Error) -> StorageError {
    if err.is_connect() || err.is_timeout() {
        StorageError::Connection(err.to_string())
    } else {
        StorageError::RequestFailed(err.to_string())
    }
}

async fn error_text(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    format!("{status}: {text}")
}

impl HttpBlobStorageClient {
    /// Create a client for the default endpoint
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a builder to create a customized client
    pub fn builder() -> HttpBlobStorageClientBuilder {
        HttpBlobStorageClientBuilder::default()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/v1/blobs/{account}[/{name segments}]` with every segment
    /// percent-encoded, so a name can never escape its account directory.
    fn blobs_url(&self, account: &str, blob_name: Option<&str>) -> Result<Url, AppError> {
        if let Some(name) = blob_name {
            check_blob_name(name)?;
        }

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            StorageError::RequestFailed(format!("invalid base URL {}: {e}", self.base_url))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                StorageError::RequestFailed(format!(
                    "base URL {} cannot carry a path",
                    self.base_url
                ))
            })?;
            segments.pop_if_empty().extend(["v1", "blobs", account]);
            if let Some(name) = blob_name {
                segments.extend(name.split('/'));
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl BlobStorageClient for HttpBlobStorageClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(StorageError::Connection(error_text(response).await).into());
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn generate_commitments(&self, data: &[u8]) -> Result<BlobCommitments, AppError> {
        let response = self
            .client
            .post(format!("{}/v1/commitments", self.base_url))
            .header("Content-Type", "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(StorageError::RequestFailed(error_text(response).await).into());
        }

        let commitments: BlobCommitments = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;
        debug!(merkle_root = %commitments.merkle_root, "Generated blob commitments");
        Ok(commitments)
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put_blob(
        &self,
        account: &str,
        blob_name: &str,
        data: Vec<u8>,
    ) -> Result<(), AppError> {
        let response = self
            .client
            .put(self.blobs_url(account, Some(blob_name))?)
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(StorageError::UploadFailed(error_text(response).await).into());
        }

        info!(account = %account, blob_name = %blob_name, "Blob data transferred");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_blob(&self, account: &str, blob_name: &str) -> Result<Vec<u8>, AppError> {
        let response = self
            .client
            .get(self.blobs_url(account, Some(blob_name))?)
            .send()
            .await
            .map_err(map_transport_error)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(StorageError::BlobNotFound(format!("{account}/{blob_name}")).into());
            }
            _ => return Err(StorageError::RequestFailed(error_text(response).await).into()),
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self))]
    async fn list_blobs(&self, account: &str) -> Result<Vec<BlobMetadata>, AppError> {
        let response = self
            .client
            .get(self.blobs_url(account, None)?)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(StorageError::RequestFailed(error_text(response).await).into());
        }

        let blobs: Vec<WireBlob> = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        blobs
            .into_iter()
            .map(|blob| BlobMetadata::try_from(blob).map_err(AppError::from))
            .collect()
    }
}
