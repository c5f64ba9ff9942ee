//! Domain traits defining contracts for external systems.

use async_trait::async_trait;

use super::error::{AppError, BlockchainError};
use super::types::{
    BlobCommitments, BlobMetadata, EntryFunctionPayload, TransactionHash, TransactionRecord,
    ViewRequest,
};

/// Fullnode REST client for reads, submission and confirmation
#[async_trait]
pub trait FullnodeClient: Send + Sync {
    /// Check fullnode connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Execute a view function and return its raw result values
    async fn view(&self, request: &ViewRequest) -> Result<Vec<serde_json::Value>, AppError>;

    /// List committed transactions sent by an account
    async fn account_transactions(
        &self,
        address: &str,
        limit: u16,
        start: Option<u64>,
    ) -> Result<Vec<TransactionRecord>, AppError>;

    /// Build, sign and submit a transaction carrying `payload`
    async fn submit_entry_function(
        &self,
        payload: &EntryFunctionPayload,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionHash, AppError> {
        let _ = (payload, signer);
        Err(AppError::NotSupported(
            "submit_entry_function not implemented".to_string(),
        ))
    }

    /// Wait until a submitted transaction is committed successfully
    async fn wait_for_confirmation(&self, hash: &str, timeout_secs: u64) -> Result<(), AppError> {
        let _ = (hash, timeout_secs);
        Err(AppError::NotSupported(
            "wait_for_confirmation not implemented".to_string(),
        ))
    }
}

/// Signs transactions on behalf of the uploading account.
///
/// Keeps key material out of the fullnode client so that remote signers can
/// be swapped in without touching the submission flow.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Account address the signer acts for
    fn address(&self) -> &str;

    /// Hex-encoded ed25519 public key with `0x` prefix
    fn public_key_hex(&self) -> String;

    /// Sign a message and return the hex-encoded signature with `0x` prefix
    async fn sign_message(&self, message: &[u8]) -> Result<String, BlockchainError>;
}

/// Blob storage service: commitments, data transfer and listing
#[async_trait]
pub trait BlobStorageClient: Send + Sync {
    /// Check storage service connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Compute the commitments that must be registered on chain for `data`
    async fn generate_commitments(&self, data: &[u8]) -> Result<BlobCommitments, AppError>;

    /// Transfer the bytes of a registered blob to the storage network
    async fn put_blob(&self, account: &str, blob_name: &str, data: Vec<u8>)
    -> Result<(), AppError>;

    /// Fetch the bytes of a blob
    async fn get_blob(&self, account: &str, blob_name: &str) -> Result<Vec<u8>, AppError>;

    /// List the blobs owned by an account
    async fn list_blobs(&self, account: &str) -> Result<Vec<BlobMetadata>, AppError>;
}
