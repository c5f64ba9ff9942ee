//! Application service layer.
//!
//! This module contains the use cases of the gateway. Each one is a short
//! composition of calls to the fullnode and storage abstractions plus field
//! reshaping; the service never owns chain or storage state itself.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{Duration, Utc};
use metrics::counter;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::domain::amount::parse_raw_amount;
use crate::domain::{
    AccountBalances, AppError, Balance, BlobMetadata, BlobStorageClient, BlockchainError,
    CostEstimate, CostQuery, DEFAULT_RATE_PER_GB_MONTH, EntryFunctionPayload, FullnodeClient,
    HealthResponse, HealthStatus, Token, TransactionQuery, TransactionRecord, TransactionSigner,
    UploadReceipt, UploadRequest, ValidationError, ViewRequest, check_blob_name,
    estimate_storage_cost, normalize_address,
};
use crate::infra::observability::{
    BALANCE_QUERIES, BLOB_DOWNLOADS, BLOB_UPLOAD_FAILURES, BLOB_UPLOADS,
};

/// Tunables of the service that come from configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Address of the account publishing the `blob_metadata` module.
    pub shelby_module_address: Option<String>,
    /// Storage price used by cost estimates.
    pub rate_per_gb_month: f64,
    /// How long an upload waits for its registration to commit.
    pub confirmation_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            shelby_module_address: None,
            rate_per_gb_month: DEFAULT_RATE_PER_GB_MONTH,
            confirmation_timeout_secs: 60,
        }
    }
}

/// Application service containing the gateway's use cases.
///
/// Holds references to the trait abstractions, enabling dependency
/// injection and testability.
///
/// # Example
///
/// ```ignore
/// let fullnode = Arc::new(RestFullnodeClient::with_defaults(&node_url)?);
/// let storage = Arc::new(HttpBlobStorageClient::new());
/// let service = AppService::new(fullnode, storage, None, ServiceSettings::default());
///
/// let balances = service.get_balances("0x1").await?;
/// ```
pub struct AppService {
    fullnode: Arc<dyn FullnodeClient>,
    storage: Arc<dyn BlobStorageClient>,
    signer: Option<Arc<dyn TransactionSigner>>,
    settings: ServiceSettings,
}

impl AppService {
    /// Creates a new `AppService` instance.
    ///
    /// # Arguments
    ///
    /// * `fullnode` - Fullnode client for balance, history and submission calls.
    /// * `storage` - Storage client for blob data.
    /// * `signer` - Account signer; uploads are rejected when absent.
    /// * `settings` - Module address, pricing and confirmation timeout.
    #[must_use]
    pub fn new(
        fullnode: Arc<dyn FullnodeClient>,
        storage: Arc<dyn BlobStorageClient>,
        signer: Option<Arc<dyn TransactionSigner>>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            fullnode,
            storage,
            signer,
            settings,
        }
    }

    /// Whether this instance can register and upload blobs.
    #[must_use]
    pub fn uploads_enabled(&self) -> bool {
        self.signer.is_some() && self.settings.shelby_module_address.is_some()
    }

    /// Fetches the balance of one token held by `address`.
    ///
    /// An account without a store for the token reports a zero balance.
    #[instrument(skip(self))]
    pub async fn get_balance(&self, address: &str, token: Token) -> Result<Balance, AppError> {
        let address = normalize_address(address)?;
        self.fetch_balance(&address, token).await
    }

    /// Fetches both token balances of `address` concurrently.
    #[instrument(skip(self))]
    pub async fn get_balances(&self, address: &str) -> Result<AccountBalances, AppError> {
        let address = normalize_address(address)?;
        let (apt, shelby_usd) = tokio::try_join!(
            self.fetch_balance(&address, Token::Apt),
            self.fetch_balance(&address, Token::ShelbyUsd),
        )?;

        Ok(AccountBalances {
            address,
            apt,
            shelby_usd,
        })
    }

    async fn fetch_balance(&self, address: &str, token: Token) -> Result<Balance, AppError> {
        counter!(BALANCE_QUERIES, "token" => token.symbol()).increment(1);

        let request = ViewRequest::balance(address, token);
        match self.fullnode.view(&request).await {
            Ok(values) => {
                let raw = values.first().and_then(parse_raw_amount).ok_or_else(|| {
                    BlockchainError::InvalidResponse(format!(
                        "balance view returned {values:?}"
                    ))
                })?;
                Ok(Balance::from_raw(token, raw))
            }
            Err(AppError::Blockchain(BlockchainError::ResourceNotFound(reason))) => {
                debug!(
                    address = %address,
                    token = %token,
                    reason = %reason,
                    "No asset store, reporting zero"
                );
                Ok(Balance::zero(token))
            }
            Err(e) => Err(e),
        }
    }

    /// Lists the transactions sent by `address`, newest page first as the
    /// fullnode returns them, each tagged with an inferred category.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        address: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let address = normalize_address(address)?;
        let records = self
            .fullnode
            .account_transactions(&address, query.effective_limit(), query.start)
            .await?;
        debug!(count = records.len(), "Listed account transactions");
        Ok(records)
    }

    /// Registers a blob on chain and transfers its data.
    ///
    /// The steps run strictly in order: commitments, registration signed by
    /// the configured account, confirmation, then data transfer. Data is
    /// never sent for a registration that did not commit.
    ///
    /// # Errors
    ///
    /// Returns an `AppError` if:
    /// - Validation fails or uploads are not configured
    /// - Any of the external calls fails; the error is passed through unchanged
    #[instrument(skip(self, request), fields(blob_name = %request.blob_name))]
    pub async fn upload_blob(&self, request: &UploadRequest) -> Result<UploadReceipt, AppError> {
        let result = self.register_and_upload(request).await;
        match &result {
            Ok(receipt) => {
                counter!(BLOB_UPLOADS).increment(1);
                info!(
                    account = %receipt.account,
                    transaction_hash = %receipt.transaction_hash,
                    size = receipt.size,
                    "Blob uploaded"
                );
            }
            Err(e) => {
                counter!(BLOB_UPLOAD_FAILURES).increment(1);
                warn!(error = %e, "Blob upload failed");
            }
        }
        result
    }

    async fn register_and_upload(
        &self,
        request: &UploadRequest,
    ) -> Result<UploadReceipt, AppError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Validation failed for upload request");
            AppError::Validation(ValidationError::Multiple(e.to_string()))
        })?;

        let signer = self.signer.as_ref().ok_or_else(|| {
            AppError::NotSupported("uploads require a configured signing account".to_string())
        })?;
        let module_address = self
            .settings
            .shelby_module_address
            .as_deref()
            .ok_or_else(|| {
                AppError::NotSupported("uploads require SHELBY_MODULE_ADDRESS".to_string())
            })?;

        let data = STANDARD
            .decode(request.data.as_bytes())
            .map_err(|e| ValidationError::InvalidField {
                field: "data".to_string(),
                message: format!("not valid base64: {e}"),
            })?;
        let size = data.len() as u64;
        let account = signer.address().to_string();
        let expires_at = Utc::now() + Duration::days(i64::from(request.expiration_days));

        let commitments = self.storage.generate_commitments(&data).await?;
        debug!(merkle_root = %commitments.merkle_root, "Commitments ready");

        let payload = EntryFunctionPayload::register_blob(
            module_address,
            &request.blob_name,
            expires_at,
            &commitments,
        );
        let transaction_hash = self
            .fullnode
            .submit_entry_function(&payload, signer.as_ref())
            .await?;

        self.fullnode
            .wait_for_confirmation(&transaction_hash, self.settings.confirmation_timeout_secs)
            .await?;

        self.storage
            .put_blob(&account, &request.blob_name, data)
            .await?;

        Ok(UploadReceipt {
            account,
            blob_name: request.blob_name.clone(),
            size,
            merkle_root: commitments.merkle_root,
            transaction_hash,
            expires_at,
        })
    }

    /// Lists the blobs stored by `address`.
    #[instrument(skip(self))]
    pub async fn list_blobs(&self, address: &str) -> Result<Vec<BlobMetadata>, AppError> {
        let address = normalize_address(address)?;
        self.storage.list_blobs(&address).await
    }

    /// Downloads the contents of one blob.
    #[instrument(skip(self))]
    pub async fn download_blob(
        &self,
        address: &str,
        blob_name: &str,
    ) -> Result<Vec<u8>, AppError> {
        let address = normalize_address(address)?;
        check_blob_name(blob_name)?;

        let data = self.storage.get_blob(&address, blob_name).await?;
        counter!(BLOB_DOWNLOADS).increment(1);
        Ok(data)
    }

    /// Estimates the storage cost of a blob using the configured rate.
    pub fn estimate_cost(&self, query: &CostQuery) -> Result<CostEstimate, AppError> {
        query.validate()?;
        Ok(estimate_storage_cost(
            query.size_bytes,
            query.months,
            self.settings.rate_per_gb_month,
        ))
    }

    /// Performs a health check on all dependencies.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthResponse {
        let (fullnode, storage) =
            tokio::join!(self.fullnode.health_check(), self.storage.health_check());

        let fullnode_health = match fullnode {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = ?e, "Fullnode health check failed");
                HealthStatus::Unhealthy
            }
        };

        let storage_health = match storage {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = ?e, "Storage health check failed");
                HealthStatus::Unhealthy
            }
        };

        HealthResponse::new(fullnode_health, storage_health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StorageError, TransactionCategory};
    use crate::test_utils::{
        MockBlobStorageClient, MockFullnodeClient, TEST_ACCOUNT, TEST_MODULE_ADDRESS, test_signer,
    };

    const OWNER: &str = "0x00000000000000000000000000000000000000000000000000000000000b0b";

    fn upload_settings() -> ServiceSettings {
        ServiceSettings {
            shelby_module_address: Some(TEST_MODULE_ADDRESS.to_string()),
            ..ServiceSettings::default()
        }
    }

    fn service_with(
        fullnode: Arc<MockFullnodeClient>,
        storage: Arc<MockBlobStorageClient>,
    ) -> AppService {
        AppService::new(fullnode, storage, Some(test_signer()), upload_settings())
    }

    fn encoded(data: &[u8]) -> String {
        STANDARD.encode(data)
    }

    #[tokio::test]
    async fn test_get_balance_scales_raw_value() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        fullnode.set_balance(OWNER, Token::Apt, 1_234_567_890);
        let service = service_with(fullnode, Arc::new(MockBlobStorageClient::new()));

        let balance = service.get_balance(OWNER, Token::Apt).await.unwrap();
        assert_eq!(balance.raw, 1_234_567_890);
        assert_eq!(balance.amount, 12.3456789);
        assert_eq!(balance.formatted, "12.34567890");
    }

    #[tokio::test]
    async fn test_missing_store_reports_zero() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        let service = service_with(fullnode, Arc::new(MockBlobStorageClient::new()));

        let balance = service.get_balance(OWNER, Token::ShelbyUsd).await.unwrap();
        assert_eq!(balance, Balance::zero(Token::ShelbyUsd));
    }

    #[tokio::test]
    async fn test_other_view_failures_surface() {
        let fullnode = Arc::new(MockFullnodeClient::failing("node exploded"));
        let service = service_with(fullnode, Arc::new(MockBlobStorageClient::new()));

        let result = service.get_balance(OWNER, Token::Apt).await;
        assert!(matches!(
            result,
            Err(AppError::Blockchain(BlockchainError::RpcError(_)))
        ));
    }

    #[tokio::test]
    async fn test_get_balances_queries_both_tokens() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        fullnode.set_balance(OWNER, Token::Apt, 100_000_000);
        fullnode.set_balance(OWNER, Token::ShelbyUsd, 50_000_000);
        let service = service_with(fullnode.clone(), Arc::new(MockBlobStorageClient::new()));

        let balances = service
            .get_balances(&OWNER.to_uppercase().replace("0X", "0x"))
            .await
            .unwrap();
        assert_eq!(balances.address, OWNER);
        assert_eq!(balances.apt.amount, 1.0);
        assert_eq!(balances.shelby_usd.amount, 0.5);
        assert_eq!(fullnode.call_count(), 2);
    }

    #[tokio::test]
    async fn test_get_balance_rejects_bad_address() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        let service = service_with(fullnode.clone(), Arc::new(MockBlobStorageClient::new()));

        let result = service.get_balance("alice", Token::Apt).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(fullnode.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_transactions_clamps_limit() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        for version in 0..150 {
            fullnode.add_transaction(
                OWNER,
                TransactionRecord::new(
                    format!("0x{version:x}"),
                    version,
                    true,
                    5,
                    Utc::now(),
                    Some("0x1::faucet::claim".to_string()),
                ),
            );
        }
        let service = service_with(fullnode, Arc::new(MockBlobStorageClient::new()));

        let query = TransactionQuery {
            limit: Some(1000),
            start: None,
        };
        let records = service.list_transactions(OWNER, &query).await.unwrap();
        assert_eq!(records.len(), 100);
        assert!(records.iter().all(|r| r.category == TransactionCategory::Faucet));
    }

    #[tokio::test]
    async fn test_upload_blob_success() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        let storage = Arc::new(MockBlobStorageClient::new());
        let service = service_with(fullnode.clone(), storage.clone());

        let request = UploadRequest::new("docs/readme.md".to_string(), encoded(b"hello shelby"));
        let receipt = service.upload_blob(&request).await.unwrap();

        assert_eq!(receipt.account, TEST_ACCOUNT);
        assert_eq!(receipt.size, 12);
        assert!(receipt.expires_at > Utc::now() + Duration::days(29));

        let payloads = fullnode.submitted_payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            payloads[0].function,
            format!("{TEST_MODULE_ADDRESS}::blob_metadata::register_blob")
        );
        assert_eq!(payloads[0].arguments[0], "docs/readme.md");
        assert_eq!(payloads[0].arguments[2], receipt.merkle_root.as_str());

        let stored = storage.get_blob(TEST_ACCOUNT, "docs/readme.md").await.unwrap();
        assert_eq!(stored, b"hello shelby");
    }

    #[tokio::test]
    async fn test_upload_blob_confirmation_failure_skips_transfer() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        fullnode.fail_confirmation_with(BlockchainError::InsufficientFunds);
        let storage = Arc::new(MockBlobStorageClient::new());
        let service = service_with(fullnode.clone(), storage.clone());

        let request = UploadRequest::new("a.bin".to_string(), encoded(&[1, 2, 3]));
        let result = service.upload_blob(&request).await;

        assert!(matches!(
            result,
            Err(AppError::Blockchain(BlockchainError::InsufficientFunds))
        ));
        assert_eq!(fullnode.submitted_payloads().len(), 1);
        assert_eq!(storage.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_blob_commitment_failure_skips_submission() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        let storage = Arc::new(MockBlobStorageClient::failing("rpc offline"));
        let service = service_with(fullnode.clone(), storage);

        let request = UploadRequest::new("a.bin".to_string(), encoded(&[1, 2, 3]));
        let result = service.upload_blob(&request).await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        assert!(fullnode.submitted_payloads().is_empty());
    }

    #[tokio::test]
    async fn test_upload_blob_validation_failure() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        let service = service_with(fullnode.clone(), Arc::new(MockBlobStorageClient::new()));

        let request = UploadRequest::new("".to_string(), encoded(b"x"));
        let result = service.upload_blob(&request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let request = UploadRequest::new("x".to_string(), "***".to_string());
        let result = service.upload_blob(&request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert!(fullnode.submitted_payloads().is_empty());
    }

    #[tokio::test]
    async fn test_upload_blob_without_signer_is_not_supported() {
        let service = AppService::new(
            Arc::new(MockFullnodeClient::new()),
            Arc::new(MockBlobStorageClient::new()),
            None,
            upload_settings(),
        );
        assert!(!service.uploads_enabled());

        let request = UploadRequest::new("a".to_string(), encoded(b"x"));
        let result = service.upload_blob(&request).await;
        assert!(matches!(result, Err(AppError::NotSupported(_))));
    }

    #[tokio::test]
    async fn test_download_missing_blob() {
        let service = service_with(
            Arc::new(MockFullnodeClient::new()),
            Arc::new(MockBlobStorageClient::new()),
        );

        let result = service.download_blob(OWNER, "nope.txt").await;
        assert!(matches!(
            result,
            Err(AppError::Storage(StorageError::BlobNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_download_rejects_path_traversal() {
        let service = service_with(
            Arc::new(MockFullnodeClient::new()),
            Arc::new(MockBlobStorageClient::new()),
        );

        let result = service.download_blob(OWNER, "../0xbad/secret.txt").await;
        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::InvalidField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_list_blobs_after_upload() {
        let storage = Arc::new(MockBlobStorageClient::new());
        let service = service_with(Arc::new(MockFullnodeClient::new()), storage);

        for name in ["b.txt", "a.txt"] {
            let request = UploadRequest::new(name.to_string(), encoded(name.as_bytes()));
            service.upload_blob(&request).await.unwrap();
        }

        let blobs = service.list_blobs(TEST_ACCOUNT).await.unwrap();
        let names: Vec<_> = blobs.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_estimate_cost_uses_configured_rate() {
        let service = AppService::new(
            Arc::new(MockFullnodeClient::new()),
            Arc::new(MockBlobStorageClient::new()),
            None,
            ServiceSettings {
                rate_per_gb_month: 0.10,
                ..ServiceSettings::default()
            },
        );

        let estimate = service
            .estimate_cost(&CostQuery {
                size_bytes: 100 * 1024 * 1024,
                months: 12,
            })
            .unwrap();
        assert!((estimate.total - 0.1171875).abs() < 1e-12);

        let invalid = service.estimate_cost(&CostQuery {
            size_bytes: 1,
            months: 0,
        });
        assert!(matches!(invalid, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_health_check_all_healthy() {
        let service = service_with(
            Arc::new(MockFullnodeClient::new()),
            Arc::new(MockBlobStorageClient::new()),
        );

        let health = service.health_check().await;
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_health_check_storage_unhealthy() {
        let storage = Arc::new(MockBlobStorageClient::new());
        storage.set_healthy(false);
        let service = service_with(Arc::new(MockFullnodeClient::new()), storage);

        let health = service.health_check().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.fullnode, HealthStatus::Healthy);
        assert_eq!(health.storage, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_health_check_fullnode_unhealthy() {
        let fullnode = Arc::new(MockFullnodeClient::new());
        fullnode.set_healthy(false);
        let service = service_with(fullnode, Arc::new(MockBlobStorageClient::new()));

        let health = service.health_check().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
    }
}
