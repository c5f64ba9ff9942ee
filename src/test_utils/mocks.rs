//! Mock implementations for testing.
//!
//! These mocks provide in-memory implementations of domain traits
//! that can be configured to simulate various scenarios including
//! success, failure, and edge cases.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{
    AppError, BlobCommitments, BlobMetadata, BlobStorageClient, BlockchainError,
    EntryFunctionPayload, FullnodeClient, StorageError, Token, TransactionHash, TransactionRecord,
    TransactionSigner, ViewRequest,
};

/// Bytes covered by one chunkset in mock commitments.
const MOCK_CHUNKSET_SIZE: u64 = 10 * 1024 * 1024;

/// Configuration for mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// If true, operations will fail.
    pub should_fail: bool,
    /// Custom error message for failures.
    pub error_message: Option<String>,
    /// Simulated latency in milliseconds.
    pub latency_ms: Option<u64>,
}

impl MockConfig {
    /// Creates a config that always succeeds.
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// Creates a config that always fails.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
            latency_ms: None,
        }
    }

    /// Adds simulated latency.
    #[must_use]
    pub fn with_latency(mut self, ms: u64) -> Self {
        self.latency_ms = Some(ms);
        self
    }

    async fn simulate_latency(&self) {
        if let Some(ms) = self.latency_ms {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(Sha256::digest(data)))
}

/// Mock fullnode client for testing.
///
/// Balances are keyed by owner and token; an owner without an entry behaves
/// like an account whose asset store was never created.
///
/// # Example
///
/// ```
/// use shelby_blob_gateway::domain::Token;
/// use shelby_blob_gateway::test_utils::{MockFullnodeClient, mocks::MockConfig};
///
/// let mock = MockFullnodeClient::new();
/// mock.set_balance("0x1", Token::Apt, 100_000_000);
///
/// let failing_mock = MockFullnodeClient::with_config(MockConfig::failure("RPC error"));
/// ```
pub struct MockFullnodeClient {
    balances: Arc<Mutex<HashMap<(String, String), u64>>>,
    transactions: Arc<Mutex<HashMap<String, Vec<TransactionRecord>>>>,
    submitted: Arc<Mutex<Vec<EntryFunctionPayload>>>,
    confirmation_error: Mutex<Option<BlockchainError>>,
    config: MockConfig,
    call_count: AtomicU64,
    is_healthy: AtomicBool,
}

impl MockFullnodeClient {
    /// Creates a new mock with default (success) configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    /// Creates a new mock with the given configuration.
    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            balances: Arc::new(Mutex::new(HashMap::new())),
            transactions: Arc::new(Mutex::new(HashMap::new())),
            submitted: Arc::new(Mutex::new(Vec::new())),
            confirmation_error: Mutex::new(None),
            config,
            call_count: AtomicU64::new(0),
            is_healthy: AtomicBool::new(true),
        }
    }

    /// Creates a mock that always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    /// Gets the number of times any method was called.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Sets the health status.
    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    /// Seeds the raw balance of `token` held by `owner`.
    pub fn set_balance(&self, owner: &str, token: Token, raw: u64) {
        self.balances.lock().unwrap().insert(
            (owner.to_ascii_lowercase(), token.metadata_address().to_string()),
            raw,
        );
    }

    /// Appends a committed transaction to the history of `sender`.
    pub fn add_transaction(&self, sender: &str, record: TransactionRecord) {
        self.transactions
            .lock()
            .unwrap()
            .entry(sender.to_ascii_lowercase())
            .or_default()
            .push(record);
    }

    /// Makes every subsequent confirmation wait fail with `error`.
    pub fn fail_confirmation_with(&self, error: BlockchainError) {
        *self.confirmation_error.lock().unwrap() = Some(error);
    }

    /// Gets all submitted payloads.
    pub fn submitted_payloads(&self) -> Vec<EntryFunctionPayload> {
        self.submitted.lock().unwrap().clone()
    }

    fn increment_call_count(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock fullnode error".to_string());
            return Err(AppError::Blockchain(BlockchainError::RpcError(msg)));
        }
        Ok(())
    }
}

impl Default for MockFullnodeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FullnodeClient for MockFullnodeClient {
    async fn health_check(&self) -> Result<(), AppError> {
        self.increment_call_count();

        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Blockchain(BlockchainError::Connection(
                "Mock fullnode unhealthy".to_string(),
            )));
        }

        self.check_should_fail()
    }

    async fn view(&self, request: &ViewRequest) -> Result<Vec<serde_json::Value>, AppError> {
        self.increment_call_count();
        self.config.simulate_latency().await;
        self.check_should_fail()?;

        let arg = |i: usize| {
            request
                .arguments
                .get(i)
                .and_then(|v| v.as_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default()
        };
        let key = (arg(0), arg(1));

        let balances = self.balances.lock().unwrap();
        match balances.get(&key) {
            Some(raw) => Ok(vec![serde_json::Value::String(raw.to_string())]),
            None => Err(AppError::Blockchain(BlockchainError::ResourceNotFound(
                format!("primary store of {} for {}", key.1, key.0),
            ))),
        }
    }

    async fn account_transactions(
        &self,
        address: &str,
        limit: u16,
        start: Option<u64>,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        self.increment_call_count();
        self.check_should_fail()?;

        let transactions = self.transactions.lock().unwrap();
        let records = transactions
            .get(&address.to_ascii_lowercase())
            .map(|records| {
                records
                    .iter()
                    .filter(|r| start.is_none_or(|s| r.version >= s))
                    .take(usize::from(limit))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn submit_entry_function(
        &self,
        payload: &EntryFunctionPayload,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionHash, AppError> {
        self.increment_call_count();
        self.check_should_fail()?;

        let signature = signer.sign_message(payload.function.as_bytes()).await?;
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(payload.clone());

        Ok(sha256_hex(
            format!("{}:{}:{}", signer.address(), submitted.len(), signature).as_bytes(),
        ))
    }

    async fn wait_for_confirmation(&self, hash: &str, _timeout_secs: u64) -> Result<(), AppError> {
        self.increment_call_count();
        self.check_should_fail()?;

        if let Some(error) = self.confirmation_error.lock().unwrap().clone() {
            return Err(error.into());
        }
        if hash.is_empty() {
            return Err(BlockchainError::TransactionFailed("empty hash".to_string()).into());
        }
        Ok(())
    }
}

/// Mock blob storage client for testing.
///
/// Keeps blob contents in memory; commitments are derived from a SHA-256
/// digest of the data.
pub struct MockBlobStorageClient {
    blobs: Arc<Mutex<HashMap<(String, String), (Vec<u8>, BlobMetadata)>>>,
    config: MockConfig,
    call_count: AtomicU64,
    is_healthy: AtomicBool,
}

impl MockBlobStorageClient {
    /// Creates a new mock with default (success) configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    /// Creates a new mock with the given configuration.
    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
            config,
            call_count: AtomicU64::new(0),
            is_healthy: AtomicBool::new(true),
        }
    }

    /// Creates a mock that always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    /// Gets the number of times any method was called.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Sets the health status.
    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    /// Number of stored blobs across all accounts.
    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    fn increment_call_count(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock storage error".to_string());
            return Err(AppError::Storage(StorageError::Connection(msg)));
        }
        Ok(())
    }
}

impl Default for MockBlobStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStorageClient for MockBlobStorageClient {
    async fn health_check(&self) -> Result<(), AppError> {
        self.increment_call_count();

        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Storage(StorageError::Connection(
                "Mock storage unhealthy".to_string(),
            )));
        }

        self.check_should_fail()
    }

    async fn generate_commitments(&self, data: &[u8]) -> Result<BlobCommitments, AppError> {
        self.increment_call_count();
        self.config.simulate_latency().await;
        self.check_should_fail()?;

        let raw_size = data.len() as u64;
        Ok(BlobCommitments {
            merkle_root: sha256_hex(data),
            num_chunksets: raw_size.div_ceil(MOCK_CHUNKSET_SIZE).max(1),
            raw_size,
        })
    }

    async fn put_blob(
        &self,
        account: &str,
        blob_name: &str,
        data: Vec<u8>,
    ) -> Result<(), AppError> {
        self.increment_call_count();
        self.check_should_fail()?;

        let now = Utc::now();
        let metadata = BlobMetadata {
            name: blob_name.to_string(),
            content_hash: sha256_hex(&data),
            size: data.len() as u64,
            created_at: now,
            expires_at: now + Duration::days(30),
        };

        self.blobs.lock().unwrap().insert(
            (account.to_ascii_lowercase(), blob_name.to_string()),
            (data, metadata),
        );
        Ok(())
    }

    async fn get_blob(&self, account: &str, blob_name: &str) -> Result<Vec<u8>, AppError> {
        self.increment_call_count();
        self.check_should_fail()?;

        let blobs = self.blobs.lock().unwrap();
        blobs
            .get(&(account.to_ascii_lowercase(), blob_name.to_string()))
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::BlobNotFound(format!("{account}/{blob_name}")).into())
    }

    async fn list_blobs(&self, account: &str) -> Result<Vec<BlobMetadata>, AppError> {
        self.increment_call_count();
        self.check_should_fail()?;

        let account = account.to_ascii_lowercase();
        let blobs = self.blobs.lock().unwrap();
        let mut listed: Vec<BlobMetadata> = blobs
            .iter()
            .filter(|((owner, _), _)| *owner == account)
            .map(|(_, (_, metadata))| metadata.clone())
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }
}
