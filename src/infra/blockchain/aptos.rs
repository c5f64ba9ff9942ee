//! Aptos fullnode REST client.
//!
//! Reads (view functions, account history) are retried on transport
//! failures. Submissions are never retried: a resubmitted transaction with a
//! stale sequence number would surface as a conflict instead of the
//! original outcome.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    AppError, BlockchainError, EntryFunctionPayload, FullnodeClient, TransactionHash,
    TransactionRecord, TransactionSigner, ViewRequest,
};

/// Configuration for the fullnode client
#[derive(Debug, Clone)]
pub struct FullnodeClientConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    /// Seconds a submitted transaction stays valid
    pub expiration_secs: u64,
}

impl Default for FullnodeClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            poll_interval: Duration::from_millis(500),
            max_gas_amount: 200_000,
            gas_unit_price: 100,
            expiration_secs: 60,
        }
    }
}

/// Fullnode REST client
pub struct RestFullnodeClient {
    http_client: Client,
    base_url: String,
    config: FullnodeClientConfig,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(default)]
    function: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTransaction {
    #[serde(rename = "type")]
    kind: String,
    hash: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    vm_status: Option<String>,
    #[serde(default)]
    payload: Option<WirePayload>,
}

#[derive(Debug, Serialize)]
struct WireEntryFunction<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a str,
    type_arguments: &'a [String],
    arguments: &'a [serde_json::Value],
}

#[derive(Debug, Serialize)]
struct UserTransactionRequest<'a> {
    sender: &'a str,
    sequence_number: String,
    max_gas_amount: String,
    gas_unit_price: String,
    expiration_timestamp_secs: String,
    payload: WireEntryFunction<'a>,
}

#[derive(Debug, Serialize)]
struct Ed25519Signature {
    #[serde(rename = "type")]
    kind: &'static str,
    public_key: String,
    signature: String,
}

#[derive(Debug, Serialize)]
struct SignedTransactionRequest<'a> {
    #[serde(flatten)]
    request: &'a UserTransactionRequest<'a>,
    signature: Ed25519Signature,
}

#[derive(Debug, Deserialize)]
struct PendingTransaction {
    hash: String,
}

fn parse_u64(field: &str, value: Option<&str>) -> Result<u64, BlockchainError> {
    value
        .ok_or_else(|| BlockchainError::InvalidResponse(format!("missing {field}")))?
        .parse()
        .map_err(|e| BlockchainError::InvalidResponse(format!("invalid {field}: {e}")))
}

impl TryFrom<WireTransaction> for TransactionRecord {
    type Error = BlockchainError;

    fn try_from(tx: WireTransaction) -> Result<Self, Self::Error> {
        let version = parse_u64("version", tx.version.as_deref())?;
        let micros = parse_u64("timestamp", tx.timestamp.as_deref())?;
        let micros = i64::try_from(micros)
            .map_err(|_| BlockchainError::InvalidResponse("timestamp out of range".to_string()))?;
        let timestamp = DateTime::<Utc>::from_timestamp_micros(micros)
            .ok_or_else(|| BlockchainError::InvalidResponse("timestamp out of range".to_string()))?;
        let gas_used = tx
            .gas_used
            .as_deref()
            .map(|g| parse_u64("gas_used", Some(g)))
            .transpose()?
            .unwrap_or(0);

        Ok(TransactionRecord::new(
            tx.hash,
            version,
            tx.success.unwrap_or(false),
            gas_used,
            timestamp,
            tx.payload.and_then(|p| p.function),
        ))
    }
}

/// Translate a non-success fullnode response into a domain error.
///
/// Only a structured Aptos error body can say a resource is missing. A bare
/// 404 (wrong base path, proxy page) is an RPC failure, not an empty account.
fn map_api_error(status: StatusCode, body: &str) -> BlockchainError {
    let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) else {
        return status_error(status, body);
    };
    let message = parsed.message;
    let code = parsed.error_code.unwrap_or_default();
    let lowered = message.to_ascii_lowercase();

    if matches!(
        code.as_str(),
        "resource_not_found" | "account_not_found" | "transaction_not_found"
    ) || lowered.contains("resource_not_found")
        || lowered.contains("resource not found")
        || lowered.contains("resource_does_not_exist")
    {
        return BlockchainError::ResourceNotFound(message);
    }

    if matches!(
        code.as_str(),
        "sequence_number_too_old" | "sequence_number_too_new" | "invalid_transaction_update"
    ) || lowered.contains("sequence_number_too_old")
        || lowered.contains("sequence_number_too_new")
    {
        return BlockchainError::SequenceNumberConflict(message);
    }

    if lowered.contains("insufficient_balance") {
        return BlockchainError::InsufficientFunds;
    }

    status_error(status, &message)
}

fn status_error(status: StatusCode, body: &str) -> BlockchainError {
    if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) {
        BlockchainError::Connection(format!("{status}: {body}"))
    } else {
        BlockchainError::RpcError(format!("{status}: {body}"))
    }
}

fn map_transport_error(err: reqwest::Error) -> BlockchainError {
    if err.is_timeout() {
        BlockchainError::Timeout(err.to_string())
    } else if err.is_connect() {
        BlockchainError::Connection(err.to_string())
    } else {
        BlockchainError::RpcError(err.to_string())
    }
}

async fn read_json<R: DeserializeOwned>(response: Response) -> Result<R, AppError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<R>()
            .await
            .map_err(|e| BlockchainError::InvalidResponse(e.to_string()).into());
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_api_error(status, &body).into())
}

impl RestFullnodeClient {
    /// Create a new fullnode client with custom configuration
    pub fn new(base_url: &str, config: FullnodeClientConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Blockchain(BlockchainError::Connection(e.to_string())))?;
        info!(base_url = %base_url, "Created fullnode client");
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    /// Create a new fullnode client with default configuration
    pub fn with_defaults(base_url: &str) -> Result<Self, AppError> {
        Self::new(base_url, FullnodeClientConfig::default())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Run a read call, retrying transient transport failures
    async fn with_retries<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(AppError::Blockchain(e))
                    if e.is_transient() && attempt < self.config.max_retries =>
                {
                    warn!(
                        attempt = attempt,
                        error = %e,
                        operation = %operation,
                        "Fullnode call failed"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<R, AppError> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_json(response).await
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AppError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_json(response).await
    }

    async fn sequence_number(&self, address: &str) -> Result<u64, AppError> {
        let path = format!("/accounts/{address}");
        let account: AccountData = self
            .with_retries("get_account", || self.get_json(&path, &[]))
            .await?;
        Ok(parse_u64("sequence_number", Some(&account.sequence_number))?)
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<WireTransaction, AppError> {
        self.get_json(&format!("/transactions/by_hash/{hash}"), &[])
            .await
    }
}

#[async_trait]
impl FullnodeClient for RestFullnodeClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let _: serde_json::Value = self
            .with_retries("ledger_info", || self.get_json("/", &[]))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(function = %request.function))]
    async fn view(&self, request: &ViewRequest) -> Result<Vec<serde_json::Value>, AppError> {
        self.with_retries("view", || self.post_json("/view", request))
            .await
    }

    #[instrument(skip(self))]
    async fn account_transactions(
        &self,
        address: &str,
        limit: u16,
        start: Option<u64>,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let path = format!("/accounts/{address}/transactions");
        let mut query = vec![("limit", limit.to_string())];
        if let Some(start) = start {
            query.push(("start", start.to_string()));
        }

        let transactions: Vec<WireTransaction> = self
            .with_retries("account_transactions", || self.get_json(&path, &query))
            .await?;
        debug!(count = transactions.len(), "Fetched account transactions");

        transactions
            .into_iter()
            .map(|tx| TransactionRecord::try_from(tx).map_err(AppError::from))
            .collect()
    }

    #[instrument(
        skip(self, payload, signer),
        fields(function = %payload.function, sender = %signer.address())
    )]
    async fn submit_entry_function(
        &self,
        payload: &EntryFunctionPayload,
        signer: &dyn TransactionSigner,
    ) -> Result<TransactionHash, AppError> {
        let sequence_number = self.sequence_number(signer.address()).await?;
        let expiration = Utc::now().timestamp() as u64 + self.config.expiration_secs;

        let request = UserTransactionRequest {
            sender: signer.address(),
            sequence_number: sequence_number.to_string(),
            max_gas_amount: self.config.max_gas_amount.to_string(),
            gas_unit_price: self.config.gas_unit_price.to_string(),
            expiration_timestamp_secs: expiration.to_string(),
            payload: WireEntryFunction {
                kind: "entry_function_payload",
                function: &payload.function,
                type_arguments: &payload.type_arguments,
                arguments: &payload.arguments,
            },
        };

        let signing_message: String = self
            .post_json("/transactions/encode_submission", &request)
            .await?;
        let message = hex::decode(signing_message.trim_start_matches("0x")).map_err(|e| {
            BlockchainError::InvalidResponse(format!("signing message is not hex: {e}"))
        })?;
        debug!(sequence_number = sequence_number, "Encoded transaction for signing");

        let signature = signer.sign_message(&message).await?;
        let signed = SignedTransactionRequest {
            request: &request,
            signature: Ed25519Signature {
                kind: "ed25519_signature",
                public_key: signer.public_key_hex(),
                signature,
            },
        };

        let pending: PendingTransaction = self.post_json("/transactions", &signed).await?;
        info!(hash = %pending.hash, "Transaction submitted");
        Ok(pending.hash)
    }

    #[instrument(skip(self))]
    async fn wait_for_confirmation(&self, hash: &str, timeout_secs: u64) -> Result<(), AppError> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);

        loop {
            match self.transaction_by_hash(hash).await {
                Ok(tx) if tx.kind == "pending_transaction" => {
                    debug!(hash = %hash, "Transaction still pending");
                }
                Ok(tx) => {
                    if tx.success.unwrap_or(false) {
                        info!(hash = %hash, "Transaction confirmed");
                        return Ok(());
                    }
                    let vm_status = tx.vm_status.unwrap_or_else(|| "unknown".to_string());
                    if vm_status.to_ascii_lowercase().contains("insufficient_balance") {
                        return Err(BlockchainError::InsufficientFunds.into());
                    }
                    return Err(BlockchainError::TransactionFailed(vm_status).into());
                }
                Err(AppError::Blockchain(BlockchainError::ResourceNotFound(_))) => {
                    debug!(hash = %hash, "Transaction not yet visible");
                }
                Err(AppError::Blockchain(e)) if e.is_transient() => {
                    warn!(hash = %hash, error = %e, "Error checking transaction status");
                }
                Err(e) => return Err(e),
            }

            // Checked after the query so a zero timeout still polls once.
            if tokio::time::Instant::now() >= deadline {
                return Err(AppError::Blockchain(BlockchainError::Timeout(format!(
                    "Transaction {hash} not confirmed within {timeout_secs}s"
                ))));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
