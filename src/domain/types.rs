use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::amount::{format_amount, raw_to_amount};
use super::classify::classify_function;
use super::error::ValidationError;

/// Hex account address, normalized to lowercase with a `0x` prefix.
pub type AccountAddress = String;

/// Hash of a submitted transaction.
pub type TransactionHash = String;

/// Fungible-asset metadata object for APT.
pub const APT_METADATA: &str = "0xa";

/// Fungible-asset metadata object for ShelbyUSD.
pub const SHELBY_USD_METADATA: &str =
    "0x1b18363a9f1fe5e6ebf247daba5cc1c18052bb232efdc4c50f556053922d98e1";

/// View function returning the primary-store balance of a fungible asset.
pub const BALANCE_VIEW_FUNCTION: &str = "0x1::primary_fungible_store::balance";

/// Type argument accompanying [`BALANCE_VIEW_FUNCTION`].
pub const FUNGIBLE_ASSET_METADATA_TYPE: &str = "0x1::fungible_asset::Metadata";

/// Validates and normalizes an account address.
pub fn normalize_address(input: &str) -> Result<AccountAddress, ValidationError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ValidationError::InvalidField {
            field: "address".to_string(),
            message: "must start with 0x".to_string(),
        })?;

    if digits.is_empty() || digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidField {
            field: "address".to_string(),
            message: "must be 1 to 64 hex digits".to_string(),
        });
    }

    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

/// Tokens whose balances the gateway reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Apt,
    #[serde(rename = "shelbyusd")]
    ShelbyUsd,
}

impl Token {
    /// Fungible-asset metadata address identifying the token.
    #[must_use]
    pub fn metadata_address(self) -> &'static str {
        match self {
            Token::Apt => APT_METADATA,
            Token::ShelbyUsd => SHELBY_USD_METADATA,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Token::Apt => "APT",
            Token::ShelbyUsd => "ShelbyUSD",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Token {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apt" => Ok(Token::Apt),
            "shelbyusd" | "shelby_usd" | "susd" => Ok(Token::ShelbyUsd),
            other => Err(ValidationError::InvalidField {
                field: "token".to_string(),
                message: format!("unknown token '{other}'"),
            }),
        }
    }
}

/// Balance of one token, both raw and scaled for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub token: Token,
    pub raw: u64,
    pub amount: f64,
    pub formatted: String,
}

impl Balance {
    #[must_use]
    pub fn from_raw(token: Token, raw: u64) -> Self {
        Self {
            token,
            raw,
            amount: raw_to_amount(raw),
            formatted: format_amount(raw),
        }
    }

    /// Balance reported for an account whose asset store does not exist.
    #[must_use]
    pub fn zero(token: Token) -> Self {
        Self::from_raw(token, 0)
    }
}

/// Both token balances of an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountBalances {
    pub address: AccountAddress,
    pub apt: Balance,
    pub shelby_usd: Balance,
}

/// Locally inferred kind of an account transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionCategory {
    Upload,
    Transfer,
    Mint,
    Faucet,
    Other,
    Unknown,
}

/// A committed account transaction, reshaped from the fullnode response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: TransactionHash,
    pub version: u64,
    pub success: bool,
    pub gas_used: u64,
    pub timestamp: DateTime<Utc>,
    pub function: Option<String>,
    pub category: TransactionCategory,
}

impl TransactionRecord {
    /// Builds a record, inferring its category from the function name.
    #[must_use]
    pub fn new(
        hash: TransactionHash,
        version: u64,
        success: bool,
        gas_used: u64,
        timestamp: DateTime<Utc>,
        function: Option<String>,
    ) -> Self {
        let category = classify_function(function.as_deref());
        Self {
            hash,
            version,
            success,
            gas_used,
            timestamp,
            function,
            category,
        }
    }
}

/// Metadata of a stored blob as reported by the storage service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobMetadata {
    pub name: String,
    pub content_hash: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Commitments produced by the storage service for a blob's content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobCommitments {
    pub merkle_root: String,
    pub num_chunksets: u64,
    pub raw_size: u64,
}

/// Request body of a view-function call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewRequest {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<serde_json::Value>,
}

impl ViewRequest {
    /// View request for the primary-store balance of `token` held by `owner`.
    #[must_use]
    pub fn balance(owner: &str, token: Token) -> Self {
        Self {
            function: BALANCE_VIEW_FUNCTION.to_string(),
            type_arguments: vec![FUNGIBLE_ASSET_METADATA_TYPE.to_string()],
            arguments: vec![
                serde_json::Value::String(owner.to_string()),
                serde_json::Value::String(token.metadata_address().to_string()),
            ],
        }
    }
}

/// Entry function call carried by a user transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryFunctionPayload {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<serde_json::Value>,
}

impl EntryFunctionPayload {
    /// Registration payload announcing a blob's commitments on chain.
    #[must_use]
    pub fn register_blob(
        module_address: &str,
        blob_name: &str,
        expires_at: DateTime<Utc>,
        commitments: &BlobCommitments,
    ) -> Self {
        Self {
            function: format!("{module_address}::blob_metadata::register_blob"),
            type_arguments: Vec::new(),
            arguments: vec![
                serde_json::Value::String(blob_name.to_string()),
                serde_json::Value::String(expires_at.timestamp_micros().to_string()),
                serde_json::Value::String(commitments.merkle_root.clone()),
                serde_json::Value::String(commitments.num_chunksets.to_string()),
                serde_json::Value::String(commitments.raw_size.to_string()),
            ],
        }
    }
}

fn default_expiration_days() -> u32 {
    30
}

/// Checks that a blob name is a relative path of plain segments.
///
/// Names map one-to-one onto storage URL path segments, so empty, `.` and
/// `..` segments and control characters are rejected.
pub fn check_blob_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidField {
        field: "blob_name".to_string(),
        message: message.to_string(),
    };

    if name.is_empty() {
        return Err(ValidationError::MissingField("blob_name".to_string()));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    if name
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid("must be a relative path without empty, '.' or '..' segments"));
    }
    Ok(())
}

fn validate_blob_name(name: &str) -> Result<(), validator::ValidationError> {
    check_blob_name(name).map_err(|_| validator::ValidationError::new("blob_name_path"))
}

/// Request payload for uploading a blob.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadRequest {
    #[validate(
        length(min = 1, max = 1024, message = "Blob name must be 1-1024 characters"),
        custom(function = "validate_blob_name")
    )]
    pub blob_name: String,

    /// Blob contents, base64 encoded.
    #[validate(length(min = 1, message = "Blob data must not be empty"))]
    pub data: String,

    #[serde(default = "default_expiration_days")]
    #[validate(range(min = 1, max = 3650, message = "Expiration must be 1-3650 days"))]
    pub expiration_days: u32,
}

impl UploadRequest {
    pub fn new(blob_name: String, data: String) -> Self {
        Self {
            blob_name,
            data,
            expiration_days: default_expiration_days(),
        }
    }

    #[must_use]
    pub fn with_expiration_days(mut self, days: u32) -> Self {
        self.expiration_days = days;
        self
    }
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadReceipt {
    pub account: AccountAddress,
    pub blob_name: String,
    pub size: u64,
    pub merkle_root: String,
    pub transaction_hash: TransactionHash,
    pub expires_at: DateTime<Utc>,
}

/// Result of the storage cost formula.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostEstimate {
    pub size_bytes: u64,
    pub size_gb: f64,
    pub months: u32,
    pub rate_per_gb_month: f64,
    pub total: f64,
}

fn default_months() -> u32 {
    1
}

/// Query parameters of a cost estimate.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CostQuery {
    pub size_bytes: u64,
    #[serde(default = "default_months")]
    #[validate(range(min = 1, max = 1200, message = "Months must be 1-1200"))]
    pub months: u32,
}

/// Query parameters of an account transaction listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub limit: Option<u16>,
    pub start: Option<u64>,
}

impl TransactionQuery {
    pub const DEFAULT_LIMIT: u16 = 25;
    pub const MAX_LIMIT: u16 = 100;

    /// Page size clamped to what the fullnode accepts.
    #[must_use]
    pub fn effective_limit(&self) -> u16 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// Error detail for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub r#type: String,
    pub message: String,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Rate limit exceeded response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResponse {
    pub error: ErrorDetail,
    pub retry_after: u64,
}

/// Health check status for services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check response for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub fullnode: HealthStatus,
    pub storage: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn new(fullnode: HealthStatus, storage: HealthStatus) -> Self {
        // Balances and history still work without the storage service.
        let status = match (&fullnode, &storage) {
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        };

        Self {
            status,
            fullnode,
            storage,
            timestamp: Utc::now(),
        }
    }
}
