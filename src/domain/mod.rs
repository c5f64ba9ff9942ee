//! Domain layer containing core business types, traits, and error definitions.

pub mod amount;
pub mod classify;
pub mod error;
pub mod pricing;
pub mod traits;
pub mod types;

pub use amount::{OCTAS_PER_UNIT, format_amount, raw_to_amount};
pub use classify::classify_function;
pub use error::{AppError, BlockchainError, ConfigError, StorageError, ValidationError};
pub use pricing::{DEFAULT_RATE_PER_GB_MONTH, estimate_storage_cost};
pub use traits::{BlobStorageClient, FullnodeClient, TransactionSigner};
pub use types::{
    APT_METADATA, AccountAddress, AccountBalances, Balance, BlobCommitments, BlobMetadata,
    CostEstimate, CostQuery, EntryFunctionPayload, ErrorDetail, ErrorResponse, HealthResponse,
    HealthStatus, RateLimitResponse, SHELBY_USD_METADATA, Token, TransactionCategory,
    TransactionHash, TransactionQuery, TransactionRecord, UploadReceipt, UploadRequest,
    ViewRequest, check_blob_name, normalize_address,
};
