//! Error types shared by the service, the clients and the HTTP layer.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum BlockchainError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Fullnode call failed: {0}")]
    RpcError(String),
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Insufficient balance for transaction")]
    InsufficientFunds,
    #[error("Sequence number conflict: {0}")]
    SequenceNumberConflict(String),
    #[error("Timeout waiting for confirmation: {0}")]
    Timeout(String),
    #[error("Unexpected fullnode response: {0}")]
    InvalidResponse(String),
}

impl BlockchainError {
    /// Transport-level failures that are worth another attempt for read calls.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Storage request failed: {0}")]
    RequestFailed(String),
    #[error("Blob not found: {0}")]
    BlobNotFound(String),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Unexpected storage response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Validation failed: {0}")]
    Multiple(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Operation not supported: {0}")]
    NotSupported(String),
    #[error("Rate limit exceeded")]
    RateLimited,
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(ValidationError::Multiple(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_conversion() {
        use validator::Validate;

        #[derive(Validate)]
        struct TestStruct {
            #[validate(length(min = 1))]
            val: String,
        }

        let s = TestStruct {
            val: "".to_string(),
        };
        let err = s.validate().unwrap_err();
        let app_err = AppError::from(err);

        assert!(matches!(
            app_err,
            AppError::Validation(ValidationError::Multiple(_))
        ));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let app_err = AppError::from(json_err);
        assert!(matches!(app_err, AppError::Serialization(_)));
    }

    #[test]
    fn test_blockchain_error_display() {
        let err = BlockchainError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Connection failed: refused");

        let err = BlockchainError::RpcError("500: boom".to_string());
        assert_eq!(err.to_string(), "Fullnode call failed: 500: boom");

        let err = BlockchainError::ResourceNotFound("0x1::store".to_string());
        assert_eq!(err.to_string(), "Resource not found: 0x1::store");

        let err = BlockchainError::InsufficientFunds;
        assert_eq!(err.to_string(), "Insufficient balance for transaction");

        let err = BlockchainError::SequenceNumberConflict("too old".to_string());
        assert_eq!(err.to_string(), "Sequence number conflict: too old");

        let err = BlockchainError::Timeout("30s".to_string());
        assert_eq!(err.to_string(), "Timeout waiting for confirmation: 30s");
    }

    #[test]
    fn test_transient_blockchain_errors() {
        assert!(BlockchainError::Connection("reset".to_string()).is_transient());
        assert!(BlockchainError::Timeout("slow".to_string()).is_transient());
        assert!(!BlockchainError::ResourceNotFound("x".to_string()).is_transient());
        assert!(!BlockchainError::InsufficientFunds.is_transient());
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::BlobNotFound("0xa/photos/cat.png".to_string());
        assert_eq!(err.to_string(), "Blob not found: 0xa/photos/cat.png");

        let err = StorageError::UploadFailed("503".to_string());
        assert_eq!(err.to_string(), "Upload failed: 503");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("API_AUTH_KEY".to_string());
        assert_eq!(err.to_string(), "Missing environment variable: API_AUTH_KEY");

        let err = ConfigError::InvalidValue {
            key: "BIND_ADDR".to_string(),
            message: "not a socket address".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for 'BIND_ADDR': not a socket address"
        );
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Authentication("bad key".to_string());
        assert_eq!(err.to_string(), "Authentication failed: bad key");

        let err = AppError::NotSupported("uploads".to_string());
        assert_eq!(err.to_string(), "Operation not supported: uploads");

        let err = AppError::RateLimited;
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn test_app_error_from_blockchain_error() {
        let bc_err = BlockchainError::Timeout("10s".to_string());
        let app_err: AppError = bc_err.into();
        assert!(matches!(
            app_err,
            AppError::Blockchain(BlockchainError::Timeout(_))
        ));
    }

    #[test]
    fn test_app_error_from_storage_error() {
        let err = StorageError::BlobNotFound("x".to_string());
        let app_err: AppError = err.into();
        assert!(matches!(
            app_err,
            AppError::Storage(StorageError::BlobNotFound(_))
        ));
    }
}
