//! HTTP request handlers and error-to-response mapping.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::app::AppState;
use crate::domain::{
    AccountBalances, AppError, Balance, BlobMetadata, BlockchainError, CostEstimate, CostQuery,
    ErrorDetail, ErrorResponse, HealthResponse, HealthStatus, StorageError, Token,
    TransactionQuery, TransactionRecord, UploadReceipt, UploadRequest,
};

/// Both token balances of an account
pub async fn get_balances_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<AccountBalances>, AppError> {
    let balances = state.service.get_balances(&address).await?;
    Ok(Json(balances))
}

/// Balance of a single token
pub async fn get_balance_handler(
    State(state): State<Arc<AppState>>,
    Path((address, token)): Path<(String, String)>,
) -> Result<Json<Balance>, AppError> {
    let token: Token = token.parse()?;
    let balance = state.service.get_balance(&address, token).await?;
    Ok(Json(balance))
}

/// Transactions sent by an account
pub async fn list_transactions_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    let records = state.service.list_transactions(&address, &query).await?;
    Ok(Json(records))
}

/// Blobs stored by an account
pub async fn list_blobs_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<Vec<BlobMetadata>>, AppError> {
    let blobs = state.service.list_blobs(&address).await?;
    Ok(Json(blobs))
}

/// Raw contents of one blob
pub async fn download_blob_handler(
    State(state): State<Arc<AppState>>,
    Path((address, blob_name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let data = state.service.download_blob(&address, &blob_name).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    )
        .into_response())
}

/// Register and upload a blob
pub async fn upload_blob_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadReceipt>), AppError> {
    let receipt = state.service.upload_blob(&payload).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Storage cost estimate
pub async fn estimate_cost_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CostQuery>,
) -> Result<Json<CostEstimate>, AppError> {
    let estimate = state.service.estimate_cost(&query)?;
    Ok(Json(estimate))
}

/// Detailed health check
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Kubernetes liveness probe
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.service.health_check().await;
    match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Prometheus scrape output
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

impl AppError {
    /// HTTP status and stable error type reported for this error.
    #[must_use]
    pub fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Blockchain(bc_err) => match bc_err {
                BlockchainError::Connection(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "blockchain_error")
                }
                BlockchainError::ResourceNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                BlockchainError::InsufficientFunds => {
                    (StatusCode::PAYMENT_REQUIRED, "insufficient_funds")
                }
                BlockchainError::SequenceNumberConflict(_) => {
                    (StatusCode::CONFLICT, "sequence_number_conflict")
                }
                BlockchainError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                BlockchainError::TransactionFailed(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "transaction_failed")
                }
                BlockchainError::RpcError(_) | BlockchainError::InvalidResponse(_) => {
                    (StatusCode::BAD_GATEWAY, "blockchain_error")
                }
                BlockchainError::InvalidSignature(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "blockchain_error")
                }
            },
            AppError::Storage(storage_err) => match storage_err {
                StorageError::Connection(_) => (StatusCode::SERVICE_UNAVAILABLE, "storage_error"),
                StorageError::BlobNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                _ => (StatusCode::BAD_GATEWAY, "storage_error"),
            },
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication_error"),
            AppError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::NotSupported(_) => (StatusCode::NOT_IMPLEMENTED, "not_supported"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        let message = self.to_string();

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationError;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::Blockchain(BlockchainError::ResourceNotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Blockchain(BlockchainError::InsufficientFunds),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                AppError::Blockchain(BlockchainError::SequenceNumberConflict("x".into())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Blockchain(BlockchainError::Timeout("x".into())),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                AppError::Storage(StorageError::BlobNotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Validation(ValidationError::MissingField("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::NotSupported("x".into()),
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                AppError::Authentication("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_and_type().0, expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response =
            AppError::Blockchain(BlockchainError::InsufficientFunds).into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["type"], "insufficient_funds");
        assert_eq!(body["error"]["message"], "Insufficient balance for transaction");
    }
}
