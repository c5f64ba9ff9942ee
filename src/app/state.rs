//! Application state management.
//!
//! This module provides the shared application state that is
//! accessible to all request handlers via Axum's State extractor.

use std::sync::Arc;

use secrecy::SecretString;

use crate::infra::observability::PrometheusHandle;

use super::service::AppService;

/// Shared application state for the Axum web server.
///
/// # Thread Safety
///
/// All contained types are wrapped in `Arc` and implement `Send + Sync`,
/// making `AppState` safe to share across async tasks.
///
/// # Example
///
/// ```ignore
/// let service = Arc::new(AppService::new(fullnode, storage, signer, settings));
/// let state = AppState::new(service, SecretString::from(api_key));
///
/// let router = create_router(Arc::new(state));
/// ```
#[derive(Clone)]
pub struct AppState {
    /// The application service containing the gateway's use cases.
    pub service: Arc<AppService>,

    /// Key required in `x-api-key` on mutating requests.
    pub api_auth_key: Arc<SecretString>,

    /// Scrape handle; `/metrics` answers 404 without one.
    pub metrics: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    /// Creates a new `AppState` without a metrics handle.
    #[must_use]
    pub fn new(service: Arc<AppService>, api_auth_key: SecretString) -> Self {
        Self {
            service,
            api_auth_key: Arc::new(api_auth_key),
            metrics: None,
        }
    }

    /// Attaches the Prometheus handle used by `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: Option<Arc<PrometheusHandle>>) -> Self {
        self.metrics = handle;
        self
    }
}
