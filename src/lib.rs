//! Shelby Blob Gateway
//!
//! An HTTP gateway over the Shelby storage network: token balances and
//! account history read from an Aptos fullnode, blob registration and
//! upload, blob listing and download, and storage cost estimates.
//!
//! # Architecture Overview
//!
//! This crate is organized into four main layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   API Layer                  │
//! │   HTTP handlers, routing, auth, rate limits  │
//! ├─────────────────────────────────────────────┤
//! │               Application Layer              │
//! │     Use cases composing fullnode + storage   │
//! ├─────────────────────────────────────────────┤
//! │                 Domain Layer                 │
//! │  Traits, types, amounts, pricing, errors     │
//! ├─────────────────────────────────────────────┤
//! │             Infrastructure Layer             │
//! │ Fullnode REST client, signer, storage client │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! External systems sit behind the `FullnodeClient`, `TransactionSigner`
//! and `BlobStorageClient` traits; the in-memory mocks in `test_utils`
//! (feature `test-utils`) stand in for them in tests.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use shelby_blob_gateway::api::create_router;
//! use shelby_blob_gateway::app::{AppService, AppState, ServiceSettings};
//! use shelby_blob_gateway::infra::{HttpBlobStorageClient, RestFullnodeClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fullnode = Arc::new(RestFullnodeClient::with_defaults(&node_url)?);
//!     let storage = Arc::new(HttpBlobStorageClient::new());
//!     let service = AppService::new(fullnode, storage, None, ServiceSettings::default());
//!
//!     let state = Arc::new(AppState::new(Arc::new(service), api_key));
//!     let router = create_router(state);
//!     axum::serve(listener, router).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod infra;

// Test utilities are available in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
