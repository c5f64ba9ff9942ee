//! Test utilities and mock implementations.
//!
//! This module provides reusable mock implementations of domain traits
//! for use in unit and integration tests.

pub mod mocks;

use std::sync::Arc;

use secrecy::SecretString;

use crate::domain::TransactionSigner;
use crate::infra::LocalSigner;

pub use mocks::{MockBlobStorageClient, MockFullnodeClient};

/// Account the test signer acts for.
pub const TEST_ACCOUNT: &str = "0xcafe";

/// Module address used for blob registration in tests.
pub const TEST_MODULE_ADDRESS: &str = "0x5be1b7";

/// Fixed ed25519 seed of the test signer.
pub const TEST_PRIVATE_KEY: &str =
    "0x0707070707070707070707070707070707070707070707070707070707070707";

/// Signer with a fixed key, acting for [`TEST_ACCOUNT`].
#[must_use]
pub fn test_signer() -> Arc<dyn TransactionSigner> {
    let signer = LocalSigner::new(SecretString::from(TEST_PRIVATE_KEY.to_string()), TEST_ACCOUNT)
        .expect("test key is valid");
    Arc::new(signer)
}
