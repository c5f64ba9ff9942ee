//! Fullnode client and transaction signer implementations.

pub mod aptos;
pub mod signer;

pub use aptos::{FullnodeClientConfig, RestFullnodeClient};
pub use signer::{LocalSigner, signing_key_from_hex};
