//! Infrastructure layer implementations.

pub mod blockchain;
pub mod observability;
pub mod storage;

pub use blockchain::{FullnodeClientConfig, LocalSigner, RestFullnodeClient, signing_key_from_hex};
pub use storage::{HttpBlobStorageClient, SHELBY_RPC_URL};
