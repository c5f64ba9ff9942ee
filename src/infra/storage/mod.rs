//! Blob storage service clients.

pub mod shelby;

pub use shelby::{HttpBlobStorageClient, HttpBlobStorageClientBuilder, SHELBY_RPC_URL};
