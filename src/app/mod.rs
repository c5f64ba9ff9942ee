//! Application layer containing the gateway's use cases and shared state.

pub mod service;
pub mod state;

pub use service::{AppService, ServiceSettings};
pub use state::AppState;
