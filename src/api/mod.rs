//! HTTP API module for health, metrics, and scan result endpoints.

pub mod handlers;
pub mod routes;

pub use handlers::{AppState, ScanSummary};
pub use routes::create_router;
