//! API module
//!
//! HTTP surface for the ledger core. The engine itself has no wire
//! protocol; these handlers invoke it in-process.

pub mod routes;

pub use routes::{create_router, health_check, AppState};
