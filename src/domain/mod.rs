//! Domain module
//!
//! Core domain types shared by the engine and the stores.

pub mod amount;
pub mod context;
pub mod record;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use record::{AccountId, TransferRecord};
