//! credit_ledger Library
//!
//! Peer-to-peer credit transfer ledger: a transactional mutation engine
//! that debits one account, credits another, and appends an audit record
//! as a single atomic unit, with optimistic-conflict retry.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod store;

mod error;

pub use config::Config;
pub use domain::{AccountId, Amount, AmountError, Balance, OperationContext, TransferRecord};
pub use engine::{ErrorKind, RetryPolicy, TransferEngine, TransferRequest, TransferResult};
pub use error::{AppError, AppResult};
pub use store::{LedgerStore, MemoryLedgerStore, PgLedgerStore, StoreError};
