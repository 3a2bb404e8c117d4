//! Ledger storage
//!
//! The atomic multi-record transaction abstraction the transfer engine runs
//! on. A store reads consistent snapshots of the two touched accounts,
//! hands them to a closure, and commits the writes the closure returns
//! either completely or not at all. Conflicting concurrent writes are
//! detected optimistically via per-account versions and surface as
//! [`StoreError::WriteConflict`]; retrying is the engine's job, not the
//! store's.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{AccountId, Amount, AmountError, Balance, TransferRecord};

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// One account as read inside a transaction attempt.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub balance: Balance,
    /// Optimistic-concurrency version; bumped on every committed write.
    pub version: i64,
}

/// Consistent view of both accounts involved in a transfer.
#[derive(Debug, Clone)]
pub struct TransferSnapshot {
    pub sender: AccountSnapshot,
    pub recipient: AccountSnapshot,
}

/// Writes produced by the transfer closure. The store applies all of them
/// plus one appended [`TransferRecord`] in a single commit, or nothing.
#[derive(Debug, Clone)]
pub struct TransferWrites {
    pub sender_balance: Balance,
    pub recipient_balance: Balance,
    /// Amount recorded on the audit row.
    pub amount: Amount,
}

/// Domain rejection raised inside the transfer closure. The store rolls the
/// attempt back without applying any write.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransferAbort {
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// The closure executed inside a transaction attempt.
pub type TransferOp<'a> =
    &'a (dyn Fn(&TransferSnapshot) -> Result<TransferWrites, TransferAbort> + Send + Sync);

/// Errors from store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Account missing at transaction-read time
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// Another transaction committed to this account between read and commit
    #[error("write conflict on account {account}: expected version {expected}, found {actual}")]
    WriteConflict {
        account: AccountId,
        expected: i64,
        actual: i64,
    },

    /// The transfer closure rejected the attempt; nothing was written
    #[error(transparent)]
    Aborted(#[from] TransferAbort),

    /// Stored state violates a domain invariant
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store reachable but refusing work (used by fault injection in tests)
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, StoreError::WriteConflict { .. })
    }
}

/// Storage backend for accounts and the append-only transfer record store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Single-attempt atomic transfer.
    ///
    /// Reads consistent snapshots of `sender` and `recipient`, runs `op`,
    /// and commits the returned writes together with exactly one new
    /// [`TransferRecord`] whose id and timestamp the store assigns. Any
    /// error means no state changed.
    async fn transfer_atomic(
        &self,
        sender: &AccountId,
        recipient: &AccountId,
        op: TransferOp<'_>,
    ) -> Result<TransferRecord, StoreError>;

    /// Current balance of an account.
    async fn balance_of(&self, account: &AccountId) -> Result<Balance, StoreError>;

    /// Most recent transfer records touching an account, newest first.
    async fn records_for(
        &self,
        account: &AccountId,
        limit: i64,
    ) -> Result<Vec<TransferRecord>, StoreError>;
}
