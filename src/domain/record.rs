//! Account identifiers and transfer records
//!
//! `AccountId` is caller-supplied and opaque; `TransferRecord` is the
//! immutable audit entry appended once per committed transfer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, caller-supplied account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A committed transfer, as read back from the ledger record store.
///
/// `id` and `created_at` are assigned by the store at commit time;
/// timestamps are monotonically non-decreasing per store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: Uuid,
    pub sender_id: AccountId,
    pub recipient_id: AccountId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl TransferRecord {
    /// Whether this record debits or credits `account`.
    pub fn touches(&self, account: &AccountId) -> bool {
        &self.sender_id == account || &self.recipient_id == account
    }
}
