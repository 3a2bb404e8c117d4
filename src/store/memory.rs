//! In-memory ledger store
//!
//! Versioned account map plus an append-only record vector, with the same
//! optimistic-concurrency contract as the Postgres store. The read and the
//! commit take the lock separately, so concurrent transfers genuinely race
//! and version checks genuinely fire. Deterministic fault injection covers
//! the conflict-retry and atomicity test paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AccountId, Balance, TransferRecord};

use super::{
    AccountSnapshot, LedgerStore, StoreError, TransferOp, TransferSnapshot, TransferWrites,
};

#[derive(Debug, Clone)]
struct VersionedAccount {
    balance: Balance,
    version: i64,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, VersionedAccount>,
    records: Vec<TransferRecord>,
    /// Ensures record timestamps are monotonically non-decreasing.
    last_record_at: Option<DateTime<Utc>>,
}

/// Faults to inject on upcoming commits, in order of consumption.
#[derive(Debug, Default)]
struct Faults {
    conflicts: u32,
    commit_failures: u32,
}

/// In-memory [`LedgerStore`] used by tests and local development.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
    faults: Mutex<Faults>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite an account with the given balance.
    pub fn seed_account(&self, id: impl Into<AccountId>, balance: Balance) {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        state
            .accounts
            .insert(id.into(), VersionedAccount { balance, version: 0 });
    }

    /// Total number of committed transfer records.
    pub fn record_count(&self) -> usize {
        let state = self.state.lock().expect("memory store lock poisoned");
        state.records.len()
    }

    /// Make the next `n` commits fail with a write conflict.
    pub fn inject_conflicts(&self, n: u32) {
        self.faults.lock().expect("memory store lock poisoned").conflicts = n;
    }

    /// Make the next `n` commits fail as unavailable.
    pub fn inject_commit_failures(&self, n: u32) {
        self.faults
            .lock()
            .expect("memory store lock poisoned")
            .commit_failures = n;
    }

    fn snapshot_of(
        state: &State,
        id: &AccountId,
    ) -> Result<AccountSnapshot, StoreError> {
        let account = state
            .accounts
            .get(id)
            .ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;
        Ok(AccountSnapshot {
            id: id.clone(),
            balance: account.balance,
            version: account.version,
        })
    }

    /// Consume one pending fault, if any.
    fn take_fault(&self, sender: &AccountId, snapshot: &TransferSnapshot) -> Option<StoreError> {
        let mut faults = self.faults.lock().expect("memory store lock poisoned");
        if faults.conflicts > 0 {
            faults.conflicts -= 1;
            return Some(StoreError::WriteConflict {
                account: sender.clone(),
                expected: snapshot.sender.version,
                actual: snapshot.sender.version + 1,
            });
        }
        if faults.commit_failures > 0 {
            faults.commit_failures -= 1;
            return Some(StoreError::Unavailable("injected commit failure".into()));
        }
        None
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn transfer_atomic(
        &self,
        sender: &AccountId,
        recipient: &AccountId,
        op: TransferOp<'_>,
    ) -> Result<TransferRecord, StoreError> {
        // Read phase: consistent snapshots under one lock acquisition.
        let snapshot = {
            let state = self.state.lock().expect("memory store lock poisoned");
            TransferSnapshot {
                sender: Self::snapshot_of(&state, sender)?,
                recipient: Self::snapshot_of(&state, recipient)?,
            }
        };

        let writes: TransferWrites = op(&snapshot)?;

        if let Some(fault) = self.take_fault(sender, &snapshot) {
            return Err(fault);
        }

        // Commit phase: re-validate versions, then apply all writes or none.
        let mut state = self.state.lock().expect("memory store lock poisoned");
        for read in [&snapshot.sender, &snapshot.recipient] {
            let current = state
                .accounts
                .get(&read.id)
                .ok_or_else(|| StoreError::AccountNotFound(read.id.clone()))?;
            if current.version != read.version {
                return Err(StoreError::WriteConflict {
                    account: read.id.clone(),
                    expected: read.version,
                    actual: current.version,
                });
            }
        }

        let now = Utc::now();
        let created_at = match state.last_record_at {
            Some(last) if last > now => last,
            _ => now,
        };
        state.last_record_at = Some(created_at);

        let record = TransferRecord {
            id: Uuid::new_v4(),
            sender_id: sender.clone(),
            recipient_id: recipient.clone(),
            amount: writes.amount.value(),
            created_at,
        };

        let sender_account = state
            .accounts
            .get_mut(sender)
            .expect("sender vanished under lock");
        sender_account.balance = writes.sender_balance;
        sender_account.version += 1;

        let recipient_account = state
            .accounts
            .get_mut(recipient)
            .expect("recipient vanished under lock");
        recipient_account.balance = writes.recipient_balance;
        recipient_account.version += 1;

        state.records.push(record.clone());

        Ok(record)
    }

    async fn balance_of(&self, account: &AccountId) -> Result<Balance, StoreError> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Self::snapshot_of(&state, account).map(|s| s.balance)
    }

    async fn records_for(
        &self,
        account: &AccountId,
        limit: i64,
    ) -> Result<Vec<TransferRecord>, StoreError> {
        let state = self.state.lock().expect("memory store lock poisoned");
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| r.touches(account))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
