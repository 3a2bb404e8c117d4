//! Postgres ledger store
//!
//! Accounts carry a `version` column; commits update balances with
//! `WHERE id = $n AND version = $m`, so a concurrent commit between the
//! snapshot read and the update makes `rows_affected` zero and the whole
//! transaction rolls back as a [`StoreError::WriteConflict`]. The transfer
//! record is inserted in the same transaction, with the id generated here
//! and the timestamp assigned by the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{AccountId, Balance, TransferRecord};

use super::{
    AccountSnapshot, LedgerStore, StoreError, TransferOp, TransferSnapshot,
};

/// Postgres-backed [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn read_snapshot(
        tx: &mut Transaction<'_, Postgres>,
        id: &AccountId,
    ) -> Result<AccountSnapshot, StoreError> {
        let row: Option<(Decimal, i64)> = sqlx::query_as(
            r#"
            SELECT balance, version FROM accounts WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        let (balance, version) = row.ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;
        let balance = Balance::new(balance).map_err(|e| {
            StoreError::InvalidData(format!("account {} holds invalid balance: {}", id, e))
        })?;

        Ok(AccountSnapshot {
            id: id.clone(),
            balance,
            version,
        })
    }

    /// Version-checked balance update. Zero rows affected means another
    /// transaction got there first.
    async fn write_balance(
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &AccountSnapshot,
        new_balance: Balance,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1, version = version + 1
            WHERE id = $2 AND version = $3
            "#,
        )
        .bind(new_balance.value())
        .bind(snapshot.id.as_str())
        .bind(snapshot.version)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::WriteConflict {
                account: snapshot.id.clone(),
                expected: snapshot.version,
                actual: snapshot.version + 1,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn transfer_atomic(
        &self,
        sender: &AccountId,
        recipient: &AccountId,
        op: TransferOp<'_>,
    ) -> Result<TransferRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let snapshot = TransferSnapshot {
            sender: Self::read_snapshot(&mut tx, sender).await?,
            recipient: Self::read_snapshot(&mut tx, recipient).await?,
        };

        // Dropping `tx` on any early return rolls the attempt back.
        let writes = op(&snapshot)?;

        Self::write_balance(&mut tx, &snapshot.sender, writes.sender_balance).await?;
        Self::write_balance(&mut tx, &snapshot.recipient, writes.recipient_balance).await?;

        let record_id = Uuid::new_v4();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO transfer_records (id, sender_id, recipient_id, amount)
            VALUES ($1, $2, $3, $4)
            RETURNING created_at
            "#,
        )
        .bind(record_id)
        .bind(sender.as_str())
        .bind(recipient.as_str())
        .bind(writes.amount.value())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TransferRecord {
            id: record_id,
            sender_id: sender.clone(),
            recipient_id: recipient.clone(),
            amount: writes.amount.value(),
            created_at,
        })
    }

    async fn balance_of(&self, account: &AccountId) -> Result<Balance, StoreError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT balance FROM accounts WHERE id = $1
            "#,
        )
        .bind(account.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let balance = balance.ok_or_else(|| StoreError::AccountNotFound(account.clone()))?;
        Balance::new(balance).map_err(|e| {
            StoreError::InvalidData(format!("account {} holds invalid balance: {}", account, e))
        })
    }

    async fn records_for(
        &self,
        account: &AccountId,
        limit: i64,
    ) -> Result<Vec<TransferRecord>, StoreError> {
        let rows: Vec<(Uuid, String, String, Decimal, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, sender_id, recipient_id, amount, created_at
            FROM transfer_records
            WHERE sender_id = $1 OR recipient_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(account.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, sender_id, recipient_id, amount, created_at)| TransferRecord {
                id,
                sender_id: sender_id.into(),
                recipient_id: recipient_id.into(),
                amount,
                created_at,
            })
            .collect())
    }
}
