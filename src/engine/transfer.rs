//! Transfer Engine
//!
//! Validates a transfer request, executes the atomic two-account mutation
//! plus the audit-record append through the [`LedgerStore`] transaction
//! primitive, and retries conflicting attempts under an injectable
//! [`RetryPolicy`]. Side effects are all-or-nothing: either the sender is
//! debited, the recipient credited, and one record appended, or nothing
//! changed.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Amount, OperationContext, TransferRecord};
use crate::store::{LedgerStore, StoreError, TransferAbort, TransferSnapshot, TransferWrites};

use super::{TransferFailure, TransferRequest, TransferResult};

/// Bounds and paces the conflict-retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff grows linearly with the attempt number.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt.max(1)
    }
}

/// Executes peer-to-peer credit transfers against a [`LedgerStore`].
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
    retry: RetryPolicy,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Execute a transfer and classify the outcome.
    ///
    /// Never returns a raw store error: every failure becomes a
    /// [`TransferResult`] with a stable kind and a user-facing message.
    pub async fn transfer(
        &self,
        request: TransferRequest,
        context: &OperationContext,
    ) -> TransferResult {
        match self.execute(&request).await {
            Ok(record) => {
                tracing::info!(
                    transaction_id = %record.id,
                    sender = %record.sender_id,
                    recipient = %record.recipient_id,
                    amount = %record.amount,
                    correlation_id = ?context.correlation_id,
                    "transfer committed"
                );
                TransferResult::completed(record.id)
            }
            Err(failure) => {
                tracing::warn!(
                    sender = %request.sender_id,
                    recipient = %request.recipient_id,
                    kind = ?failure.kind(),
                    correlation_id = ?context.correlation_id,
                    "transfer rejected: {}",
                    failure
                );
                TransferResult::rejected(&failure)
            }
        }
    }

    async fn execute(&self, request: &TransferRequest) -> Result<TransferRecord, TransferFailure> {
        // Fail-fast validation, before any store access.
        let amount = Amount::new(request.amount)?;
        if request.sender_id == request.recipient_id {
            return Err(TransferFailure::SelfTransfer);
        }

        // The transaction closure. Balances come from the in-transaction
        // snapshot, never from an earlier read.
        let op = move |snapshot: &TransferSnapshot| -> Result<TransferWrites, TransferAbort> {
            if !snapshot.sender.balance.covers(&amount) {
                return Err(TransferAbort::InsufficientFunds {
                    requested: amount.value(),
                    available: snapshot.sender.balance.value(),
                });
            }
            Ok(TransferWrites {
                sender_balance: snapshot.sender.balance.debit(&amount)?,
                recipient_balance: snapshot.recipient.balance.credit(&amount)?,
                amount,
            })
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self
                .store
                .transfer_atomic(&request.sender_id, &request.recipient_id, &op)
                .await
            {
                Ok(record) => return Ok(record),

                Err(StoreError::WriteConflict {
                    account,
                    expected,
                    actual,
                }) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(TransferFailure::TransientConflict { attempts: attempt });
                    }
                    tracing::warn!(
                        %account,
                        expected,
                        actual,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        "write conflict, retrying transfer from a fresh read"
                    );
                    tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                }

                Err(StoreError::AccountNotFound(id)) => {
                    return Err(TransferFailure::AccountNotFound(id))
                }

                Err(StoreError::Aborted(TransferAbort::InsufficientFunds {
                    requested,
                    available,
                })) => {
                    return Err(TransferFailure::InsufficientFunds {
                        requested,
                        available,
                    })
                }

                // A balance-arithmetic abort inside the closure (e.g. the
                // recipient would overflow the credit cap).
                Err(StoreError::Aborted(TransferAbort::Amount(e))) => {
                    return Err(TransferFailure::InvalidAmount(e))
                }

                // Everything else is an unclassified storage failure.
                Err(e) => return Err(TransferFailure::StorageUnavailable(e.to_string())),
            }
        }
    }
}
