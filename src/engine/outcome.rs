//! Transfer request and result shapes
//!
//! The engine classifies every failure into a stable [`ErrorKind`] and
//! always answers with a [`TransferResult`]; raw store errors never reach
//! the caller.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountId, AmountError};

/// A request to move credits from one account to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender_id: AccountId,
    pub recipient_id: AccountId,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(
        sender_id: impl Into<AccountId>,
        recipient_id: impl Into<AccountId>,
        amount: Decimal,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            amount,
        }
    }
}

/// Stable failure classification, part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Non-positive or malformed amount; caller error, not retried
    InvalidAmount,
    /// Sender equals recipient; caller error, not retried
    SelfTransfer,
    /// Sender or recipient account missing; caller error, not retried
    AccountNotFound,
    /// Sender balance below requested amount at commit time
    InsufficientFunds,
    /// Concurrent-modification retries exhausted; safe to retry unchanged
    TransientConflict,
    /// Underlying store unreachable; safe to retry after backoff
    StorageUnavailable,
}

/// Why a transfer did not commit.
#[derive(Debug, thiserror::Error)]
pub enum TransferFailure {
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("sender and recipient are the same account")]
    SelfTransfer,

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("transfer abandoned after {attempts} conflicting attempts")]
    TransientConflict { attempts: u32 },

    /// The response deadline expired while the attempt was still running.
    /// Unlike `TransientConflict`, the attempt may yet commit, so the
    /// outcome is unknown rather than abandoned.
    #[error("transfer timed out with outcome unknown")]
    Timeout,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl TransferFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Self::SelfTransfer => ErrorKind::SelfTransfer,
            Self::AccountNotFound(_) => ErrorKind::AccountNotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::TransientConflict { .. } => ErrorKind::TransientConflict,
            Self::Timeout => ErrorKind::TransientConflict,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
        }
    }

    /// Short message suitable for direct display to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "Transfer amount must be a positive number of credits.",
            Self::SelfTransfer => "You cannot send credits to yourself.",
            Self::AccountNotFound(_) => "One of the accounts could not be found.",
            Self::InsufficientFunds { .. } => "Insufficient credits to complete this transfer.",
            Self::TransientConflict { .. } => {
                "The transfer could not be completed due to concurrent activity. Please try again."
            }
            Self::Timeout => {
                "The transfer timed out and its outcome is unknown. \
                 Check your transfer history before retrying."
            }
            Self::StorageUnavailable(_) => {
                "The ledger is temporarily unavailable. Please try again later."
            }
        }
    }
}

/// Outcome of a `transfer` call.
///
/// `transaction_id` is present exactly when `success` is true;
/// `error_kind` exactly when it is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl TransferResult {
    pub fn completed(transaction_id: Uuid) -> Self {
        Self {
            success: true,
            message: "Transfer completed.".to_string(),
            transaction_id: Some(transaction_id),
            error_kind: None,
        }
    }

    pub fn rejected(failure: &TransferFailure) -> Self {
        Self {
            success: false,
            message: failure.user_message().to_string(),
            transaction_id: None,
            error_kind: Some(failure.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn request_deserializes_from_camel_case() {
        let json = r#"{"senderId":"u1","recipientId":"u2","amount":"30"}"#;
        let request: TransferRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.sender_id.as_str(), "u1");
        assert_eq!(request.recipient_id.as_str(), "u2");
        assert_eq!(request.amount, dec!(30));
    }

    #[test]
    fn success_result_carries_transaction_id_only() {
        let id = Uuid::new_v4();
        let result = TransferResult::completed(id);

        assert!(result.success);
        assert_eq!(result.transaction_id, Some(id));
        assert!(result.error_kind.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("errorKind").is_none());
        assert!(json.get("transactionId").is_some());
    }

    #[test]
    fn failure_result_carries_kind_and_message() {
        let failure = TransferFailure::InsufficientFunds {
            requested: dec!(10),
            available: dec!(5),
        };
        let result = TransferResult::rejected(&failure);

        assert!(!result.success);
        assert!(result.transaction_id.is_none());
        assert_eq!(result.error_kind, Some(ErrorKind::InsufficientFunds));
        assert!(!result.message.is_empty());
        // user message is display text, not the internal kind
        assert_ne!(result.message, "insufficient_funds");
    }

    #[test]
    fn every_failure_maps_to_a_distinct_kind() {
        let failures = [
            TransferFailure::InvalidAmount(AmountError::NotPositive(dec!(0))),
            TransferFailure::SelfTransfer,
            TransferFailure::AccountNotFound("u1".into()),
            TransferFailure::InsufficientFunds {
                requested: dec!(10),
                available: dec!(5),
            },
            TransferFailure::TransientConflict { attempts: 3 },
            TransferFailure::StorageUnavailable("down".into()),
        ];

        let mut kinds: Vec<ErrorKind> = failures.iter().map(|f| f.kind()).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), failures.len());
    }

    #[test]
    fn timeout_shares_conflict_kind_but_not_its_message() {
        let timeout = TransferFailure::Timeout;
        assert_eq!(timeout.kind(), ErrorKind::TransientConflict);
        // a timed-out attempt may still have committed, so its message
        // reports an unknown outcome instead of inviting a blind retry
        assert!(timeout.user_message().contains("unknown"));
        assert_ne!(
            timeout.user_message(),
            TransferFailure::TransientConflict { attempts: 3 }.user_message()
        );
    }
}
