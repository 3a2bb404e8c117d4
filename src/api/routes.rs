//! API Routes
//!
//! Thin application-layer handlers that invoke the transfer engine
//! in-process. The engine owns failure classification; these handlers only
//! map outcome kinds to HTTP status codes.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, OperationContext, TransferRecord};
use crate::engine::{ErrorKind, TransferEngine, TransferFailure, TransferRequest, TransferResult};
use crate::error::AppError;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: TransferEngine,
    pub request_timeout: Duration,
}

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/transfers", post(execute_transfer))
        .route("/accounts/:id/balance", get(get_balance))
        .route("/accounts/:id/transfers", get(list_transfers))
        .with_state(state)
}

// =========================================================================
// Transfers
// =========================================================================

async fn execute_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> (StatusCode, Json<TransferResult>) {
    let mut context = OperationContext::new();
    let correlation_id = context.ensure_correlation_id();
    tracing::debug!(%correlation_id, "transfer request received");

    // The attempt runs on its own task so an expired deadline never cancels
    // a commit mid-flight: the transfer runs to completion either way, and a
    // late outcome is still logged.
    let engine = state.engine.clone();
    let mut attempt = tokio::spawn(async move { engine.transfer(request, &context).await });

    let result = match tokio::time::timeout(state.request_timeout, &mut attempt).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            tracing::error!(%correlation_id, "transfer task failed: {join_error}");
            TransferResult::rejected(&TransferFailure::StorageUnavailable(
                join_error.to_string(),
            ))
        }
        Err(_) => {
            // The attempt may still commit after the deadline, so the
            // response reports an unknown outcome, never an abandoned one.
            tokio::spawn(async move {
                match attempt.await {
                    Ok(late) => tracing::warn!(
                        %correlation_id,
                        success = late.success,
                        transaction_id = ?late.transaction_id,
                        "transfer resolved after the response deadline"
                    ),
                    Err(join_error) => tracing::error!(
                        %correlation_id,
                        "transfer task failed after the response deadline: {join_error}"
                    ),
                }
            });
            TransferResult::rejected(&TransferFailure::Timeout)
        }
    };

    (status_for(&result), Json(result))
}

fn status_for(result: &TransferResult) -> StatusCode {
    match result.error_kind {
        None => StatusCode::OK,
        Some(ErrorKind::InvalidAmount) | Some(ErrorKind::SelfTransfer) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::AccountNotFound) => StatusCode::NOT_FOUND,
        Some(ErrorKind::InsufficientFunds) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorKind::TransientConflict) => StatusCode::CONFLICT,
        Some(ErrorKind::StorageUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// =========================================================================
// Read side
// =========================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    account_id: AccountId,
    balance: rust_decimal::Decimal,
}

async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account_id = AccountId::new(id);
    let balance = state.engine.store().balance_of(&account_id).await?;

    Ok(Json(BalanceResponse {
        account_id,
        balance: balance.value(),
    }))
}

#[derive(Debug, Deserialize)]
struct RecordsQuery {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordsResponse {
    account_id: AccountId,
    records: Vec<TransferRecord>,
}

async fn list_transfers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, AppError> {
    if query.limit <= 0 || query.limit > 500 {
        return Err(AppError::InvalidRequest(
            "limit must be between 1 and 500".to_string(),
        ));
    }

    let account_id = AccountId::new(id);
    // Confirm the account exists so an unknown id is a 404, not an empty list.
    state.engine.store().balance_of(&account_id).await?;
    let records = state
        .engine
        .store()
        .records_for(&account_id, query.limit)
        .await?;

    Ok(Json(RecordsResponse {
        account_id,
        records,
    }))
}

/// Liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}
