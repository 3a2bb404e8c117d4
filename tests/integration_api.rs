//! Integration tests for the HTTP surface, driven through the router with
//! `tower::ServiceExt::oneshot` over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use tower::ServiceExt;

use credit_ledger::api::{create_router, AppState};
use credit_ledger::engine::{RetryPolicy, TransferEngine};
use credit_ledger::store::{MemoryLedgerStore, TransferOp};
use credit_ledger::{AccountId, Balance, LedgerStore, StoreError, TransferRecord};

fn test_app() -> (Router, Arc<MemoryLedgerStore>) {
    let store = Arc::new(MemoryLedgerStore::new());
    store.seed_account("alice", Balance::new(dec!(100)).unwrap());
    store.seed_account("bob", Balance::zero());

    let engine = TransferEngine::new(store.clone()).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        backoff_base: Duration::from_millis(1),
    });
    let state = AppState {
        engine,
        request_timeout: Duration::from_secs(5),
    };
    (create_router(state), store)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_transfer(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/transfers")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn transfer_success_returns_transaction_id() {
    let (app, store) = test_app();

    let response = app
        .oneshot(post_transfer(
            r#"{"senderId":"alice","recipientId":"bob","amount":"30"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(body["transactionId"].is_string());
    assert!(body.get("errorKind").is_none());

    assert_eq!(
        store.balance_of(&"alice".into()).await.unwrap().value(),
        dec!(70)
    );
}

#[tokio::test]
async fn self_transfer_maps_to_bad_request() {
    let (app, _) = test_app();

    let response = app
        .oneshot(post_transfer(
            r#"{"senderId":"alice","recipientId":"alice","amount":"10"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "self_transfer");
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn insufficient_funds_maps_to_unprocessable() {
    let (app, _) = test_app();

    let response = app
        .oneshot(post_transfer(
            r#"{"senderId":"alice","recipientId":"bob","amount":"500"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["errorKind"], "insufficient_funds");
}

#[tokio::test]
async fn unknown_sender_maps_to_not_found() {
    let (app, _) = test_app();

    let response = app
        .oneshot(post_transfer(
            r#"{"senderId":"ghost","recipientId":"bob","amount":"10"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["errorKind"], "account_not_found");
}

#[tokio::test]
async fn balance_endpoint_reads_current_state() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/accounts/alice/balance")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["accountId"], "alice");
    assert_eq!(body["balance"], "100");
}

#[tokio::test]
async fn balance_endpoint_404_for_unknown_account() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/accounts/ghost/balance")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error_code"], "account_not_found");
}

#[tokio::test]
async fn transfers_endpoint_lists_records_newest_first() {
    let (app, _) = test_app();

    for amount in ["10", "20"] {
        let response = app
            .clone()
            .oneshot(post_transfer(&format!(
                r#"{{"senderId":"alice","recipientId":"bob","amount":"{}"}}"#,
                amount
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/accounts/bob/transfers?limit=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["amount"], "20");
    assert_eq!(records[1]["amount"], "10");
}

/// Delegates to the in-memory store but follows each commit with a latency
/// tail, so a response deadline can expire with the transfer already durable.
struct SlowCommitStore {
    inner: Arc<MemoryLedgerStore>,
    commit_delay: Duration,
}

#[async_trait::async_trait]
impl LedgerStore for SlowCommitStore {
    async fn transfer_atomic(
        &self,
        sender: &AccountId,
        recipient: &AccountId,
        op: TransferOp<'_>,
    ) -> Result<TransferRecord, StoreError> {
        let record = self.inner.transfer_atomic(sender, recipient, op).await?;
        tokio::time::sleep(self.commit_delay).await;
        Ok(record)
    }

    async fn balance_of(&self, account: &AccountId) -> Result<Balance, StoreError> {
        self.inner.balance_of(account).await
    }

    async fn records_for(
        &self,
        account: &AccountId,
        limit: i64,
    ) -> Result<Vec<TransferRecord>, StoreError> {
        self.inner.records_for(account, limit).await
    }
}

#[tokio::test]
async fn timed_out_transfer_reports_unknown_outcome_not_abandonment() {
    let inner = Arc::new(MemoryLedgerStore::new());
    inner.seed_account("alice", Balance::new(dec!(100)).unwrap());
    inner.seed_account("bob", Balance::zero());

    let store = Arc::new(SlowCommitStore {
        inner: inner.clone(),
        commit_delay: Duration::from_millis(200),
    });
    let state = AppState {
        engine: TransferEngine::new(store),
        request_timeout: Duration::from_millis(20),
    };
    let app = create_router(state);

    let response = app
        .oneshot(post_transfer(
            r#"{"senderId":"alice","recipientId":"bob","amount":"30"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "transient_conflict");

    // The commit landed before the deadline fired.
    assert_eq!(inner.record_count(), 1);
    assert_eq!(
        inner.balance_of(&"alice".into()).await.unwrap().value(),
        dec!(70)
    );

    // The caller must not be told the transfer was abandoned.
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("unknown"), "message was: {message}");
}

#[tokio::test]
async fn transfers_endpoint_rejects_bad_limit() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/accounts/alice/transfers?limit=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
