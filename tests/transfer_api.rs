//! HTTP-level tests driving the router against the in-memory store

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use points_ledger::gateway::build_router;
use points_ledger::gateway::state::AppState;
use points_ledger::store::MemoryStore;

fn app() -> Router {
    build_router(Arc::new(AppState::new(Arc::new(MemoryStore::new()))))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let key = resp
        .headers()
        .get("idempotency-key")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, key, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn open_account(app: &Router, name: &str, balance: i64) -> i64 {
    let (status, _, body) = send(
        app,
        post_json("/api/v1/accounts", json!({ "name": name, "balance": balance })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["account"]["id"].as_i64().unwrap()
}

async fn transfer(app: &Router, from: i64, to: i64, amount: i64) -> (StatusCode, Option<String>, Value) {
    send(
        app,
        post_json(
            "/api/v1/transfers",
            json!({ "fromAccountId": from, "toAccountId": to, "amount": amount }),
        ),
    )
    .await
}

async fn balance(app: &Router, id: i64) -> i64 {
    let (_, _, body) = send(app, get(&format!("/api/v1/accounts/{}", id))).await;
    body["account"]["balance"].as_i64().unwrap()
}

#[tokio::test]
async fn api_create_transfer_and_lookup() {
    let app = app();
    let alice = open_account(&app, "Alice", 1000).await;
    let bob = open_account(&app, "Bob", 500).await;

    let (status, key, body) = transfer(&app, alice, bob, 250).await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["transfer"]["idempotencyKey"].as_str().unwrap().to_string();
    assert_eq!(key.as_deref(), Some(token.as_str()));
    assert_eq!(body["transfer"]["status"], "completed");
    assert!(body["transfer"]["completedAt"].is_string());

    let (status, _, found) = send(&app, get(&format!("/api/v1/transfers/{}", token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["transfer"]["transferId"], body["transfer"]["transferId"]);

    assert_eq!(balance(&app, alice).await, 750);
    assert_eq!(balance(&app, bob).await, 750);

    let (status, _, ledger) =
        send(&app, get(&format!("/api/v1/transfers/{}/ledger", token))).await;
    assert_eq!(status, StatusCode::OK);
    let entries = ledger["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["eventType"], "transfer_out");
    assert_eq!(entries[0]["change"], -250);
    assert_eq!(entries[1]["eventType"], "transfer_in");
    assert_eq!(entries[1]["balanceAfter"], 750);
}

#[tokio::test]
async fn api_insufficient_funds_returns_failed_transfer() {
    let app = app();
    let alice = open_account(&app, "Alice", 100).await;
    let bob = open_account(&app, "Bob", 500).await;

    let (status, key, body) = transfer(&app, alice, bob, 250).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 1002);
    assert_eq!(body["data"]["status"], "failed");
    assert!(body["data"]["failReason"].is_string());

    let token = body["data"]["idempotencyKey"].as_str().unwrap();
    assert_eq!(key.as_deref(), Some(token));
    let (_, _, ledger) = send(&app, get(&format!("/api/v1/transfers/{}/ledger", token))).await;
    assert!(ledger["data"].as_array().unwrap().is_empty());
    assert_eq!(balance(&app, alice).await, 100);
}

#[tokio::test]
async fn api_error_status_mapping() {
    let app = app();
    let alice = open_account(&app, "Alice", 100).await;

    let (status, _, body) = transfer(&app, alice, alice, 10).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 1003);

    let (status, _, _) = transfer(&app, alice, 999, 10).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = transfer(&app, alice, 999, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app, get("/api/v1/transfers/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4002);
}

#[tokio::test]
async fn api_malformed_body_is_bad_request() {
    let app = app();

    let (status, _, body) = send(
        &app,
        post_json("/api/v1/transfers", json!({ "fromAccountId": "one", "amount": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let req = Request::post("/api/v1/transfers")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_idempotency_header_replay() {
    let app = app();
    let alice = open_account(&app, "Alice", 1000).await;
    let bob = open_account(&app, "Bob", 0).await;

    let request = || {
        Request::post("/api/v1/transfers")
            .header(header::CONTENT_TYPE, "application/json")
            .header("Idempotency-Key", "retry-1")
            .body(Body::from(
                json!({ "fromAccountId": alice, "toAccountId": bob, "amount": 100 }).to_string(),
            ))
            .unwrap()
    };

    let (first, key, a) = send(&app, request()).await;
    let (second, _, b) = send(&app, request()).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(key.as_deref(), Some("retry-1"));
    assert_eq!(a["transfer"]["transferId"], b["transfer"]["transferId"]);
    assert_eq!(balance(&app, alice).await, 900);

    let conflicting = Request::post("/api/v1/transfers")
        .header(header::CONTENT_TYPE, "application/json")
        .header("Idempotency-Key", "retry-1")
        .body(Body::from(
            json!({ "fromAccountId": alice, "toAccountId": bob, "amount": 5 }).to_string(),
        ))
        .unwrap();
    let (status, _, body) = send(&app, conflicting).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 1004);
}

#[tokio::test]
async fn api_list_transfers_by_account() {
    let app = app();
    let alice = open_account(&app, "Alice", 1000).await;
    let bob = open_account(&app, "Bob", 1000).await;

    let (_, _, first) = transfer(&app, alice, bob, 10).await;
    let (_, _, second) = transfer(&app, bob, alice, 20).await;

    let (status, _, page) =
        send(&app, get(&format!("/api/v1/transfers?accountId={}", alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["page"], 1);
    assert_eq!(page["pageSize"], 20);
    let data = page["data"].as_array().unwrap();
    assert_eq!(data[0]["transferId"], second["transfer"]["transferId"]);
    assert_eq!(data[1]["transferId"], first["transfer"]["transferId"]);

    // Out-of-range paging falls back to defaults
    let (status, _, page) = send(
        &app,
        get(&format!("/api/v1/transfers?accountId={}&page=-3&pageSize=1000", alice)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
    assert_eq!(page["pageSize"], 20);

    let (status, _, _) = send(&app, get("/api/v1/transfers")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = send(&app, get("/api/v1/transfers?accountId=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_archive_transfer() {
    let app = app();
    let alice = open_account(&app, "Alice", 1000).await;
    let bob = open_account(&app, "Bob", 0).await;
    let (_, key, _) = transfer(&app, alice, bob, 10).await;
    let token = key.unwrap();

    let delete = || {
        Request::delete(format!("/api/v1/transfers/{}", token))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _, _) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, get(&format!("/api/v1/transfers/{}", token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Ledger history of the account is untouched
    let (status, _, ledger) =
        send(&app, get(&format!("/api/v1/accounts/{}/ledger", bob))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger["total"], 1);
}

#[tokio::test]
async fn api_accounts() {
    let app = app();

    let (status, _, body) = send(
        &app,
        post_json("/api/v1/accounts", json!({ "name": "", "balance": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let (status, _, body) = send(
        &app,
        post_json("/api/v1/accounts", json!({ "name": "x".repeat(129), "balance": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let (status, _, _) = send(
        &app,
        post_json("/api/v1/accounts", json!({ "name": "x".repeat(128), "balance": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = send(
        &app,
        post_json("/api/v1/accounts", json!({ "name": "Neg", "balance": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app, get("/api/v1/accounts/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);

    let (status, _, _) = send(&app, get("/api/v1/accounts/42/ledger")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_health() {
    let app = app();
    let (status, _, body) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].as_str().unwrap().starts_with(env!("CARGO_PKG_VERSION")));
}
