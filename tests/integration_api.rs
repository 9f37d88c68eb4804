use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use eth_tx_indexer::api::{router, ApiServer, AppState, QueryFacade};
use eth_tx_indexer::config::ApiConfig;
use eth_tx_indexer::models::Transaction;
use eth_tx_indexer::store::{MemoryStore, TransactionStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

const WATCHED: &str = "0x742d35cc6634c0532925a3b844bc454e4438f44e";
const OTHER: &str = "0x1111111111111111111111111111111111111111";

/// Store with one watched address, two recorded transactions and cursor at 102
fn setup_test_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    assert!(store.subscribe(WATCHED));

    store.add_transaction(Transaction {
        hash: "0xaa".to_string(),
        from: WATCHED.to_string(),
        to: OTHER.to_string(),
        value: "0xde0b6b3a7640000".to_string(),
        block_number: 101,
    });
    store.add_transaction(Transaction {
        hash: "0xbb".to_string(),
        from: OTHER.to_string(),
        to: WATCHED.to_string(),
        value: "0x1".to_string(),
        block_number: 102,
    });
    store.set_current_block(102);

    store
}

fn create_test_router(store: Arc<MemoryStore>) -> Router {
    router(AppState {
        facade: Arc::new(QueryFacade::new(store)),
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_subscribe(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/subscribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_get_block_endpoint() {
    let (status, json) = send(create_test_router(setup_test_store()), get("/block")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"current_block": 102}));
}

#[tokio::test]
async fn test_get_block_before_first_sync() {
    let (status, json) = send(create_test_router(Arc::new(MemoryStore::new())), get("/block")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_block"], 0);
}

#[tokio::test]
async fn test_subscribe_endpoint() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_router(store.clone());

    let (status, json) = send(
        app.clone(),
        post_subscribe(r#"{"address":"0x742d35Cc6634C0532925a3b844Bc454e4438f44e"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));
    assert!(store.is_subscribed(WATCHED));

    // repeat subscription is still a success
    let (_, json) = send(app, post_subscribe(&format!(r#"{{"address":"{}"}}"#, WATCHED))).await;
    assert_eq!(json["success"], true);
    assert_eq!(store.subscription_count(), 1);
}

#[tokio::test]
async fn test_subscribe_invalid_address() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_router(store.clone());

    for address in ["0x123", "742d35cc6634c0532925a3b844bc454e4438f44e00", "0xZZ2d35cc6634c0532925a3b844bc454e4438f44e"] {
        let (status, json) = send(app.clone(), post_subscribe(&format!(r#"{{"address":"{}"}}"#, address))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false, "{} should be rejected", address);
    }
    assert_eq!(store.subscription_count(), 0);
}

#[tokio::test]
async fn test_subscribe_malformed_body() {
    let app = create_test_router(Arc::new(MemoryStore::new()));

    for body in ["{not json", "", r#"{"addr":"0x742d35cc6634c0532925a3b844bc454e4438f44e"}"#, r#"{"address":42}"#] {
        let (status, json) = send(app.clone(), post_subscribe(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(json["error"], "malformed_body");
        assert!(json["message"].is_string());
    }
}

#[tokio::test]
async fn test_subscribe_requires_post() {
    let (status, _) = send(create_test_router(Arc::new(MemoryStore::new())), get("/subscribe")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_get_transactions_endpoint() {
    let app = create_test_router(setup_test_store());

    let (status, json) = send(app, get(&format!("/transactions?address={}", WATCHED))).await;

    assert_eq!(status, StatusCode::OK);
    let transactions = json.as_array().expect("array response");
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["hash"], "0xaa");
    assert_eq!(transactions[0]["from"], WATCHED);
    assert_eq!(transactions[0]["to"], OTHER);
    assert_eq!(transactions[0]["value"], "0xde0b6b3a7640000");
    assert_eq!(transactions[0]["block_number"], 101);
    assert_eq!(transactions[1]["hash"], "0xbb");
    assert_eq!(transactions[1]["block_number"], 102);
}

#[tokio::test]
async fn test_get_transactions_is_case_insensitive() {
    let app = create_test_router(setup_test_store());

    let (status, json) = send(
        app,
        get("/transactions?address=0x742D35CC6634C0532925A3B844BC454E4438F44E"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_get_transactions_unknown_address() {
    let app = create_test_router(setup_test_store());

    let (status, json) = send(app, get("/transactions?address=0x2222222222222222222222222222222222222222")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_get_transactions_requires_address() {
    let app = create_test_router(setup_test_store());

    for uri in ["/transactions", "/transactions?address=", "/transactions?other=1"] {
        let (status, json) = send(app.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json["error"], "missing_parameter");
    }
}

#[tokio::test]
async fn test_get_status_endpoint() {
    let (status, json) = send(create_test_router(setup_test_store()), get("/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"status": "ok", "current_block": 102, "watched_addresses": 1})
    );
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, _) = send(create_test_router(setup_test_store()), get("/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_headers() {
    let request = Request::builder()
        .uri("/block")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = create_test_router(setup_test_store()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_server_serves_and_shuts_down() {
    let store = setup_test_store();
    let server = ApiServer::new(Arc::new(QueryFacade::new(store)), &ApiConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    let token = shutdown.clone();
    let handle = tokio::spawn(async move { server.serve(listener, token).await });

    let response = reqwest::get(format!("http://{}/block", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["current_block"], 102);

    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop after cancellation")
        .unwrap();
    assert!(result.is_ok());
}
