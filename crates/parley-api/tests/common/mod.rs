//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use parley_core::clock::Clock;
use parley_core::repository::ChatRepository;
use parley_gateway::TokenVerifier;
use parley_projection::InMemoryReadModelStore;
use parley_projection::domain::read_model::ReadModelStore;
use parley_store::memory_chat_repository::InMemoryChatRepository;
use parley_test_support::{FixedClock, StaticIdentityDirectory, TEST_PUBLIC_KEY_PEM, sign_token};
use serde_json::Value;
use tower::ServiceExt;

use parley_api::config::Config;
use parley_api::platform::Platform;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

fn test_config() -> Config {
    Config::from_lookup(|key| {
        let value = match key {
            "DATABASE_URL" => Some("postgres://localhost/parley_test"),
            "JWT_PUBLIC_KEY_PATH" => Some("unused.pem"),
            "EVENT_LOG_PARTITIONS" => Some("4"),
            "COLLABORATOR_TIMEOUT_MS" => Some("200"),
            _ => None,
        };
        value.map(str::to_owned)
    })
    .unwrap()
}

/// Starts the platform over the given write store and read model and
/// returns it with the full app router. Known customers: 1 Alice, 2 Bob,
/// 3 Carol, 9 Mallory.
pub fn start_with(
    chat_repository: Arc<dyn ChatRepository>,
    read_model: Arc<dyn ReadModelStore>,
) -> (Platform, Router) {
    let identity = StaticIdentityDirectory::new([(1, "Alice"), (2, "Bob"), (3, "Carol"), (9, "Mallory")]);
    let verifier = TokenVerifier::from_rsa_pem(TEST_PUBLIC_KEY_PEM.as_bytes()).unwrap();
    let platform = Platform::start(
        &test_config(),
        fixed_clock(),
        chat_repository,
        read_model,
        Arc::new(identity),
        verifier,
    );
    let app = parley_api::router(platform.state.clone());
    (platform, app)
}

/// In-memory write store whose first room is 100 and first message is 1000.
pub fn memory_write_store() -> Arc<dyn ChatRepository> {
    Arc::new(InMemoryChatRepository::with_sequences(100, 1000))
}

/// Same as [`start_with`], over fresh in-memory stores.
pub fn start() -> (Platform, Router) {
    start_with(memory_write_store(), Arc::new(InMemoryReadModelStore::new()))
}

/// Sends a request, authenticated as `user` when given, and returns the
/// status with the JSON body.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<i64>,
    body: Option<&Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", sign_token(user)));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// POST as `user`.
pub async fn post_json(app: &Router, uri: &str, user: i64, body: &Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(user), Some(body)).await
}

/// GET as `user`.
pub async fn get_json(app: &Router, uri: &str, user: i64) -> (StatusCode, Value) {
    send(app, Method::GET, uri, Some(user), None).await
}

/// Polls GET `uri` as `user` until `done` holds for a 200 body. The
/// projection applies events asynchronously.
pub async fn get_until(app: &Router, uri: &str, user: i64, done: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..200 {
        let (status, json) = get_json(app, uri, user).await;
        if status == StatusCode::OK && done(&json) {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{uri} never reached the expected state");
}

/// Creates room 100 "Team" for customers 1, 2 and 3 and waits until the
/// projection has it.
pub async fn create_team_room(app: &Router) -> Value {
    let (status, created) = post_json(
        app,
        "/api/v1/chat/room",
        1,
        &serde_json::json!({ "roomName": "Team", "targetCustomerIds": [2, 3] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    get_until(app, "/api/v1/chat/rooms", 3, |rooms| {
        rooms.as_array().is_some_and(|rooms| !rooms.is_empty())
    })
    .await;
    created
}
