//! Integration tests for the chat command and query routes.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use parley_projection::InMemoryReadModelStore;
use parley_projection::domain::read_model::ReadModelStore;
use serde_json::{Value, json};

#[tokio::test]
async fn test_create_room_send_message_and_mark_read_round_trip() {
    let (platform, app) = common::start();

    // POST /room
    let created = common::create_team_room(&app).await;
    assert_eq!(created["roomId"], 100);
    let participants: Vec<i64> = created["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(participants, vec![1, 2, 3]);

    // POST /message
    let (status, sent) = common::post_json(
        &app,
        "/api/v1/chat/message",
        1,
        &json!({ "roomId": 100, "content": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["messageId"], 1000);
    assert_eq!(sent["senderDisplayName"], "Alice");

    // GET /rooms as a recipient: the view turns unread once projected
    let rooms = common::get_until(&app, "/api/v1/chat/rooms", 2, |rooms| {
        rooms[0]["lastMessage"]["content"] == "hi"
    })
    .await;
    assert_eq!(rooms[0]["unread"]["2"], true);
    assert_eq!(rooms[0]["unread"]["3"], true);
    assert_eq!(rooms[0]["unread"].get("1"), None);

    // POST /read
    let (status, marker) = common::post_json(
        &app,
        "/api/v1/chat/read",
        2,
        &json!({ "roomId": 100, "messageId": 1000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marker["lastReadMessageId"], 1000);

    let markers = common::get_until(&app, "/api/v1/chat/readMarkers/roomId/100", 2, |markers| {
        markers.as_array().is_some_and(|m| m.len() == 1)
    })
    .await;
    assert_eq!(markers[0]["customerId"], 2);
    assert_eq!(markers[0]["lastReadMessageId"], 1000);

    let rooms = common::get_until(&app, "/api/v1/chat/rooms", 2, |rooms| {
        rooms[0]["unread"]["2"] == false
    })
    .await;
    assert_eq!(rooms[0]["unread"]["3"], true);

    // GET /message/roomId/100
    let (status, history) = common::get_json(&app, "/api/v1/chat/message/roomId/100", 3).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["content"], "hi");

    platform.shutdown();
}

#[tokio::test]
async fn test_restarted_platform_keeps_rooms_over_the_same_stores() {
    // Arrange
    let chat_repository = common::memory_write_store();
    let read_model: Arc<dyn ReadModelStore> = Arc::new(InMemoryReadModelStore::new());
    let (platform, app) =
        common::start_with(Arc::clone(&chat_repository), Arc::clone(&read_model));
    common::create_team_room(&app).await;
    platform.shutdown();

    // Act
    let (platform, app) = common::start_with(chat_repository, read_model);
    let (status, sent) = common::post_json(
        &app,
        "/api/v1/chat/message",
        1,
        &json!({ "roomId": 100, "content": "after restart" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["messageId"], 1000);
    let rooms = common::get_until(&app, "/api/v1/chat/rooms", 2, |rooms| {
        rooms[0]["lastMessage"]["content"] == "after restart"
    })
    .await;
    assert_eq!(rooms[0]["unread"]["2"], true);
    let (history_status, history) =
        common::get_json(&app, "/api/v1/chat/message/roomId/100", 2).await;
    assert_eq!(history_status, StatusCode::OK);
    assert_eq!(history[0]["content"], "after restart");
    let (_, valid) = common::send(
        &app,
        Method::GET,
        "/internal/valid/roomId/100/customerId/2",
        None,
        None,
    )
    .await;
    assert_eq!(valid, json!({ "valid": true }));

    platform.shutdown();
}

#[tokio::test]
async fn test_history_pages_strictly_below_cursor() {
    let (platform, app) = common::start();
    common::create_team_room(&app).await;
    for content in ["one", "two", "three"] {
        let (status, _) = common::post_json(
            &app,
            "/api/v1/chat/message",
            2,
            &json!({ "roomId": 100, "content": content }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let latest = common::get_until(&app, "/api/v1/chat/message/roomId/100", 1, |messages| {
        messages.as_array().is_some_and(|m| m.len() == 3)
    })
    .await;
    let (status, older) =
        common::get_json(&app, "/api/v1/chat/message/roomId/100/index/1002", 1).await;

    let ids = |page: &Value| -> Vec<i64> {
        page.as_array()
            .unwrap()
            .iter()
            .map(|m| m["messageId"].as_i64().unwrap())
            .collect()
    };
    assert_eq!(ids(&latest), vec![1002, 1001, 1000]);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&older), vec![1001, 1000]);

    platform.shutdown();
}

#[tokio::test]
async fn test_request_without_token_is_unauthorized() {
    let (platform, app) = common::start();

    let (status, json) = common::send(
        &app,
        Method::POST,
        "/api/v1/chat/message",
        None,
        Some(&json!({ "roomId": 100, "content": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
    platform.shutdown();
}

#[tokio::test]
async fn test_empty_content_is_bad_input() {
    let (platform, app) = common::start();
    common::create_team_room(&app).await;

    let (status, json) = common::post_json(
        &app,
        "/api/v1/chat/message",
        1,
        &json!({ "roomId": 100, "content": "   " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_input");
    platform.shutdown();
}

#[tokio::test]
async fn test_room_with_no_targets_holds_only_the_creator() {
    let (platform, app) = common::start();

    let (status, created) = common::post_json(
        &app,
        "/api/v1/chat/room",
        1,
        &json!({ "roomName": "Notes", "targetCustomerIds": [1] }),
    )
    .await;
    let (blank_status, blank) = common::post_json(
        &app,
        "/api/v1/chat/room",
        1,
        &json!({ "roomName": " ", "targetCustomerIds": [2] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["participants"].as_array().unwrap().len(), 1);
    assert_eq!(created["participants"][0]["id"], 1);
    assert_eq!(blank_status, StatusCode::BAD_REQUEST);
    assert_eq!(blank["error"], "bad_input");
    platform.shutdown();
}

#[tokio::test]
async fn test_outsider_cannot_post_or_read_room() {
    let (platform, app) = common::start();
    common::create_team_room(&app).await;

    let (post_status, post_json) = common::post_json(
        &app,
        "/api/v1/chat/message",
        9,
        &json!({ "roomId": 100, "content": "let me in" }),
    )
    .await;
    let (read_status, _) = common::post_json(
        &app,
        "/api/v1/chat/read",
        9,
        &json!({ "roomId": 100, "messageId": 1000 }),
    )
    .await;
    let (history_status, _) =
        common::get_json(&app, "/api/v1/chat/message/roomId/100", 9).await;

    assert_eq!(post_status, StatusCode::FORBIDDEN);
    assert_eq!(post_json["error"], "forbidden");
    assert_eq!(read_status, StatusCode::FORBIDDEN);
    assert_eq!(history_status, StatusCode::FORBIDDEN);
    platform.shutdown();
}

#[tokio::test]
async fn test_unknown_room_queries_are_not_found() {
    let (platform, app) = common::start();

    let (status, json) = common::get_json(&app, "/api/v1/chat/onlineStatus/roomId/404", 1).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
    platform.shutdown();
}

#[tokio::test]
async fn test_online_status_lists_every_participant() {
    let (platform, app) = common::start();
    common::create_team_room(&app).await;

    let (status, json) = common::get_json(&app, "/api/v1/chat/onlineStatus/roomId/100", 2).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!([
            { "customerId": 1, "online": false },
            { "customerId": 2, "online": false },
            { "customerId": 3, "online": false },
        ])
    );
    platform.shutdown();
}

#[tokio::test]
async fn test_websocket_without_token_is_rejected_before_upgrade() {
    let (platform, app) = common::start();

    let (status, json) = common::send(&app, Method::GET, "/ws/chat", None, None).await;
    let (bad_status, _) =
        common::send(&app, Method::GET, "/ws/chat?token=not-a-jwt", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
    assert_eq!(bad_status, StatusCode::UNAUTHORIZED);
    platform.shutdown();
}
