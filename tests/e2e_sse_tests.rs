//! End-to-end tests for the SSE transport
//!
//! Covers the session handshake, response delivery, HTTP status codes, and
//! cross-session isolation. Tool calls used here are ones that fail fast at
//! validation, so no root privilege or network access is needed.

mod common;

use std::time::Duration;

use common::{TestClient, TestServer};
use reqwest::StatusCode;

#[tokio::test]
async fn test_endpoint_event_bootstraps_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let connection = client.open_sse().await;

    assert!(connection.endpoint.starts_with("/messages?session_id="));
    let session_id = connection.session_id();
    assert_eq!(session_id.len(), 32);
    assert!(session_id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_initialize_handshake_round_trip() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut connection = client.open_sse().await;

    let response = client
        .post_message(
            &connection.endpoint,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let frame = connection.next_response().await;
    assert_eq!(frame["jsonrpc"], "2.0");
    assert_eq!(frame["id"], 1);
    assert_eq!(frame["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(frame["result"]["serverInfo"]["name"], "mcp-netutil");
    assert_eq!(frame["result"]["capabilities"]["tools"], serde_json::json!({}));

    // Exactly one frame per id.
    connection.expect_no_event(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_tools_list_contains_core_catalog() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut connection = client.open_sse().await;

    client
        .post_message(
            &connection.endpoint,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        )
        .await;

    let frame = connection.next_response().await;
    let tools = frame["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for core in ["latency", "traceroute", "system_stats"] {
        assert!(names.contains(&core), "catalog is missing {}", core);
    }
}

#[tokio::test]
async fn test_post_without_session_id_is_bad_request() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .post_message("/messages", r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_to_unknown_session_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .post_message(
            "/messages?session_id=00000000000000000000000000000000",
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_with_invalid_json_is_bad_request() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let connection = client.open_sse().await;

    let response = client
        .post_message(&connection.endpoint, "this is not json")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_on_message_sink_is_method_not_allowed() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .get(format!("{}/messages?session_id=abc", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cross_session_isolation() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let mut session_a = client.open_sse().await;
    let mut session_b = client.open_sse().await;
    assert_ne!(session_a.session_id(), session_b.session_id());

    client
        .post_message(
            &session_a.endpoint,
            r#"{"jsonrpc":"2.0","id":41,"method":"initialize"}"#,
        )
        .await;

    let frame = session_a.next_response().await;
    assert_eq!(frame["id"], 41);

    // The other session must see nothing.
    session_b.expect_no_event(Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_injection_attempt_yields_logical_error() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut connection = client.open_sse().await;

    client
        .post_message(
            &connection.endpoint,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call",
               "params":{"name":"traceroute","arguments":{"target":"8.8.8.8; rm -rf /"}}}"#,
        )
        .await;

    let frame = connection.next_response().await;
    assert!(frame.get("error").is_none());
    let result = &frame["result"];
    assert_eq!(result["isError"], serde_json::json!(true));
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("invalid characters in target"), "got: {}", text);
}

#[tokio::test]
async fn test_unknown_tool_yields_protocol_error() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut connection = client.open_sse().await;

    client
        .post_message(
            &connection.endpoint,
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"no_such_tool"}}"#,
        )
        .await;

    let frame = connection.next_response().await;
    assert_eq!(frame["error"]["code"], -32601);
}

#[tokio::test]
async fn test_notification_is_accepted_but_unanswered() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut connection = client.open_sse().await;

    let response = client
        .post_message(
            &connection.endpoint,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    connection.expect_no_event(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_read_records_round_trip_over_sse() {
    let server = TestServer::spawn_with_record_store().await;
    let client = TestClient::new(server.base_url.clone());
    let mut connection = client.open_sse().await;

    client
        .post_message(
            &connection.endpoint,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call",
               "params":{"name":"read_records","arguments":{"start_time":"00000000000000"}}}"#,
        )
        .await;

    let frame = connection.next_response().await;
    assert!(frame.get("error").is_none());
    let result = &frame["result"];
    assert!(result.get("isError").is_none());
    let records: Vec<serde_json::Value> =
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_api_key_moves_the_sse_path() {
    let key = "sk-netutil-AAAAbbbbCCCCddddEEEEffff00001111";
    let server = TestServer::spawn_with_api_key(key).await;
    let client = TestClient::new(server.base_url.clone());

    // The bare path no longer exists.
    let response = client
        .client
        .get(format!("{}/sse", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The keyed path serves the stream.
    let connection = client.open_sse_at(&format!("/sse/{}", key)).await;
    assert!(connection.endpoint.starts_with("/messages?session_id="));
}

#[tokio::test]
async fn test_concurrent_posts_are_answered_in_completion_order_by_id() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut connection = client.open_sse().await;

    // Fire several requests without waiting; correlation is by id, the
    // arrival order is unspecified.
    for id in 1..=5 {
        client
            .post_message(
                &connection.endpoint,
                &format!(r#"{{"jsonrpc":"2.0","id":{},"method":"tools/list"}}"#, id),
            )
            .await;
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        let frame = connection.next_response().await;
        seen.push(frame["id"].as_i64().unwrap());
    }
    seen.sort();
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}
