mod common;

use common::{connect, get_request, parse_body, recv_json, send_json, TestServer};
use http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::new().await;
    let response = server.router().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_version_endpoint() {
    let server = TestServer::new().await;
    let response = server.router().oneshot(get_request("/version")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["name"], "easelserver");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_sha"].is_string());
}

#[tokio::test]
async fn test_not_found() {
    let server = TestServer::new().await;
    let response = server
        .router()
        .oneshot(get_request("/nonexistent"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_status_for_unwatched_picture() {
    let server = TestServer::new().await;
    let response = server
        .router()
        .oneshot(get_request("/api/v1/pictures/77/edit-status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(
        body,
        json!({ "data": { "pictureId": "77", "editing": false, "watchers": 0 } })
    );
}

#[tokio::test]
async fn test_edit_status_rejects_non_numeric_id() {
    let server = TestServer::new().await;
    let response = server
        .router()
        .oneshot(get_request("/api/v1/pictures/abc/edit-status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_body(response).await;
    assert_eq!(body["error"]["code"], "invalid_request");
    assert_eq!(body["error"]["message"], "invalid picture id");
}

#[tokio::test]
async fn test_edit_status_and_stats_follow_sessions() {
    let server = TestServer::new().await;
    let alice = server.create_user_with_token("alice");
    let bob = server.create_user_with_token("bob");
    let url = server.spawn().await;

    let mut a = connect(&url, 12, &alice).await;
    let _b = connect(&url, 12, &bob).await;
    let _ = recv_json(&mut a).await;

    send_json(&mut a, json!({ "type": "ENTER_EDIT" })).await;
    assert_eq!(recv_json(&mut a).await["type"], "ENTER_EDIT");

    let response = server
        .router()
        .oneshot(get_request("/api/v1/pictures/12/edit-status"))
        .await
        .unwrap();
    let body = parse_body(response).await;
    assert_eq!(body["data"]["editing"], true);
    assert_eq!(body["data"]["watchers"], 2);
    assert_eq!(body["data"]["user"]["id"], alice.user.id.to_string());
    assert_eq!(body["data"]["user"]["displayName"], "alice");

    let response = server
        .router()
        .oneshot(get_request("/api/v1/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["data"]["watched_pictures"], 1);
    assert_eq!(body["data"]["held_tokens"], 1);
    assert_eq!(body["data"]["pipeline_shards"], 4);
}
