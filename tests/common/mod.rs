#![allow(dead_code)]

use axum::body::Body;
use easelserver::config::Config;
use easelserver::middleware::auth::StaticTokenResolver;
use easelserver::models::user::UserIdentity;
use easelserver::pipeline::Pipeline;
use easelserver::routes;
use easelserver::state::AppState;
use futures_util::{SinkExt, StreamExt};
use http::{Method, Request};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A user registered with the test server's credential table.
pub struct TestUser {
    pub user: UserIdentity,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Generate a random token string.
pub fn generate_token() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

/// Test server with its own in-memory state and pipeline.
/// Instances share nothing, so tests can run in parallel.
pub struct TestServer {
    pub state: AppState,
    pub identity: Arc<StaticTokenResolver>,
    pipeline: Option<Pipeline>,
    next_user_id: AtomicI64,
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        workers: 4,
        buffer_capacity: 1024,
        send_timeout: Duration::from_millis(500),
        outbound_queue: 64,
        shutdown_grace: Duration::from_secs(1),
        tokens: Vec::new(),
    }
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let identity = Arc::new(StaticTokenResolver::new());
        let (state, pipeline) = AppState::new(&config, identity.clone());
        Self {
            state,
            identity,
            pipeline: Some(pipeline),
            next_user_id: AtomicI64::new(1),
        }
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    /// Binds a TCP listener on port 0, spawns the server, and returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{}", addr.port())
    }

    pub fn create_user_with_token(&self, display_name: &str) -> TestUser {
        let user = UserIdentity::new(
            self.next_user_id.fetch_add(1, Ordering::SeqCst),
            display_name,
        );
        let token = generate_token();
        self.identity.insert(&token, user.clone());
        TestUser { user, token }
    }

    pub async fn shutdown_pipeline(&mut self) -> easelserver::pipeline::ShutdownOutcome {
        self.pipeline
            .take()
            .expect("pipeline already shut down")
            .shutdown()
            .await
    }
}

// ---------------------------------------------------------------------------
// WebSocket helpers
// ---------------------------------------------------------------------------

pub fn ws_url(base_url: &str, picture_id: i64, token: &str) -> String {
    format!(
        "{}/ws/picture/edit?pictureId={picture_id}&token={token}",
        base_url.replace("http://", "ws://")
    )
}

/// Connect as `user` to `picture_id` and consume the user's own join notice.
pub async fn connect(base_url: &str, picture_id: i64, user: &TestUser) -> WsClient {
    let (mut ws, _) = connect_async(ws_url(base_url, picture_id, &user.token))
        .await
        .expect("failed to connect");
    let joined = recv_json(&mut ws).await;
    assert_eq!(joined["type"], "INFO");
    assert_eq!(joined["user"]["id"], user.user.id.to_string());
    ws
}

pub async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("failed to send frame");
}

/// Next text frame parsed as JSON, failing the test after five seconds.
pub async fn recv_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() {
            let text = msg.into_text().unwrap();
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Assert nothing arrives within `window`.
pub async fn assert_silent(ws: &mut WsClient, window: Duration) {
    if let Ok(Some(Ok(msg))) = tokio::time::timeout(window, ws.next()).await {
        panic!("expected no frame, got {msg:?}");
    }
}

// ---------------------------------------------------------------------------
// Request builder helpers
// ---------------------------------------------------------------------------

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Parse a response body into a `serde_json::Value`.
pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
