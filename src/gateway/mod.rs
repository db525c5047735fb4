pub mod arbiter;
pub mod dispatcher;
pub mod events;
pub mod handler;
pub mod registry;
pub mod session;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::middleware::auth::extract_token;
use crate::models::user::UserIdentity;
use crate::state::AppState;
use events::{EditEvent, EditRequest};
use session::EditSession;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(rename = "pictureId")]
    pub picture_id: Option<String>,
    pub token: Option<String>,
}

/// Resolve the picture and identity up front; both stay fixed for the
/// lifetime of the socket.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let picture_id = params
        .picture_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::BadRequest("missing or invalid pictureId".to_string()))?;

    let user = extract_token(&headers, params.token.as_deref())
        .and_then(|token| state.identity.resolve(&token))
        .ok_or_else(|| {
            AppError::Unauthorized("invalid or missing authentication".to_string())
        })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user, picture_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: UserIdentity, picture_id: i64) {
    let (ws_sink, mut ws_stream) = socket.split();

    // Outbound frames for this client; workers and broadcasts queue here.
    // Egress runs on its own task so a publish suspended by backpressure
    // never stops the client's queue from draining.
    let (tx, rx) = mpsc::channel::<String>(state.outbound_queue);
    let session = EditSession::new(user, picture_id, tx);
    let mut egress = tokio::spawn(forward_outbound(rx, ws_sink));

    tracing::debug!(
        picture_id,
        user_id = session.user.id,
        session_id = %session.session_id,
        "edit session opened"
    );
    state.handler.handle_open(&session).await;

    loop {
        tokio::select! {
            _ = &mut egress => break,
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(event) = decode_frame(&session, text.as_str()) else {
                            continue;
                        };
                        // A dead socket must not wait for a buffer slot.
                        tokio::select! {
                            result = state.publisher.publish(event) => {
                                if let Err(e) = result {
                                    tracing::warn!(session_id = %session.session_id, "{e}");
                                    break;
                                }
                            }
                            _ = &mut egress => break,
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    state.handler.handle_disconnect(&session).await;
    egress.abort();
    tracing::debug!(
        picture_id,
        session_id = %session.session_id,
        "edit session closed"
    );
}

/// Write queued frames to the socket until the queue closes or a write fails.
async fn forward_outbound(mut rx: mpsc::Receiver<String>, mut sink: SplitSink<WebSocket, Message>) {
    while let Some(frame) = rx.recv().await {
        if sink.send(Message::Text(frame.into())).await.is_err() {
            break;
        }
    }
}

/// Decode a frame into an event for this session. Malformed frames and
/// frames that do not apply to the bound picture yield `None`.
fn decode_frame(session: &Arc<EditSession>, text: &str) -> Option<EditEvent> {
    let request = match EditRequest::decode(text) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(
                session_id = %session.session_id,
                "dropping malformed frame: {e}"
            );
            return None;
        }
    };

    let Some(kind) = request.into_kind(session.picture_id) else {
        tracing::trace!(session_id = %session.session_id, "dropping unusable frame");
        return None;
    };
    Some(EditEvent::new(Arc::clone(session), kind))
}
