use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use super::events::EditResponse;
use super::registry::SessionRegistry;
use super::session::{EditSession, SendError};

/// Fans outbound frames out to a picture's watch group.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Send to every session watching `picture_id` except `exclude_session`.
    ///
    /// Sends run concurrently, each bounded by the send timeout. Sessions
    /// found closed are pruned from the group. Returns how many sessions the
    /// frame was queued for.
    pub async fn broadcast(
        &self,
        picture_id: i64,
        message: &EditResponse,
        exclude_session: Option<&str>,
    ) -> usize {
        let Some(frame) = encode(message) else {
            return 0;
        };

        let targets: Vec<Arc<EditSession>> = self
            .registry
            .members(picture_id)
            .into_iter()
            .filter(|s| exclude_session != Some(s.session_id.as_str()))
            .collect();

        let results = join_all(targets.iter().map(|session| {
            let frame = frame.clone();
            async move { session.send(frame, self.send_timeout).await }
        }))
        .await;

        let mut delivered = 0;
        for (session, result) in targets.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(SendError::Closed) => {
                    if self.registry.leave(picture_id, &session.session_id) {
                        tracing::debug!(
                            picture_id,
                            session_id = %session.session_id,
                            "pruned closed session from watch group"
                        );
                    }
                }
                Err(SendError::TimedOut) => {
                    tracing::warn!(
                        picture_id,
                        session_id = %session.session_id,
                        "broadcast send timed out, frame dropped for slow session"
                    );
                }
            }
        }
        delivered
    }

    /// Best-effort send to a single session. Failures are logged, never retried.
    pub async fn unicast(&self, session: &EditSession, message: &EditResponse) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        match session.send(frame, self.send_timeout).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    session_id = %session.session_id,
                    "unicast failed: {:?}",
                    e
                );
                false
            }
        }
    }
}

fn encode(message: &EditResponse) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!("failed to encode outbound frame: {e}");
            None
        }
    }
}
