use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::models::user::UserIdentity;

/// Why an outbound frame could not be queued for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The session is closed or its socket task has gone away.
    Closed,
    /// The outbound queue stayed full for the whole send timeout.
    TimedOut,
}

/// A connected client bound to one picture for the lifetime of its socket.
#[derive(Debug)]
pub struct EditSession {
    pub session_id: String,
    pub user: UserIdentity,
    pub picture_id: i64,
    tx: mpsc::Sender<String>,
    open: AtomicBool,
}

impl EditSession {
    pub fn new(user: UserIdentity, picture_id: i64, tx: mpsc::Sender<String>) -> Arc<Self> {
        Arc::new(Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            user,
            picture_id,
            tx,
            open: AtomicBool::new(true),
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    /// Mark the session closed. Returns `true` only for the call that
    /// actually performed the transition.
    pub fn close(&self) -> bool {
        self.open.swap(false, Ordering::SeqCst)
    }

    /// Queue a frame for the socket task, waiting at most `timeout` for room.
    pub async fn send(&self, frame: String, timeout: Duration) -> Result<(), SendError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(SendError::Closed);
        }
        self.tx
            .send_timeout(frame, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Closed(_) => SendError::Closed,
                SendTimeoutError::Timeout(_) => SendError::TimedOut,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = EditSession::new(UserIdentity::new(1, "alice"), 5, tx);
        session
            .send("hello".to_string(), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (tx, _rx) = mpsc::channel(4);
        let session = EditSession::new(UserIdentity::new(1, "alice"), 5, tx);
        assert!(session.close());
        assert!(!session.close(), "second close is a no-op");
        assert!(!session.is_open());
        let err = session
            .send("x".to_string(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, SendError::Closed);
    }

    #[tokio::test]
    async fn test_dropped_receiver_counts_as_closed() {
        let (tx, rx) = mpsc::channel(4);
        let session = EditSession::new(UserIdentity::new(1, "alice"), 5, tx);
        drop(rx);
        assert!(!session.is_open());
        let err = session
            .send("x".to_string(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, SendError::Closed);
    }

    #[tokio::test]
    async fn test_full_queue_times_out() {
        let (tx, _rx) = mpsc::channel(1);
        let session = EditSession::new(UserIdentity::new(1, "alice"), 5, tx);
        session
            .send("first".to_string(), Duration::from_millis(20))
            .await
            .unwrap();
        let err = session
            .send("second".to_string(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, SendError::TimedOut);
    }
}
