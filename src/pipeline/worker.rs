use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use super::EventProcessor;
use crate::gateway::events::EditEvent;

/// Worker loop for one shard.
///
/// A shutdown signal is only observed between events: once an event has been
/// received it is processed to completion before the loop checks again.
pub(super) async fn run<P: EventProcessor>(
    shard: usize,
    mut rx: mpsc::Receiver<EditEvent>,
    mut shutdown: watch::Receiver<bool>,
    processor: Arc<P>,
) {
    tracing::debug!(shard, "pipeline worker started");
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        processor.process(event).await;
    }

    rx.close();
    let discarded = std::iter::from_fn(|| rx.try_recv().ok()).count();
    if discarded > 0 {
        tracing::debug!(shard, discarded, "discarded unclaimed events on shutdown");
    }
    tracing::debug!(shard, "pipeline worker stopped");
}
