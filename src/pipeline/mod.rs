//! Bounded ingestion buffer between connection tasks and the worker pool.
//!
//! Events are sharded by picture id: shard `picture_id mod W` owns its own
//! bounded channel and exactly one worker, so every event for a given
//! picture is processed in the order it was published while unrelated
//! pictures proceed in parallel.

pub mod worker;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::gateway::events::EditEvent;

/// Work executed by a pipeline worker for each claimed event.
pub trait EventProcessor: Send + Sync + 'static {
    fn process(&self, event: EditEvent) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    /// The pipeline has shut down and no longer accepts events.
    Closed,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Closed => write!(f, "event pipeline is closed"),
        }
    }
}

impl std::error::Error for PipelineError {}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    /// Total buffer slots, split evenly across shards.
    pub capacity: usize,
    pub shutdown_grace: Duration,
}

impl PipelineConfig {
    fn shard_capacity(&self) -> usize {
        (self.capacity / self.workers.max(1)).max(1)
    }
}

/// Shard owning `picture_id` among `shards` workers.
pub fn shard_index(picture_id: i64, shards: usize) -> usize {
    picture_id.rem_euclid(shards as i64) as usize
}

/// Producer handle. Cheap to clone; one copy lives in every connection task.
#[derive(Clone)]
pub struct EventPublisher {
    shards: Arc<[mpsc::Sender<EditEvent>]>,
}

impl EventPublisher {
    /// Claim a slot in the owning shard's buffer and write the event into it.
    ///
    /// Suspends while the shard is full.
    pub async fn publish(&self, event: EditEvent) -> Result<(), PipelineError> {
        let shard = &self.shards[shard_index(event.picture_id, self.shards.len())];
        let slot = shard.reserve().await.map_err(|_| PipelineError::Closed)?;
        slot.send(event);
        Ok(())
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every worker finished its in-flight event within the grace period.
    Drained,
    /// This many workers were still busy at the deadline and were aborted.
    Halted { workers: usize },
}

/// Owns the worker tasks. Dropping it signals the workers to stop after their
/// current event without waiting for them; use [`Pipeline::shutdown`] to wait.
pub struct Pipeline {
    workers: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_grace: Duration,
}

impl Pipeline {
    pub fn start<P: EventProcessor>(
        config: &PipelineConfig,
        processor: Arc<P>,
    ) -> (Self, EventPublisher) {
        let worker_count = config.workers.max(1);
        let shard_capacity = config.shard_capacity();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for shard in 0..worker_count {
            let (tx, rx) = mpsc::channel(shard_capacity);
            senders.push(tx);
            workers.push(tokio::spawn(worker::run(
                shard,
                rx,
                shutdown_rx.clone(),
                Arc::clone(&processor),
            )));
        }

        tracing::info!(
            workers = worker_count,
            shard_capacity,
            "event pipeline started"
        );

        (
            Self {
                workers,
                shutdown_tx,
                shutdown_grace: config.shutdown_grace,
            },
            EventPublisher {
                shards: senders.into(),
            },
        )
    }

    /// Stop claiming new events, let in-flight ones finish within the grace
    /// period, then abort whatever is still running.
    pub async fn shutdown(self) -> ShutdownOutcome {
        let _ = self.shutdown_tx.send(true);
        let deadline = tokio::time::Instant::now() + self.shutdown_grace;

        let mut halted = 0;
        for mut handle in self.workers {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                let _ = handle.await;
                halted += 1;
            }
        }

        if halted > 0 {
            tracing::warn!(
                workers = halted,
                grace_ms = self.shutdown_grace.as_millis() as u64,
                "event pipeline shutdown timed out, halting remaining workers"
            );
            ShutdownOutcome::Halted { workers: halted }
        } else {
            tracing::info!("event pipeline drained");
            ShutdownOutcome::Drained
        }
    }
}
