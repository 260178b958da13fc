//! Fire-and-forget position persistence.
//!
//! Applied frames hand their positions to a background writer over a bounded
//! `mpsc` channel. Failures never touch the applied frame; they are
//! published as [`Notice`]s on a broadcast channel instead.

use std::collections::HashMap;
use std::sync::Arc;

use semantic_tiles_core::{DomainId, PositionedDomain};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::OpsError;
use crate::store::DomainStore;

const QUEUE_CAPACITY: usize = 64;

/// Positions of one applied frame, waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistJob {
    pub parent: Option<DomainId>,
    pub generation: u64,
    pub positions: Vec<PositionedDomain>,
}

/// Out-of-band events for front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Positions of an applied frame could not be written back.
    PersistenceFailed {
        parent: Option<DomainId>,
        generation: u64,
        message: String,
    },
}

enum Command {
    Persist(PersistJob),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background writer task.
#[derive(Debug, Clone)]
pub(crate) struct PersistenceQueue {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Persist(job) => f.debug_tuple("Persist").field(job).finish(),
            Command::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl PersistenceQueue {
    /// Spawn the writer on the current tokio runtime.
    pub(crate) fn spawn(store: Arc<dyn DomainStore>, notices: broadcast::Sender<Notice>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_writer(store, notices, rx));
        Self { tx }
    }

    /// Queue a job. Returns false if the writer has stopped.
    pub(crate) async fn enqueue(&self, job: PersistJob) -> bool {
        self.tx.send(Command::Persist(job)).await.is_ok()
    }

    /// Wait until every job queued before this call has been handled.
    pub(crate) async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_writer(
    store: Arc<dyn DomainStore>,
    notices: broadcast::Sender<Notice>,
    mut rx: mpsc::Receiver<Command>,
) {
    // Newest generation handled per level; jobs can arrive out of order.
    let mut newest: HashMap<Option<DomainId>, u64> = HashMap::new();

    while let Some(command) = rx.recv().await {
        let job = match command {
            Command::Persist(job) => job,
            Command::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        if newest.get(&job.parent).is_some_and(|&g| g >= job.generation) {
            debug!(
                parent = ?job.parent,
                generation = job.generation,
                "Skipping positions older than a handled generation"
            );
            continue;
        }
        newest.insert(job.parent.clone(), job.generation);

        let parent = job.parent.clone();
        let generation = job.generation;
        let count = job.positions.len();
        let store = Arc::clone(&store);
        let result = tokio::task::spawn_blocking(move || {
            store.persist_positions(job.parent.as_ref(), &job.positions)
        })
        .await
        .unwrap_or_else(|e| Err(OpsError::Persistence(e.to_string())));

        match result {
            Ok(()) => debug!(?parent, generation, count, "Positions persisted"),
            Err(e) => {
                warn!(?parent, generation, error = %e, "Position persistence failed");
                // No subscribers is fine; the failure is already logged.
                let _ = notices.send(Notice::PersistenceFailed {
                    parent,
                    generation,
                    message: e.to_string(),
                });
            }
        }
    }
    debug!("Persistence writer stopped");
}
