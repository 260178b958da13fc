//! TilesContext - the main service for executing operations.
//!
//! Holds configuration, the domain store, the last applied frame per level
//! and the persistence queue. Cheap to clone and shareable across tasks.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use semantic_tiles_core::{DomainId, LayoutSnapshot, Rect};
use semantic_tiles_layout::{compute_layout, LayoutOutcome};
use semantic_tiles_tessellation::{RegionIndex, RenderFrame};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{OpsError, OpsResult};
use crate::persistence::{Notice, PersistJob, PersistenceQueue};
use crate::requests::{HitRequest, RecomputeRequest};
use crate::responses::{HitResponse, RecomputeResponse};
use crate::store::{DomainStore, SiblingSet};

const NOTICE_CAPACITY: usize = 100;

/// Layout plus regions for one level, before it is applied.
#[derive(Debug, Clone)]
pub struct ComputedFrame {
    pub outcome: LayoutOutcome,
    pub index: RegionIndex,
}

impl ComputedFrame {
    pub fn frame(&self) -> RenderFrame {
        self.index.frame()
    }
}

/// Lay out and tessellate one sibling set. Pure and synchronous.
pub fn compute_frame(
    siblings: &SiblingSet,
    width: f64,
    height: f64,
    previous: Option<&LayoutSnapshot>,
    config: &Config,
) -> OpsResult<ComputedFrame> {
    let outcome = compute_layout(
        &siblings.domains,
        &siblings.distances,
        width,
        height,
        previous,
        &config.layout,
    )?;
    let index = RegionIndex::build(
        &outcome.domains,
        Rect::from_size(width, height),
        &config.tessellation,
    )?;
    Ok(ComputedFrame { outcome, index })
}

/// Per-level state: generations handed out, still running and applied.
#[derive(Debug, Default)]
struct Level {
    issued: u64,
    running: BTreeSet<u64>,
    applied: Option<AppliedFrame>,
    /// Newest finished frame waiting on a newer request that may still fail.
    held: Option<AppliedFrame>,
}

#[derive(Debug, Clone)]
struct AppliedFrame {
    generation: u64,
    width: f64,
    height: f64,
    snapshot: LayoutSnapshot,
    index: RegionIndex,
    /// Positions to write back once the frame is applied.
    persist: Option<PersistJob>,
}

impl Level {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.running.insert(self.issued);
        self.issued
    }

    fn applied_generation(&self) -> u64 {
        self.applied.as_ref().map_or(0, |a| a.generation)
    }

    fn running_after(&self, generation: u64) -> bool {
        self.running.range(generation + 1..).next().is_some()
    }

    /// Snapshot of the applied frame, only if it was laid out on this canvas.
    fn snapshot_for(&self, width: f64, height: f64) -> Option<LayoutSnapshot> {
        self.applied
            .as_ref()
            .filter(|a| a.width == width && a.height == height)
            .map(|a| a.snapshot.clone())
    }

    /// Record a finished frame. Returns whether it was applied.
    fn finish(&mut self, frame: AppliedFrame) -> bool {
        self.running.remove(&frame.generation);
        if frame.generation <= self.applied_generation() {
            return false;
        }
        if self.running_after(frame.generation) {
            if self.held.as_ref().map_or(true, |h| h.generation < frame.generation) {
                self.held = Some(frame);
            }
            return false;
        }
        self.held = None;
        self.applied = Some(frame);
        true
    }

    /// Record a failed request. A held frame that nothing newer can replace
    /// any more is applied instead and returned.
    fn fail(&mut self, generation: u64) -> Option<&AppliedFrame> {
        self.running.remove(&generation);
        let held = self.held.take()?;
        if self.running_after(held.generation) {
            self.held = Some(held);
            return None;
        }
        self.applied = Some(held);
        self.applied.as_ref()
    }
}

struct Inner {
    config: Config,
    store: Arc<dyn DomainStore>,
    levels: Mutex<HashMap<Option<DomainId>, Level>>,
    persistence: PersistenceQueue,
    notices: broadcast::Sender<Notice>,
}

/// The main operations context.
///
/// Must be created inside a tokio runtime: it spawns the persistence writer.
#[derive(Clone)]
pub struct TilesContext {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TilesContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TilesContext")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl TilesContext {
    /// Create a context over `store`.
    pub fn new(config: Config, store: Arc<dyn DomainStore>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let persistence = PersistenceQueue::spawn(Arc::clone(&store), notices.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                levels: Mutex::new(HashMap::new()),
                persistence,
                notices,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn DomainStore> {
        &self.inner.store
    }

    /// Subscribe to notices published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    // =========================================================================
    // Recompute
    // =========================================================================

    /// Lay out and tessellate a level, applying the result unless a newer
    /// request for the same level was issued meanwhile.
    ///
    /// A result superseded by a request that is still running is held back
    /// and applied later if that newer request fails.
    pub async fn recompute(&self, request: RecomputeRequest) -> OpsResult<RecomputeResponse> {
        let parent = request.parent.clone();
        let (width, height) = self.inner.config.canvas(request.width, request.height);

        let (generation, previous) = {
            let mut levels = self.levels();
            let level = levels.entry(parent.clone()).or_default();
            let generation = level.issue();
            (generation, level.snapshot_for(width, height))
        };
        debug!(
            ?parent,
            generation,
            width,
            height,
            reuse_snapshot = previous.is_some(),
            "Recompute issued"
        );

        let store = Arc::clone(&self.inner.store);
        let config = self.inner.config.clone();
        let level_parent = parent.clone();
        let result = tokio::task::spawn_blocking(move || {
            let siblings = store.fetch_sibling_domains(level_parent.as_ref())?;
            compute_frame(&siblings, width, height, previous.as_ref(), &config)
        })
        .await
        .map_err(|e| OpsError::with_context("Recompute task failed", e.to_string()))
        .and_then(|computed| computed);

        let computed = match result {
            Ok(computed) => computed,
            Err(e) => {
                let promoted = {
                    let mut levels = self.levels();
                    levels
                        .get_mut(&parent)
                        .and_then(|level| level.fail(generation))
                        .map(|a| (a.generation, a.persist.clone()))
                };
                if let Some((held, job)) = promoted {
                    info!(?parent, generation = held, failed = generation, "Held frame applied");
                    if let Some(job) = job {
                        self.queue(job).await;
                    }
                }
                return Err(e);
            }
        };

        let ComputedFrame { outcome, index } = computed;
        let frame = index.frame();
        let persist = (request.persist && outcome.strategy.moves_domains()).then(|| PersistJob {
            parent: parent.clone(),
            generation,
            positions: outcome.domains.clone(),
        });
        let applied = {
            let mut levels = self.levels();
            let level = levels.entry(parent.clone()).or_default();
            level.finish(AppliedFrame {
                generation,
                width,
                height,
                snapshot: outcome.snapshot(),
                index,
                persist: persist.clone(),
            })
        };

        let mut persist_queued = false;
        if applied {
            info!(
                ?parent,
                generation,
                strategy = outcome.strategy.label(),
                tiles = frame.len(),
                "Frame applied"
            );
            if let Some(job) = persist {
                persist_queued = self.queue(job).await;
            }
        } else {
            debug!(?parent, generation, "Stale recompute not applied");
        }

        Ok(RecomputeResponse {
            parent,
            generation,
            applied,
            strategy: outcome.strategy,
            iterations: outcome.iterations,
            converged: outcome.converged,
            dropped_links: outcome.dropped_links,
            persist_queued,
            frame,
        })
    }

    /// Last applied frame of a level.
    pub fn frame(&self, parent: Option<&DomainId>) -> Option<RenderFrame> {
        let levels = self.levels();
        let key = parent.cloned();
        levels
            .get(&key)
            .and_then(|l| l.applied.as_ref())
            .map(|a| a.index.frame())
    }

    /// Generation of the last applied frame of a level.
    pub fn applied_generation(&self, parent: Option<&DomainId>) -> Option<u64> {
        let levels = self.levels();
        levels
            .get(&parent.cloned())
            .and_then(|l| l.applied.as_ref())
            .map(|a| a.generation)
    }

    // =========================================================================
    // Hit-testing
    // =========================================================================

    /// Resolve a point against the last applied frame of a level,
    /// computing the level first if it has never been shown.
    pub async fn hit_test(&self, request: HitRequest) -> OpsResult<HitResponse> {
        if self.applied_generation(request.parent.as_ref()).is_none() {
            let recompute = RecomputeRequest {
                parent: request.parent.clone(),
                ..RecomputeRequest::root()
            };
            self.recompute(recompute).await?;
        }

        let levels = self.levels();
        let index = levels
            .get(&request.parent)
            .and_then(|l| l.applied.as_ref())
            .map(|a| &a.index);
        let (domain, pick) = match index {
            Some(index) => (
                index.hit_test(request.x, request.y).cloned(),
                index.pick(request.x, request.y),
            ),
            None => (None, None),
        };

        Ok(HitResponse {
            parent: request.parent,
            x: request.x,
            y: request.y,
            domain,
            pick,
        })
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    async fn queue(&self, job: PersistJob) -> bool {
        let (parent, generation) = (job.parent.clone(), job.generation);
        let queued = self.inner.persistence.enqueue(job).await;
        if !queued {
            warn!(?parent, generation, "Persistence writer is gone, positions not queued");
        }
        queued
    }

    /// Wait for queued position writes to finish.
    pub async fn flush(&self) {
        self.inner.persistence.flush().await;
    }

    fn levels(&self) -> MutexGuard<'_, HashMap<Option<DomainId>, Level>> {
        self.inner
            .levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
