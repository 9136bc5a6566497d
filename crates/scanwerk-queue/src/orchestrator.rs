// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async front end for the scan queue.
//
// The queue itself lives behind a mutex and is only locked for short,
// non-blocking state changes. Decoding, detection, rectification and
// enhancement run on Tokio's blocking pool, and their results are committed
// back through the queue's ticket checks, so a removal or a newer edit that
// lands while work is in flight always wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{DocumentSink, EnhancementMode, ItemId, ItemStatus, Point, ScanConfig};
use scanwerk_vision::RasterImage;
use tokio::sync::{Notify, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

use crate::queue::{Edit, INTERNAL_FAILURE, ScanQueue};

fn lock(queue: &Mutex<ScanQueue>) -> MutexGuard<'_, ScanQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

fn task_failure(id: ItemId, err: JoinError) -> ScanwerkError {
    error!(item_id = %id, error = %err, "Pipeline task failed");
    ScanwerkError::Pipeline(INTERNAL_FAILURE.into())
}

/// Shared handle to a scan queue that runs pipeline work off the caller's
/// task. Clones refer to the same queue.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    queue: Arc<Mutex<ScanQueue>>,
    /// Signalled whenever new work may be pending.
    wake: Arc<Notify>,
}

impl Orchestrator {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        ScanQueue::new(config).map(Self::from_queue)
    }

    pub fn from_queue(queue: ScanQueue) -> Self {
        Self {
            queue: Arc::new(Mutex::new(queue)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Run `f` with the queue locked. Keep `f` short: it blocks every other
    /// queue operation, including progress reports from running work.
    ///
    /// `f` may admit, complete or remove items, so a running worker is woken
    /// afterwards to look for work again.
    pub fn with_queue<R>(&self, f: impl FnOnce(&mut ScanQueue) -> R) -> R {
        let result = self.locked(f);
        self.wake.notify_one();
        result
    }

    /// Lock without waking the worker; for the orchestrator's own steps.
    fn locked<R>(&self, f: impl FnOnce(&mut ScanQueue) -> R) -> R {
        f(&mut lock(&self.queue))
    }

    pub fn ingest(&self, name: impl Into<String>, bytes: Vec<u8>) -> ItemId {
        let id = self.locked(|q| q.ingest(name, bytes));
        self.wake.notify_one();
        id
    }

    pub fn ingest_decoded(&self, name: impl Into<String>, image: RasterImage) -> ItemId {
        let id = self.locked(|q| q.ingest_decoded(name, image));
        self.wake.notify_one();
        id
    }

    pub fn retry(&self, id: ItemId) -> Result<()> {
        self.locked(|q| q.retry(id))?;
        self.wake.notify_one();
        Ok(())
    }

    /// Remove an item. Removing the processing item frees the slot, so the
    /// worker is woken.
    pub fn remove(&self, id: ItemId) -> Result<()> {
        self.locked(|q| q.remove(id))?;
        self.wake.notify_one();
        Ok(())
    }

    /// Store a completed item in `sink`, then drop it from the queue.
    ///
    /// The queue is unlocked while the sink runs, so processing and edits
    /// carry on during slow storage. This blocks on the sink; async callers
    /// should run it on the blocking pool.
    pub fn hand_off(&self, id: ItemId, sink: &dyn DocumentSink) -> Result<String> {
        let document = self.locked(|q| q.export(id))?;
        let key = sink.store(&document)?;
        // Stored even if the item vanished meanwhile; the key stays valid.
        if let Err(e) = self.remove(id) {
            debug!(item_id = %id, error = %e, "Handed-off item already gone");
        }
        info!(item_id = %id, key = %key, "Item handed off");
        Ok(key)
    }

    // -- Processing -----------------------------------------------------------

    /// Admit and process the next pending item. Returns `None` if nothing
    /// was admitted, either because the queue has no pending items or
    /// because another item is already processing.
    pub async fn process_next(&self) -> Option<ItemId> {
        let (ticket, pipeline) = self.locked(|q| Some((q.admit_next()?, q.pipeline())))?;
        let (id, attempt) = (ticket.id, ticket.attempt);
        let input = ticket.input.clone();
        let queue = Arc::clone(&self.queue);

        let outcome = tokio::task::spawn_blocking(move || {
            pipeline.run(&input, |stage| {
                lock(&queue).report_progress(id, attempt, stage);
            })
        })
        .await
        .unwrap_or_else(|err| Err(task_failure(id, err)));

        self.locked(|q| q.complete(ticket, outcome));
        // The slot is free again; another task's worker may be parked on it.
        self.wake.notify_one();
        Some(id)
    }

    /// Process pending items until none remain.
    pub async fn run_until_idle(&self) -> Vec<ItemId> {
        let mut processed = Vec::new();
        while let Some(id) = self.process_next().await {
            processed.push(id);
        }
        processed
    }

    /// Start a background task that processes items as they are ingested.
    pub fn spawn_worker(&self) -> Worker {
        let (shutdown, mut stopped) = watch::channel(false);
        let this = self.clone();
        let handle = tokio::spawn(async move {
            info!("Scan worker started");
            loop {
                if *stopped.borrow() {
                    break;
                }
                if this.process_next().await.is_some() {
                    continue;
                }
                tokio::select! {
                    changed = stopped.changed() => {
                        // Sender dropped without `stop`.
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = this.wake.notified() => {}
                }
            }
            info!("Scan worker stopped");
        });
        Worker { shutdown, handle }
    }

    // -- Editing --------------------------------------------------------------

    /// Apply an edit to a completed item. Returns `Ok(false)` when a newer
    /// edit superseded this one before it finished.
    pub async fn edit(&self, id: ItemId, edit: Edit) -> Result<bool> {
        let (ticket, pipeline) = self.locked(|q| Ok::<_, ScanwerkError>((q.begin_edit(id, edit)?, q.pipeline())))?;
        let job = ticket.clone();
        let outcome = tokio::task::spawn_blocking(move || pipeline.reprocess(&job))
            .await
            .unwrap_or_else(|err| Err(task_failure(id, err)));
        self.locked(|q| q.commit_edit(ticket, outcome))
    }

    pub async fn edit_corners(&self, id: ItemId, points: [Point; 4]) -> Result<bool> {
        self.edit(id, Edit::Corners(points)).await
    }

    /// Change an item's mode; completed items are re-enhanced off-thread.
    pub async fn set_mode(&self, id: ItemId, mode: EnhancementMode) -> Result<()> {
        match self.locked(|q| q.status(id))? {
            ItemStatus::Completed => self.edit(id, Edit::Mode(mode)).await.map(|_| ()),
            _ => self.locked(|q| q.set_mode(id, mode)),
        }
    }

    /// Re-run detection for a completed item and apply what it finds.
    /// Returns whether new corners were applied; `false` when nothing was
    /// found or a newer edit superseded this one.
    pub async fn auto_detect(&self, id: ItemId) -> Result<bool> {
        let (source, pipeline) = self.locked(|q| Ok::<_, ScanwerkError>((q.detect_source(id)?, q.pipeline())))?;
        let detection = tokio::task::spawn_blocking(move || pipeline.detect(&source))
            .await
            .map_err(|err| task_failure(id, err))?;

        let Some(detection) = detection else {
            debug!(item_id = %id, "Auto-detect found no document");
            return Ok(false);
        };
        let applied = self.edit_corners(id, *detection.corners.points()).await?;
        if applied {
            self.locked(|q| q.record_confidence(id, detection.confidence));
        }
        Ok(applied)
    }
}

/// Handle to a running background worker.
#[derive(Debug)]
pub struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Stop the worker once the item it is processing (if any) completes.
    pub async fn stop(self) -> Result<()> {
        // The receiver lives in the worker task; a send error means it
        // already exited.
        let _ = self.shutdown.send(true);
        self.handle
            .await
            .map_err(|e| ScanwerkError::Pipeline(format!("worker join: {e}")))
    }
}
