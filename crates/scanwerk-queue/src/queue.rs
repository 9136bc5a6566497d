// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The scan queue: an ordered, id-indexed collection of queue items and the
// state machine that moves them through the pipeline.
//
// States per item: pending → processing → {completed | error}; error returns
// to pending only through `retry`. At most one item is processing at any
// time, and pending items are admitted oldest first.
//
// Long-running work is split into ticket / commit pairs so it can run off
// the queue (see `Orchestrator`). A commit is applied only if the ticket is
// still current: the item exists, and its attempt (for processing) or edit
// revision (for corner and mode edits) still matches. Anything else is a
// stale result and is dropped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::human_errors::humanize_error;
use scanwerk_core::{
    CornerSet, DocumentSink, EnhancementMode, FinishedDocument, ItemId, ItemStatus, Point,
    ScanConfig,
};
use scanwerk_vision::{RasterImage, normalize_corners};
use tracing::{debug, error, info, instrument, warn};

use crate::item::{ItemView, QueueItem};
use crate::pipeline::{EditOutput, Pipeline, PipelineInput, PipelineOutput, Stage};

/// Shown when a pipeline stage panics.
pub(crate) const INTERNAL_FAILURE: &str = "unexpected internal failure while processing this image";

/// Direction for stepping through completed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// A user edit to a completed item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edit {
    /// New corner positions in any order; they are normalized first.
    Corners([Point; 4]),
    Mode(EnhancementMode),
}

impl Edit {
    fn action(&self) -> &'static str {
        match self {
            Self::Corners(_) => "edit the corners of",
            Self::Mode(_) => "change the enhancement of",
        }
    }
}

/// Claim on the processing slot for one run of one item.
#[derive(Debug, Clone)]
pub struct ProcessingTicket {
    pub id: ItemId,
    pub attempt: u32,
    pub input: PipelineInput,
}

/// Everything needed to recompute an item after an edit.
#[derive(Debug, Clone)]
pub struct EditTicket {
    pub id: ItemId,
    pub revision: u64,
    pub source: Arc<RasterImage>,
    /// Normalized, bounds-checked corners to rectify with.
    pub corners: CornerSet,
    pub mode: EnhancementMode,
    /// Current rectified image when `corners` is unchanged.
    pub rectified: Option<Arc<RasterImage>>,
}

/// Ordered queue of scan items with a single processing slot.
#[derive(Debug)]
pub struct ScanQueue {
    items: Vec<QueueItem>,
    selected: Option<ItemId>,
    pipeline: Arc<Pipeline>,
    default_mode: EnhancementMode,
}

impl ScanQueue {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            items: Vec::new(),
            selected: None,
            pipeline: Arc::new(Pipeline::new(config)?),
            default_mode: config.default_mode,
        })
    }

    /// The shared stage sequence, for running work outside the queue.
    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline)
    }

    // -- Ingestion ------------------------------------------------------------

    /// Add an encoded image (JPEG, PNG, ...). Decoding happens during
    /// processing, so corrupt bytes surface as an `Error` item, not here.
    pub fn ingest(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> ItemId {
        let item = QueueItem::new(name.into(), Some(Arc::new(bytes)), None, self.default_mode);
        self.push(item)
    }

    /// Add an image that has already been decoded, e.g. a PDF page.
    pub fn ingest_decoded(&mut self, name: impl Into<String>, image: RasterImage) -> ItemId {
        let item = QueueItem::new(name.into(), None, Some(Arc::new(image)), self.default_mode);
        self.push(item)
    }

    fn push(&mut self, item: QueueItem) -> ItemId {
        let id = item.id;
        info!(item_id = %id, name = %item.name, "Item ingested");
        self.items.push(item);
        id
    }

    // -- Lookup ---------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item ids in insertion order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn view(&self, id: ItemId) -> Result<ItemView> {
        self.item(id).map(QueueItem::view)
    }

    /// Snapshots of every item, in insertion order.
    pub fn views(&self) -> Vec<ItemView> {
        self.items.iter().map(QueueItem::view).collect()
    }

    pub fn status(&self, id: ItemId) -> Result<ItemStatus> {
        self.item(id).map(|item| item.status)
    }

    /// The image to show for an item: enhanced, else rectified, else source.
    /// `None` for encoded items that have not been decoded yet.
    pub fn display_image(&self, id: ItemId) -> Result<Option<Arc<RasterImage>>> {
        self.item(id).map(|item| item.display_image().cloned())
    }

    pub fn processing_count(&self) -> usize {
        self.count(ItemStatus::Processing)
    }

    pub fn pending_count(&self) -> usize {
        self.count(ItemStatus::Pending)
    }

    /// True when nothing is waiting or running.
    pub fn is_idle(&self) -> bool {
        self.items
            .iter()
            .all(|item| matches!(item.status, ItemStatus::Completed | ItemStatus::Error))
    }

    fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    fn item(&self, id: ItemId) -> Result<&QueueItem> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .ok_or(ScanwerkError::ItemNotFound(id))
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut QueueItem> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(ScanwerkError::ItemNotFound(id))
    }

    // -- Processing -----------------------------------------------------------

    /// Move the oldest pending item into processing, unless an item is
    /// already processing.
    pub fn admit_next(&mut self) -> Option<ProcessingTicket> {
        if self.processing_count() > 0 {
            return None;
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.status == ItemStatus::Pending)?;

        item.status = ItemStatus::Processing;
        item.attempt += 1;
        item.progress = Stage::Admitted.percent();
        item.touch();
        info!(item_id = %item.id, attempt = item.attempt, "Item admitted for processing");

        Some(ProcessingTicket {
            id: item.id,
            attempt: item.attempt,
            input: PipelineInput {
                bytes: item.original.clone(),
                image: item.source.clone(),
                mode: item.mode,
            },
        })
    }

    /// Record that a processing run reached `stage`. Progress never moves
    /// backwards and stays below 100 until `complete`.
    pub fn report_progress(&mut self, id: ItemId, attempt: u32, stage: Stage) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        if item.status != ItemStatus::Processing || item.attempt != attempt {
            return false;
        }
        item.progress = item.progress.max(stage.percent().min(99));
        true
    }

    /// Commit a processing result. Returns `false` (and drops the result)
    /// when the ticket is no longer current.
    #[instrument(skip(self, ticket, outcome), fields(item_id = %ticket.id, attempt = ticket.attempt))]
    pub fn complete(&mut self, ticket: ProcessingTicket, outcome: Result<PipelineOutput>) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == ticket.id) else {
            warn!("Discarding result for a removed item");
            return false;
        };
        if item.status != ItemStatus::Processing || item.attempt != ticket.attempt {
            warn!(status = %item.status, current_attempt = item.attempt, "Discarding stale result");
            return false;
        }

        match outcome {
            Ok(output) => {
                item.source = Some(output.source);
                item.corners = Some(output.corners);
                item.confidence = output.confidence;
                item.rectified = Some(output.rectified);
                item.enhanced = Some(output.enhanced);
                item.error = None;
                item.failure = None;
                item.status = ItemStatus::Completed;
                item.progress = 100;
                info!(confidence = ?item.confidence, "Item completed");
                if self.selected.is_none() {
                    self.selected = Some(ticket.id);
                }
            }
            Err(err) => {
                error!(error = %err, "Item failed");
                item.error = Some(err.to_string());
                item.failure = Some(humanize_error(&err));
                item.status = ItemStatus::Error;
            }
        }
        item.touch();
        true
    }

    /// Admit the next pending item and run it to completion on this thread.
    /// Returns the id of the item processed, or `None` if nothing was
    /// admitted.
    ///
    /// A panic inside a stage turns the item into an error; it never
    /// escapes.
    pub fn process_next(&mut self) -> Option<ItemId> {
        let ticket = self.admit_next()?;
        let (id, attempt) = (ticket.id, ticket.attempt);
        let pipeline = Arc::clone(&self.pipeline);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pipeline.run(&ticket.input, |stage| {
                self.report_progress(id, attempt, stage);
            })
        }))
        .unwrap_or_else(|_| Err(ScanwerkError::Pipeline(INTERNAL_FAILURE.into())));

        self.complete(ticket, outcome);
        Some(id)
    }

    /// Process pending items until none remain. Returns the ids in the
    /// order they were processed.
    pub fn run_until_idle(&mut self) -> Vec<ItemId> {
        let mut processed = Vec::new();
        while let Some(id) = self.process_next() {
            processed.push(id);
        }
        processed
    }

    // -- Editing --------------------------------------------------------------

    /// Start an edit of a completed item. Corner edits are normalized and
    /// checked against the source bounds before a ticket is issued.
    ///
    /// The ticket supersedes every earlier uncommitted edit of the item and
    /// carries their combined effect: a mode change keeps corners requested
    /// by an earlier, still-running corner edit and vice versa.
    pub fn begin_edit(&mut self, id: ItemId, edit: Edit) -> Result<EditTicket> {
        let item = self.item_mut(id)?;
        if item.status != ItemStatus::Completed {
            return Err(ScanwerkError::InvalidState {
                id,
                status: item.status,
                action: edit.action(),
            });
        }
        let (Some(source), Some(committed)) = (item.source.clone(), item.corners) else {
            return Err(ScanwerkError::NotRectified(id));
        };

        let (base_corners, base_mode) = item.pending_edit.unwrap_or((committed, item.mode));
        let (corners, mode) = match edit {
            Edit::Corners(points) => {
                let corners = normalize_corners(points);
                corners.validate_within(source.width(), source.height())?;
                (corners, base_mode)
            }
            Edit::Mode(mode) => (base_corners, mode),
        };

        item.revision += 1;
        item.pending_edit = Some((corners, mode));
        let rectified = if corners == committed {
            item.rectified.clone()
        } else {
            None
        };
        debug!(
            item_id = %id,
            revision = item.revision,
            rerectify = rectified.is_none(),
            "Edit started"
        );

        Ok(EditTicket {
            id,
            revision: item.revision,
            source,
            corners,
            mode,
            rectified,
        })
    }

    /// Commit an edit result. `Ok(false)` means the result was stale and has
    /// been dropped. A failed edit leaves the previous corners and images in
    /// place and returns the error.
    pub fn commit_edit(&mut self, ticket: EditTicket, outcome: Result<EditOutput>) -> Result<bool> {
        let Some(item) = self.items.iter_mut().find(|item| item.id == ticket.id) else {
            warn!(item_id = %ticket.id, "Discarding edit for a removed item");
            return Ok(false);
        };
        if item.revision != ticket.revision || item.status != ItemStatus::Completed {
            debug!(
                item_id = %ticket.id,
                revision = ticket.revision,
                current = item.revision,
                "Discarding superseded edit"
            );
            return Ok(false);
        }

        item.pending_edit = None;
        match outcome {
            Ok(output) => {
                item.corners = Some(ticket.corners);
                item.mode = ticket.mode;
                item.rectified = Some(output.rectified);
                item.enhanced = Some(output.enhanced);
                item.touch();
                info!(item_id = %ticket.id, mode = %ticket.mode, "Edit applied");
                Ok(true)
            }
            Err(err) => {
                warn!(item_id = %ticket.id, error = %err, "Edit rejected; keeping previous result");
                Err(err)
            }
        }
    }

    fn apply_edit(&mut self, id: ItemId, edit: Edit) -> Result<()> {
        let ticket = self.begin_edit(id, edit)?;
        let pipeline = Arc::clone(&self.pipeline);
        let outcome = catch_unwind(AssertUnwindSafe(|| pipeline.reprocess(&ticket)))
            .unwrap_or_else(|_| Err(ScanwerkError::Pipeline(INTERNAL_FAILURE.into())));
        self.commit_edit(ticket, outcome).map(|_| ())
    }

    /// Move the corners of a completed item and re-rectify. Detection is not
    /// re-run; status and progress are unchanged.
    pub fn edit_corners(&mut self, id: ItemId, points: [Point; 4]) -> Result<()> {
        self.apply_edit(id, Edit::Corners(points))
    }

    /// Change an item's enhancement mode.
    ///
    /// Completed items are re-enhanced from their current rectified image.
    /// Pending and failed items simply record the mode for their next run.
    pub fn set_mode(&mut self, id: ItemId, mode: EnhancementMode) -> Result<()> {
        match self.status(id)? {
            ItemStatus::Completed => self.apply_edit(id, Edit::Mode(mode)),
            ItemStatus::Processing => Err(ScanwerkError::InvalidState {
                id,
                status: ItemStatus::Processing,
                action: Edit::Mode(mode).action(),
            }),
            ItemStatus::Pending | ItemStatus::Error => {
                let item = self.item_mut(id)?;
                item.mode = mode;
                item.touch();
                Ok(())
            }
        }
    }

    /// Re-run boundary detection on a completed item's source and, if a
    /// document is found, apply it as a corner edit. Returns whether new
    /// corners were applied.
    pub fn auto_detect(&mut self, id: ItemId) -> Result<bool> {
        let source = self.detect_source(id)?;
        let Some(detection) = self.pipeline.detect(&source) else {
            info!(item_id = %id, "Auto-detect found no document");
            return Ok(false);
        };
        self.edit_corners(id, *detection.corners.points())?;
        self.record_confidence(id, detection.confidence);
        Ok(true)
    }

    /// Source image of a completed item, for running detection.
    pub(crate) fn detect_source(&self, id: ItemId) -> Result<Arc<RasterImage>> {
        let item = self.item(id)?;
        if item.status != ItemStatus::Completed {
            return Err(ScanwerkError::InvalidState {
                id,
                status: item.status,
                action: "detect the document in",
            });
        }
        item.source.clone().ok_or(ScanwerkError::NotRectified(id))
    }

    pub(crate) fn record_confidence(&mut self, id: ItemId, confidence: f32) {
        if let Ok(item) = self.item_mut(id) {
            item.confidence = Some(confidence);
        }
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Remove an item and release its buffers. Safe while the item is
    /// processing: the late result is discarded on commit.
    pub fn remove(&mut self, id: ItemId) -> Result<()> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(ScanwerkError::ItemNotFound(id))?;
        let item = self.items.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        info!(item_id = %id, status = %item.status, "Item removed");
        Ok(())
    }

    /// Send a failed item back to pending.
    pub fn retry(&mut self, id: ItemId) -> Result<()> {
        let item = self.item_mut(id)?;
        if item.status != ItemStatus::Error {
            return Err(ScanwerkError::InvalidState {
                id,
                status: item.status,
                action: "retry",
            });
        }
        item.clear_results();
        item.status = ItemStatus::Pending;
        item.progress = 0;
        item.touch();
        info!(item_id = %id, "Item queued for retry");
        Ok(())
    }

    // -- Selection and navigation ---------------------------------------------

    pub fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    /// Select a completed item.
    pub fn select(&mut self, id: ItemId) -> Result<()> {
        let item = self.item(id)?;
        if item.status != ItemStatus::Completed {
            return Err(ScanwerkError::InvalidState {
                id,
                status: item.status,
                action: "select",
            });
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Completed item ids in insertion order.
    pub fn completed_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Completed)
            .map(|item| item.id)
            .collect()
    }

    /// Step the selection through completed items, stopping at either end.
    /// With nothing selected, `Next` picks the first and `Previous` the last.
    pub fn navigate(&mut self, direction: Direction) -> Option<ItemId> {
        let completed = self.completed_ids();
        let last = completed.len().checked_sub(1)?;
        let current = self
            .selected
            .and_then(|id| completed.iter().position(|c| *c == id));
        let index = match (current, direction) {
            (None, Direction::Next) => 0,
            (None, Direction::Previous) => last,
            (Some(i), Direction::Next) => (i + 1).min(last),
            (Some(i), Direction::Previous) => i.saturating_sub(1),
        };
        self.selected = Some(completed[index]);
        self.selected
    }

    /// `(n, m)`: the selection is the n-th (1-based) of m completed items.
    pub fn position(&self) -> Option<(usize, usize)> {
        let selected = self.selected?;
        let completed = self.completed_ids();
        let index = completed.iter().position(|id| *id == selected)?;
        Some((index + 1, completed.len()))
    }

    // -- Export ---------------------------------------------------------------

    /// Package a completed item for persistence.
    pub fn export(&self, id: ItemId) -> Result<FinishedDocument> {
        let item = self.item(id)?;
        if item.status != ItemStatus::Completed {
            return Err(ScanwerkError::InvalidState {
                id,
                status: item.status,
                action: "export",
            });
        }
        let (Some(enhanced), Some(corners)) = (&item.enhanced, item.corners) else {
            return Err(ScanwerkError::NotRectified(id));
        };
        let original = match (&item.original, &item.source) {
            (Some(bytes), _) => bytes.as_ref().clone(),
            (None, Some(source)) => source.to_png_bytes()?,
            (None, None) => return Err(ScanwerkError::NotRectified(id)),
        };

        Ok(FinishedDocument {
            name: item.name.clone(),
            processed_png: enhanced.to_png_bytes()?,
            original,
            corners,
            mode: item.mode,
            width: enhanced.width(),
            height: enhanced.height(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
    }

    /// Export a completed item, store it, and remove it from the queue.
    /// The item stays queued if storing fails.
    #[instrument(skip(self, sink))]
    pub fn hand_off(&mut self, id: ItemId, sink: &dyn DocumentSink) -> Result<String> {
        let document = self.export(id)?;
        let key = sink.store(&document)?;
        self.remove(id)?;
        info!(item_id = %id, key = %key, "Item handed off");
        Ok(key)
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use image::{DynamicImage, GrayImage, Luma};

    fn encode(img: GrayImage) -> Vec<u8> {
        RasterImage::from_dynamic(DynamicImage::ImageLuma8(img))
            .to_png_bytes()
            .expect("encode fixture")
    }

    /// 400x500 dark desk with a bright page from (50,60) to (350,440).
    fn page_png() -> Vec<u8> {
        let mut img = GrayImage::from_pixel(400, 500, Luma([30]));
        for y in 60..440 {
            for x in 50..350 {
                img.put_pixel(x, y, Luma([240]));
            }
        }
        encode(img)
    }

    fn blank_png(w: u32, h: u32) -> Vec<u8> {
        encode(GrayImage::from_pixel(w, h, Luma([200])))
    }

    fn queue() -> ScanQueue {
        ScanQueue::new(&ScanConfig::default()).expect("default config")
    }

    fn points(corners: [(f32, f32); 4]) -> [Point; 4] {
        corners.map(Point::from)
    }

    #[derive(Default)]
    struct MemorySink {
        stored: RefCell<Vec<FinishedDocument>>,
        fail: bool,
    }

    impl DocumentSink for MemorySink {
        fn store(&self, doc: &FinishedDocument) -> Result<String> {
            if self.fail {
                return Err(ScanwerkError::Database("disk full".into()));
            }
            self.stored.borrow_mut().push(doc.clone());
            Ok(format!("doc-{}", self.stored.borrow().len()))
        }
    }

    #[test]
    fn ingested_item_is_pending_with_zero_progress() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        let view = q.view(id).expect("view");
        assert_eq!(view.status, ItemStatus::Pending);
        assert_eq!(view.progress, 0);
        assert_eq!(view.mode, EnhancementMode::Enhanced);
        assert!(q.display_image(id).expect("item").is_none());
    }

    #[test]
    fn fifo_processing_with_failed_detection_first() {
        let mut q = queue();
        let first = q.ingest("blank.png", blank_png(300, 200));
        let second = q.ingest("page-a.png", page_png());
        let third = q.ingest("page-b.png", page_png());

        assert_eq!(q.run_until_idle(), vec![first, second, third]);

        let blank = q.view(first).expect("view");
        assert_eq!(blank.status, ItemStatus::Completed);
        assert_eq!(blank.progress, 100);
        assert_eq!(blank.corners, Some(CornerSet::inset(300, 200, 0.1)));
        assert!(blank.confidence.is_none());
        assert!(!blank.corners.expect("corners").is_degenerate());

        for id in [second, third] {
            let view = q.view(id).expect("view");
            assert_eq!(view.status, ItemStatus::Completed);
            assert!(view.confidence.is_some_and(|c| (0.0..=1.0).contains(&c)));
        }
    }

    #[test]
    fn only_one_item_processes_at_a_time() {
        let mut q = queue();
        let a = q.ingest("a.png", blank_png(50, 50));
        let b = q.ingest("b.png", blank_png(50, 50));

        let ticket = q.admit_next().expect("first admission");
        assert_eq!(ticket.id, a);
        assert!(q.admit_next().is_none());
        assert_eq!(q.processing_count(), 1);
        assert_eq!(q.status(b).expect("b"), ItemStatus::Pending);

        let output = q.pipeline().run(&ticket.input, |_| {});
        assert!(q.complete(ticket, output));
        assert_eq!(q.admit_next().map(|t| t.id), Some(b));
        assert_eq!(q.processing_count(), 1);
    }

    #[test]
    fn progress_is_monotonic_and_capped_while_processing() {
        let mut q = queue();
        let id = q.ingest("a.png", blank_png(60, 40));
        let ticket = q.admit_next().expect("admit");
        assert_eq!(q.view(id).expect("view").progress, 5);

        assert!(q.report_progress(id, ticket.attempt, Stage::Detected));
        assert!(q.report_progress(id, ticket.attempt, Stage::Decoded));
        assert_eq!(q.view(id).expect("view").progress, 50);

        q.report_progress(id, ticket.attempt, Stage::Rectified);
        assert!(q.view(id).expect("view").progress < 100);

        let output = q.pipeline().run(&ticket.input, |_| {});
        q.complete(ticket, output);
        assert_eq!(q.view(id).expect("view").progress, 100);
    }

    #[test]
    fn corner_drag_rerectifies_without_changing_status() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();
        let before = q.view(id).expect("view");

        // Drag the top-left corner inward; points given out of order.
        let dragged = points([(352.0, 442.0), (100.0, 100.0), (47.0, 442.0), (352.0, 57.0)]);
        q.edit_corners(id, dragged).expect("edit");

        let after = q.view(id).expect("view");
        assert_eq!(after.status, ItemStatus::Completed);
        assert_eq!(after.progress, 100);
        assert_eq!(after.confidence, before.confidence);
        let corners = after.corners.expect("corners");
        assert_eq!(corners.top_left(), Point::new(100.0, 100.0));
        assert_eq!(corners.bottom_right(), Point::new(352.0, 442.0));
        assert_ne!(after.display_size, before.display_size);
    }

    #[test]
    fn degenerate_edit_keeps_previous_result() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();
        let before = q.view(id).expect("view");
        let shown = q.display_image(id).expect("item").expect("image");

        let collinear = points([(10.0, 10.0), (20.0, 20.0), (30.0, 30.0), (40.0, 40.0)]);
        let result = q.edit_corners(id, collinear);
        assert!(matches!(result, Err(ScanwerkError::DegenerateGeometry(_))));

        assert_eq!(q.view(id).expect("view").corners, before.corners);
        let still_shown = q.display_image(id).expect("item").expect("image");
        assert!(Arc::ptr_eq(&shown, &still_shown));
    }

    #[test]
    fn out_of_bounds_edit_is_rejected() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();
        let result = q.edit_corners(id, points([(0.0, 0.0), (900.0, 0.0), (900.0, 400.0), (0.0, 400.0)]));
        assert!(matches!(result, Err(ScanwerkError::CornersOutOfBounds { .. })));
    }

    #[test]
    fn editing_an_unprocessed_item_is_rejected() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        let result = q.edit_corners(id, points([(0.0, 0.0), (9.0, 0.0), (9.0, 9.0), (0.0, 9.0)]));
        assert!(matches!(
            result,
            Err(ScanwerkError::InvalidState {
                status: ItemStatus::Pending,
                ..
            })
        ));
    }

    #[test]
    fn mode_change_reenhances_the_current_rectified_image() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();
        let ticket = q.begin_edit(id, Edit::Mode(EnhancementMode::Bw)).expect("begin");
        assert!(ticket.rectified.is_some(), "mode change must not re-rectify");
        let output = q.pipeline().reprocess(&ticket);
        assert_eq!(q.commit_edit(ticket, output).ok(), Some(true));

        let view = q.view(id).expect("view");
        assert_eq!(view.mode, EnhancementMode::Bw);
        let shown = q.display_image(id).expect("item").expect("image");
        assert!(shown.is_grayscale());
    }

    #[test]
    fn mode_set_before_processing_is_used() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.set_mode(id, EnhancementMode::Grayscale).expect("set mode");
        q.run_until_idle();
        assert_eq!(q.view(id).expect("view").mode, EnhancementMode::Grayscale);
    }

    #[test]
    fn newer_edit_wins_regardless_of_finish_order() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();

        let first = q
            .begin_edit(id, Edit::Corners(points([(60.0, 70.0), (340.0, 70.0), (340.0, 430.0), (60.0, 430.0)])))
            .expect("first");
        let second = q
            .begin_edit(id, Edit::Corners(points([(80.0, 90.0), (320.0, 90.0), (320.0, 410.0), (80.0, 410.0)])))
            .expect("second");

        let pipeline = q.pipeline();
        let second_out = pipeline.reprocess(&second);
        let first_out = pipeline.reprocess(&first);
        let second_corners = second.corners;

        assert_eq!(q.commit_edit(second, second_out).ok(), Some(true));
        assert_eq!(q.commit_edit(first, first_out).ok(), Some(false));
        assert_eq!(q.view(id).expect("view").corners, Some(second_corners));
    }

    #[test]
    fn mode_edit_carries_an_in_flight_corner_edit() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();

        let corners = q
            .begin_edit(id, Edit::Corners(points([(80.0, 90.0), (320.0, 90.0), (320.0, 410.0), (80.0, 410.0)])))
            .expect("corners");
        let mode = q.begin_edit(id, Edit::Mode(EnhancementMode::Grayscale)).expect("mode");
        assert_eq!(mode.corners, corners.corners);
        assert!(mode.rectified.is_none());

        let pipeline = q.pipeline();
        let corners_out = pipeline.reprocess(&corners);
        let mode_out = pipeline.reprocess(&mode);
        assert_eq!(q.commit_edit(corners, corners_out).ok(), Some(false));
        assert_eq!(q.commit_edit(mode, mode_out).ok(), Some(true));

        let view = q.view(id).expect("view");
        assert_eq!(view.mode, EnhancementMode::Grayscale);
        assert_eq!(view.display_size, Some((240, 320)));
    }

    #[test]
    fn corrupt_image_errors_then_retries() {
        let mut q = queue();
        let id = q.ingest("broken.jpg", b"\xff\xd8\xff not a jpeg".to_vec());
        q.run_until_idle();

        let failed = q.view(id).expect("view");
        assert_eq!(failed.status, ItemStatus::Error);
        assert!(failed.error.as_deref().is_some_and(|e| e.contains("decode")));
        assert!(failed.failure.as_ref().is_some_and(|human| human.retriable));
        assert!(q.edit_corners(id, points([(0.0, 0.0), (9.0, 0.0), (9.0, 9.0), (0.0, 9.0)])).is_err());

        q.retry(id).expect("retry");
        let retried = q.view(id).expect("view");
        assert_eq!(retried.status, ItemStatus::Pending);
        assert_eq!(retried.progress, 0);
        assert!(retried.error.is_none());
        assert!(retried.failure.is_none());

        assert_eq!(q.process_next(), Some(id));
        assert_eq!(q.status(id).expect("status"), ItemStatus::Error);
    }

    #[test]
    fn retry_requires_error_status() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        assert!(matches!(q.retry(id), Err(ScanwerkError::InvalidState { .. })));
    }

    #[test]
    fn zero_sized_image_fails_without_panicking() {
        let mut q = queue();
        let id = q.ingest_decoded(
            "empty",
            RasterImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(0, 0))),
        );
        q.run_until_idle();
        assert_eq!(q.status(id).expect("status"), ItemStatus::Error);
    }

    #[test]
    fn removing_a_processing_item_discards_its_result() {
        let mut q = queue();
        let a = q.ingest("a.png", blank_png(40, 40));
        let b = q.ingest("b.png", blank_png(40, 40));

        let ticket = q.admit_next().expect("admit");
        let output = q.pipeline().run(&ticket.input, |_| {});
        q.remove(a).expect("remove");
        assert!(!q.complete(ticket, output));

        assert_eq!(q.run_until_idle(), vec![b]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn stale_attempt_is_discarded() {
        let mut q = queue();
        let id = q.ingest("broken", b"junk".to_vec());
        let ticket = q.admit_next().expect("admit");
        let stale = ticket.clone();
        let outcome = q.pipeline().run(&ticket.input, |_| {});
        q.complete(ticket, outcome);
        q.retry(id).expect("retry");
        q.admit_next().expect("readmit");

        assert!(!q.complete(stale, Err(ScanwerkError::Pipeline("late".into()))));
        assert_eq!(q.status(id).expect("status"), ItemStatus::Processing);
    }

    #[test]
    fn first_completed_item_is_selected_and_removal_clears_it() {
        let mut q = queue();
        let a = q.ingest("a.png", blank_png(40, 40));
        let b = q.ingest("b.png", blank_png(40, 40));
        q.run_until_idle();
        assert_eq!(q.selected(), Some(a));
        assert_eq!(q.position(), Some((1, 2)));

        q.remove(a).expect("remove");
        assert_eq!(q.selected(), None);
        assert_eq!(q.navigate(Direction::Next), Some(b));
    }

    #[test]
    fn counts_and_idle_state_track_the_batch() {
        let mut q = queue();
        assert!(q.is_idle());
        let a = q.ingest("a.png", blank_png(40, 40));
        let b = q.ingest("broken", b"junk".to_vec());
        assert_eq!(q.ids(), vec![a, b]);
        assert_eq!(q.pending_count(), 2);
        assert!(!q.is_idle());

        let ticket = q.admit_next().expect("admit");
        assert_eq!((q.pending_count(), q.processing_count()), (1, 1));
        let outcome = q.pipeline().run(&ticket.input, |_| {});
        q.complete(ticket, outcome);
        q.run_until_idle();

        assert!(q.is_idle());
        assert_eq!(q.pending_count(), 0);
        assert_eq!(q.selected(), Some(a));
        q.clear_selection();
        assert_eq!(q.selected(), None);
        assert_eq!(q.position(), None);
    }

    #[test]
    fn navigation_skips_unfinished_items_and_stops_at_ends() {
        let mut q = queue();
        let a = q.ingest("a.png", blank_png(40, 40));
        let broken = q.ingest("broken", b"junk".to_vec());
        let c = q.ingest("c.png", blank_png(40, 40));
        q.run_until_idle();
        let pending = q.ingest("d.png", blank_png(40, 40));

        assert_eq!(q.completed_ids(), vec![a, c]);
        assert_eq!(q.navigate(Direction::Next), Some(c));
        assert_eq!(q.navigate(Direction::Next), Some(c));
        assert_eq!(q.position(), Some((2, 2)));
        assert_eq!(q.navigate(Direction::Previous), Some(a));
        assert_eq!(q.navigate(Direction::Previous), Some(a));

        assert!(q.select(broken).is_err());
        assert!(q.select(pending).is_err());
    }

    #[test]
    fn navigation_with_no_completed_items_is_none() {
        let mut q = queue();
        q.ingest("a.png", blank_png(40, 40));
        assert_eq!(q.navigate(Direction::Next), None);
        assert_eq!(q.position(), None);
    }

    #[test]
    fn auto_detect_restores_detected_corners() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();
        let detected = q.view(id).expect("view").corners.expect("corners");

        q.edit_corners(id, points([(10.0, 10.0), (390.0, 10.0), (390.0, 490.0), (10.0, 490.0)]))
            .expect("edit");
        assert!(q.auto_detect(id).expect("auto-detect"));
        assert_eq!(q.view(id).expect("view").corners, Some(detected));

        let blank = q.ingest("blank.png", blank_png(100, 100));
        q.run_until_idle();
        assert!(!q.auto_detect(blank).expect("auto-detect"));
    }

    #[test]
    fn hand_off_stores_and_removes() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();
        let sink = MemorySink::default();

        let key = q.hand_off(id, &sink).expect("hand off");
        assert_eq!(key, "doc-1");
        assert!(q.is_empty());

        let stored = sink.stored.borrow();
        let doc = &stored[0];
        assert_eq!(doc.name, "page.png");
        assert_eq!(doc.original, page_png());
        let processed = RasterImage::decode(&doc.processed_png).expect("decode processed");
        assert_eq!(processed.dimensions(), (doc.width, doc.height));
    }

    #[test]
    fn failed_hand_off_keeps_the_item() {
        let mut q = queue();
        let id = q.ingest("page.png", page_png());
        q.run_until_idle();
        let sink = MemorySink {
            fail: true,
            ..MemorySink::default()
        };
        assert!(q.hand_off(id, &sink).is_err());
        assert_eq!(q.status(id).expect("status"), ItemStatus::Completed);
    }

    #[test]
    fn export_of_decoded_item_encodes_the_source() {
        let mut q = queue();
        let id = q.ingest_decoded(
            "page 1",
            RasterImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(80, 60, Luma([90])))),
        );
        assert!(q.export(id).is_err());
        q.run_until_idle();

        let doc = q.export(id).expect("export");
        let original = RasterImage::decode(&doc.original).expect("decode original");
        assert_eq!(original.dimensions(), (80, 60));
    }
}
