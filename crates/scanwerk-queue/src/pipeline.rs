// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-item processing pipeline: decode → detect (or fall back) → rectify →
// enhance, plus the shorter re-run used after a corner or mode edit.
//
// The pipeline holds no per-item state. Everything it needs arrives in a
// `PipelineInput` or `EditTicket`, and everything it produces is returned to
// the queue, which decides whether the result is still wanted.

use std::sync::Arc;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{CornerSet, EnhancementMode, ScanConfig};
use scanwerk_vision::{BoundaryDetector, RasterImage, ScanEnhancer, rectify};
use tracing::{debug, info, instrument, warn};

use crate::queue::EditTicket;

/// Milestones reported while an item is processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Admitted,
    Decoded,
    Detected,
    Rectified,
}

impl Stage {
    /// Progress percentage reached at this stage (always below 100).
    pub fn percent(self) -> u8 {
        match self {
            Self::Admitted => 5,
            Self::Decoded => 25,
            Self::Detected => 50,
            Self::Rectified => 75,
        }
    }
}

/// What a processing run needs: the item's image data and its mode.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Encoded bytes, decoded on the worker.
    pub bytes: Option<Arc<Vec<u8>>>,
    /// Already-decoded image; takes precedence over `bytes`.
    pub image: Option<Arc<RasterImage>>,
    pub mode: EnhancementMode,
}

/// Everything a successful processing run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub source: Arc<RasterImage>,
    pub corners: CornerSet,
    /// `None` when detection failed and the fallback inset was used.
    pub confidence: Option<f32>,
    pub rectified: Arc<RasterImage>,
    pub enhanced: Arc<RasterImage>,
}

/// Result of re-running rectification and/or enhancement after an edit.
#[derive(Debug, Clone)]
pub struct EditOutput {
    pub rectified: Arc<RasterImage>,
    pub enhanced: Arc<RasterImage>,
}

/// The stateless stage sequence shared by every item.
#[derive(Debug, Clone)]
pub struct Pipeline {
    detector: BoundaryDetector,
    enhancer: ScanEnhancer,
    fallback_inset: f32,
}

impl Pipeline {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            detector: BoundaryDetector::new(config.detector.clone())?,
            enhancer: ScanEnhancer::new(config.enhance.clone()),
            fallback_inset: config.fallback_inset,
        })
    }

    /// Run the full pipeline for one item, calling `on_stage` after each
    /// milestone.
    #[instrument(skip_all, fields(mode = %input.mode))]
    pub fn run(&self, input: &PipelineInput, mut on_stage: impl FnMut(Stage)) -> Result<PipelineOutput> {
        let source = match (&input.image, &input.bytes) {
            (Some(image), _) => Arc::clone(image),
            (None, Some(bytes)) => Arc::new(RasterImage::decode(bytes)?),
            (None, None) => {
                return Err(ScanwerkError::Pipeline("item has no image data".into()));
            }
        };
        on_stage(Stage::Decoded);

        let (width, height) = source.dimensions();
        let (corners, confidence) = match self.detector.detect(&source) {
            Some(detection) => (detection.corners, Some(detection.confidence)),
            None => {
                warn!(width, height, "No document found; using inset fallback corners");
                (CornerSet::inset(width, height, self.fallback_inset), None)
            }
        };
        on_stage(Stage::Detected);

        let rectified = rectify(&source, &corners).map_err(|err| {
            ScanwerkError::Pipeline(format!("could not rectify {width}x{height} image: {err}"))
        })?;
        on_stage(Stage::Rectified);

        let enhanced = self.enhancer.apply(&rectified, input.mode);
        info!(
            width = enhanced.width(),
            height = enhanced.height(),
            "Pipeline finished"
        );

        Ok(PipelineOutput {
            source,
            corners,
            confidence,
            rectified: Arc::new(rectified),
            enhanced: Arc::new(enhanced),
        })
    }

    /// Recompute the outputs an edit asks for. Rectification is skipped when
    /// the ticket carries a still-valid rectified image.
    #[instrument(skip_all, fields(item_id = %ticket.id, revision = ticket.revision))]
    pub fn reprocess(&self, ticket: &EditTicket) -> Result<EditOutput> {
        let rectified = match &ticket.rectified {
            Some(current) => Arc::clone(current),
            None => {
                debug!(corners = ?ticket.corners.to_tuples(), "Re-rectifying");
                Arc::new(rectify(&ticket.source, &ticket.corners)?)
            }
        };
        let enhanced = Arc::new(self.enhancer.apply(&rectified, ticket.mode));
        Ok(EditOutput {
            rectified,
            enhanced,
        })
    }

    /// Run the boundary detector on its own.
    pub fn detect(&self, source: &RasterImage) -> Option<scanwerk_vision::Detection> {
        self.detector.detect(source)
    }
}
