// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Queue items (one per ingested image) and the read-only snapshots handed
// to the presentation layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scanwerk_core::human_errors::HumanError;
use scanwerk_core::{CornerSet, EnhancementMode, ItemId, ItemStatus};
use scanwerk_vision::RasterImage;

/// A single image moving through the scanner.
///
/// Buffers are reference-counted only so an item can lend them to its own
/// in-flight work; they are never shared between items.
#[derive(Debug)]
pub(crate) struct QueueItem {
    pub(crate) id: ItemId,
    pub(crate) name: String,
    pub(crate) status: ItemStatus,
    /// 0-100; only ever increases while processing.
    pub(crate) progress: u8,
    /// Encoded bytes as ingested, if the item arrived encoded.
    pub(crate) original: Option<Arc<Vec<u8>>>,
    /// Decoded source; set at ingest for pre-decoded images, else on completion.
    pub(crate) source: Option<Arc<RasterImage>>,
    pub(crate) corners: Option<CornerSet>,
    pub(crate) confidence: Option<f32>,
    pub(crate) rectified: Option<Arc<RasterImage>>,
    pub(crate) enhanced: Option<Arc<RasterImage>>,
    pub(crate) mode: EnhancementMode,
    pub(crate) error: Option<String>,
    pub(crate) failure: Option<HumanError>,
    /// Bumped on every admission; stale pipeline results carry an old value.
    pub(crate) attempt: u32,
    /// Bumped on every edit request; only the newest edit may commit.
    pub(crate) revision: u64,
    /// Corners and mode of the newest uncommitted edit.
    pub(crate) pending_edit: Option<(CornerSet, EnhancementMode)>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl QueueItem {
    pub(crate) fn new(
        name: String,
        original: Option<Arc<Vec<u8>>>,
        source: Option<Arc<RasterImage>>,
        mode: EnhancementMode,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            name,
            status: ItemStatus::Pending,
            progress: 0,
            original,
            source,
            corners: None,
            confidence: None,
            rectified: None,
            enhanced: None,
            mode,
            error: None,
            failure: None,
            attempt: 0,
            revision: 0,
            pending_edit: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Enhanced, then rectified, then the source.
    pub(crate) fn display_image(&self) -> Option<&Arc<RasterImage>> {
        self.enhanced
            .as_ref()
            .or(self.rectified.as_ref())
            .or(self.source.as_ref())
    }

    /// Drop everything derived from a previous run.
    pub(crate) fn clear_results(&mut self) {
        self.corners = None;
        self.confidence = None;
        self.rectified = None;
        self.enhanced = None;
        self.pending_edit = None;
        self.error = None;
        self.failure = None;
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub(crate) fn view(&self) -> ItemView {
        ItemView {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            progress: self.progress,
            corners: self.corners,
            mode: self.mode,
            error: self.error.clone(),
            failure: self.failure.clone(),
            confidence: self.confidence,
            display_size: self.display_image().map(|img| img.dimensions()),
            source_size: self.source.as_ref().map(|img| img.dimensions()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Point-in-time copy of an item's state for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub id: ItemId,
    pub name: String,
    pub status: ItemStatus,
    pub progress: u8,
    /// Current corners in source coordinates, once processed.
    pub corners: Option<CornerSet>,
    pub mode: EnhancementMode,
    /// Failure description when `status` is `Error`.
    pub error: Option<String>,
    /// Plain-language form of `error`; `retriable` drives the retry action.
    pub failure: Option<HumanError>,
    /// Detector confidence; `None` when fallback corners were used.
    pub confidence: Option<f32>,
    /// Size of the image `display_image` would return.
    pub display_size: Option<(u32, u32)>,
    /// Size of the decoded source, for corner editing.
    pub source_size: Option<(u32, u32)>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
