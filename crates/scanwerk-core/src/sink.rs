// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hand-off seam to the persistence collaborator.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{CornerSet, EnhancementMode};

/// Everything the persistence layer receives for one finished scan.
#[derive(Debug, Clone)]
pub struct FinishedDocument {
    /// Display name, usually the ingested file name.
    pub name: String,
    /// Rectified and enhanced image, PNG-encoded.
    pub processed_png: Vec<u8>,
    /// The original bytes as ingested.
    pub original: Vec<u8>,
    /// Final corners in source-image coordinates.
    pub corners: CornerSet,
    /// Enhancement applied to `processed_png`.
    pub mode: EnhancementMode,
    /// Processed image width in pixels.
    pub width: u32,
    /// Processed image height in pixels.
    pub height: u32,
    /// When the item was ingested.
    pub created_at: DateTime<Utc>,
    /// When the item was last edited.
    pub updated_at: DateTime<Utc>,
}

/// Accepts finished documents for storage.
///
/// Implementations decide where and how documents are kept; the scanner only
/// needs an identifier back to report to the user.
pub trait DocumentSink {
    /// Persist `doc`, returning the identifier it was stored under.
    fn store(&self, doc: &FinishedDocument) -> Result<String>;
}
