// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

use crate::types::{ItemId, ItemStatus};

/// Top-level error type for all Scanwerk operations.
///
/// "Document not found" from the boundary detector is deliberately absent:
/// it is an expected outcome, reported as `None`.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Image errors --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("corner ({x}, {y}) lies outside the {width}x{height} image")]
    CornersOutOfBounds {
        x: f32,
        y: f32,
        width: u32,
        height: u32,
    },

    #[error("processing failed: {0}")]
    Pipeline(String),

    // -- Queue errors --
    #[error("no queue item with id {0}")]
    ItemNotFound(ItemId),

    #[error("cannot {action} item {id} while it is {status}")]
    InvalidState {
        id: ItemId,
        status: ItemStatus,
        action: &'static str,
    },

    #[error("item {0} has no rectified image yet")]
    NotRectified(ItemId),

    // -- Configuration --
    #[error("unknown enhancement mode: {0}")]
    UnknownMode(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;
