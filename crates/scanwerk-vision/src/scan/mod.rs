// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: boundary detection, corner ordering, perspective
// rectification, and enhancement.

pub mod clahe;
pub mod corners;
pub mod detect;
pub mod enhance;
mod kernel;
pub mod rectify;

pub use corners::normalize_corners;
pub use detect::{BoundaryDetector, Detection};
pub use enhance::ScanEnhancer;
