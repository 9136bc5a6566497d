// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-vision: image stages of the Scanwerk document scanner.
//
// Provides the raster image wrapper, document boundary detection, corner
// normalization, perspective rectification, and the enhancement filters
// (CLAHE, grayscale, adaptive black-and-white).

pub mod image;
pub mod scan;

// Re-export the primary types so callers can use `scanwerk_vision::BoundaryDetector` etc.
pub use self::image::raster::RasterImage;
pub use scan::corners::{normalize_corners, normalize_tuples};
pub use scan::detect::{BoundaryDetector, Detection};
pub use scan::enhance::ScanEnhancer;
pub use scan::rectify::{homography, rectify, target_dimensions};
