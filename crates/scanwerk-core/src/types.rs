// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk document scanner.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScanwerkError};

/// Twice the triangle area (in px²) below which three corners count as collinear.
const COLLINEAR_EPSILON: f32 = 1e-3;

/// Unique identifier for a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Ingested, waiting for the processing slot.
    Pending,
    /// Currently running through the pipeline.
    Processing,
    /// Pipeline finished; corners and enhancement may still be edited.
    Completed,
    /// Decoding or processing failed; see the item's error message.
    Error,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Post-processing filter applied to a rectified scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementMode {
    /// Pass-through copy.
    Original,
    /// Contrast-limited adaptive equalization of the luminance channel.
    #[default]
    Enhanced,
    /// Single-channel luminance.
    Grayscale,
    /// Adaptive-threshold binarization.
    Bw,
}

impl EnhancementMode {
    /// Every mode, in presentation order.
    pub const ALL: [EnhancementMode; 4] = [
        Self::Original,
        Self::Enhanced,
        Self::Grayscale,
        Self::Bw,
    ];

    /// Lowercase keyword used in configuration files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Enhanced => "enhanced",
            Self::Grayscale => "grayscale",
            Self::Bw => "bw",
        }
    }
}

impl std::fmt::Display for EnhancementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for EnhancementMode {
    type Err = ScanwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "enhanced" => Ok(Self::Enhanced),
            "grayscale" | "gray" | "grey" => Ok(Self::Grayscale),
            "bw" | "black-white" => Ok(Self::Bw),
            _ => Err(ScanwerkError::UnknownMode(s.to_owned())),
        }
    }
}

/// A position in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Straight-line distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// The four corners of a document quadrilateral.
///
/// Stored in canonical order: top-left, top-right, bottom-right, bottom-left.
/// Construction does not reorder; use the vision crate's normalizer when the
/// input order is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    points: [Point; 4],
}

impl CornerSet {
    /// Wrap four points that are already in TL, TR, BR, BL order.
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Build from `(x, y)` tuples in TL, TR, BR, BL order.
    pub fn from_tuples(points: [(f32, f32); 4]) -> Self {
        Self {
            points: points.map(Point::from),
        }
    }

    /// Axis-aligned rectangle inset by `ratio` of the image size on every side,
    /// e.g. 0.1 gives corners at 10%/90% of width and height.
    ///
    /// Coordinates are rounded to whole pixels and clamped into
    /// `[0, width) × [0, height)`.
    pub fn inset(width: u32, height: u32, ratio: f32) -> Self {
        let max_x = width.saturating_sub(1) as f32;
        let max_y = height.saturating_sub(1) as f32;
        let near = ratio.clamp(0.0, 0.5);
        let far = 1.0 - near;
        let x0 = (width as f32 * near).round().clamp(0.0, max_x);
        let x1 = (width as f32 * far).round().clamp(0.0, max_x);
        let y0 = (height as f32 * near).round().clamp(0.0, max_y);
        let y1 = (height as f32 * far).round().clamp(0.0, max_y);
        Self::from_tuples([(x0, y0), (x1, y0), (x1, y1), (x0, y1)])
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    pub fn top_left(&self) -> Point {
        self.points[0]
    }

    pub fn top_right(&self) -> Point {
        self.points[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.points[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.points[3]
    }

    /// Corners as `(x, y)` tuples in canonical order.
    pub fn to_tuples(&self) -> [(f32, f32); 4] {
        self.points.map(Into::into)
    }

    /// Quadrilateral area via the shoelace formula.
    pub fn area(&self) -> f32 {
        let mut twice = 0.0f32;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            twice += a.x * b.y - b.x * a.y;
        }
        twice.abs() / 2.0
    }

    /// True when any coordinate is non-finite, the area is zero, or any three
    /// corners are collinear.
    pub fn is_degenerate(&self) -> bool {
        if !self.points.iter().all(Point::is_finite) {
            return true;
        }
        if self.area() <= COLLINEAR_EPSILON {
            return true;
        }
        const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
        TRIPLES.iter().any(|&[i, j, k]| {
            let (a, b, c) = (self.points[i], self.points[j], self.points[k]);
            let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
            cross.abs() <= COLLINEAR_EPSILON
        })
    }

    /// Reject corner sets that fall outside a `width × height` image or that
    /// describe a degenerate quadrilateral.
    pub fn validate_within(&self, width: u32, height: u32) -> Result<()> {
        for p in &self.points {
            let inside = p.x >= 0.0 && p.y >= 0.0 && p.x < width as f32 && p.y < height as f32;
            if !inside {
                return Err(ScanwerkError::CornersOutOfBounds {
                    x: p.x,
                    y: p.y,
                    width,
                    height,
                });
            }
        }
        if self.is_degenerate() {
            return Err(ScanwerkError::DegenerateGeometry(format!(
                "corners {:?} do not span a quadrilateral",
                self.to_tuples()
            )));
        }
        Ok(())
    }
}
