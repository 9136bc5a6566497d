// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection: find the largest convex-ish quadrilateral
// outline in a photo.
//
// ## Pipeline
//
// 1. Convert to grayscale
// 2. Gaussian blur with a 5x5 kernel (sigma 1.1)
// 3. Canny edge detection (75 / 200)
// 4. Dilate with a 5x5 square to close gaps in the outline
// 5. Trace external contours
// 6. Drop contours below 10% of the image area
// 7. Approximate each survivor with a polygon (tolerance 2% of perimeter)
// 8. Keep the largest-area candidate that approximates to exactly 4 vertices

use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::dilate;
use imageproc::point::Point as PixelPoint;
use scanwerk_core::error::Result;
use scanwerk_core::{CornerSet, DetectorConfig, Point};
use tracing::{debug, info, instrument};

use crate::image::raster::RasterImage;
use crate::scan::corners::normalize_corners;
use crate::scan::kernel::gaussian_kernel;

/// A detected document outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Corners in canonical order, in source-image pixel coordinates.
    pub corners: CornerSet,
    /// `min(1, 2 × contour_area / image_area)`.
    pub confidence: f32,
}

/// Finds the document quadrilateral in a photo.
///
/// Stateless apart from its tuning; safe to share between threads.
#[derive(Debug, Clone)]
pub struct BoundaryDetector {
    config: DetectorConfig,
    /// 1D pre-blur weights, applied along both axes.
    blur_kernel: Vec<f32>,
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self::with_valid_config(DetectorConfig::default())
    }
}

impl BoundaryDetector {
    /// Build a detector, rejecting tuning that the edge and blur stages
    /// cannot run with.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: DetectorConfig) -> Self {
        let blur_kernel = gaussian_kernel(config.blur_kernel_size, config.blur_sigma);
        Self {
            config,
            blur_kernel,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Locate the document outline, or `None` when no suitable
    /// quadrilateral exists. Never fails.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &RasterImage) -> Option<Detection> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let gray = image.to_luma8();
        let blurred = separable_filter_equal(&gray, &self.blur_kernel);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        let closed = dilate(&edges, Norm::LInf, self.config.dilate_radius);

        let contours = find_contours::<i32>(&closed);
        let image_area = width as f64 * height as f64;
        let min_area = image_area * self.config.min_area_ratio;
        debug!(contours = contours.len(), min_area, "Contours traced");

        let mut best: Option<(f64, [PixelPoint<i32>; 4])> = None;
        for contour in contours.iter().filter(|c| is_external(c)) {
            if contour.points.len() < 4 {
                continue;
            }
            let area = polygon_area(&contour.points);
            if area < min_area {
                continue;
            }
            let perimeter = arc_length(&contour.points, true);
            if perimeter <= 0.0 {
                continue;
            }
            let approx = approximate_polygon_dp(
                &contour.points,
                self.config.approx_epsilon_ratio * perimeter,
                true,
            );
            let Some(quad) = as_quadrilateral(approx) else {
                continue;
            };
            if best.is_none_or(|(best_area, _)| area > best_area) {
                best = Some((area, quad));
            }
        }

        let Some((area, quad)) = best else {
            info!("No document outline found");
            return None;
        };

        let corners = normalize_corners(quad.map(|p| Point::new(p.x as f32, p.y as f32)));
        let confidence = (2.0 * area / image_area).min(1.0) as f32;
        info!(
            confidence,
            corners = ?corners.to_tuples(),
            "Document outline detected"
        );
        Some(Detection {
            corners,
            confidence,
        })
    }
}

// -- Contour helpers ----------------------------------------------------------

/// Outer borders that are not nested inside another border.
fn is_external(contour: &Contour<i32>) -> bool {
    contour.border_type == BorderType::Outer && contour.parent.is_none()
}

/// Exactly four distinct vertices, or `None`.
fn as_quadrilateral(mut polygon: Vec<PixelPoint<i32>>) -> Option<[PixelPoint<i32>; 4]> {
    polygon.dedup();
    if polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    <[PixelPoint<i32>; 4]>::try_from(polygon).ok()
}

/// Area enclosed by a closed pixel polygon (shoelace formula).
fn polygon_area(points: &[PixelPoint<i32>]) -> f64 {
    let n = points.len();
    let mut twice = 0.0f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    twice.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use imageproc::drawing::draw_polygon_mut;

    fn page_on_desk(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> RasterImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([30u8]));
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([240u8]));
            }
        }
        RasterImage::from_dynamic(DynamicImage::ImageLuma8(img))
    }

    fn assert_near(actual: Point, expected: (f32, f32), tolerance: f32) {
        let d = actual.distance(&Point::from(expected));
        assert!(
            d <= tolerance,
            "corner {actual:?} is {d:.1}px from expected {expected:?}"
        );
    }

    #[test]
    fn pre_blur_is_five_wide() {
        let detector = BoundaryDetector::default();
        assert_eq!(detector.blur_kernel.len(), 5);
        assert!((detector.blur_kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn unusable_tuning_is_rejected_up_front() {
        let zero_sigma = DetectorConfig {
            blur_sigma: 0.0,
            ..DetectorConfig::default()
        };
        assert!(BoundaryDetector::new(zero_sigma).is_err());

        let inverted = DetectorConfig {
            canny_low: 250.0,
            canny_high: 100.0,
            ..DetectorConfig::default()
        };
        assert!(BoundaryDetector::new(inverted).is_err());

        let detector = BoundaryDetector::new(DetectorConfig::default()).expect("defaults are valid");
        assert!(detector.detect(&page_on_desk(400, 500, 50, 60, 350, 440)).is_some());
    }

    #[test]
    fn blank_image_has_no_document() {
        let img = RasterImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            200,
            300,
            Luma([200u8]),
        )));
        assert!(BoundaryDetector::default().detect(&img).is_none());
    }

    #[test]
    fn bright_rectangle_is_found() {
        let img = page_on_desk(400, 500, 50, 60, 350, 440);
        let detection = BoundaryDetector::default()
            .detect(&img)
            .expect("rectangle should be detected");

        let c = detection.corners;
        assert_near(c.top_left(), (50.0, 60.0), 8.0);
        assert_near(c.top_right(), (350.0, 60.0), 8.0);
        assert_near(c.bottom_right(), (350.0, 440.0), 8.0);
        assert_near(c.bottom_left(), (50.0, 440.0), 8.0);
        assert_eq!(detection.confidence, 1.0);
        assert!(c.validate_within(400, 500).is_ok());
    }

    #[test]
    fn confidence_scales_with_area() {
        // Page covers roughly a quarter of the frame.
        let img = page_on_desk(400, 400, 100, 100, 300, 300);
        let detection = BoundaryDetector::default()
            .detect(&img)
            .expect("rectangle should be detected");
        assert!(
            (0.4..0.7).contains(&detection.confidence),
            "confidence {} outside expected band",
            detection.confidence
        );
    }

    #[test]
    fn small_rectangle_is_ignored() {
        let img = page_on_desk(400, 400, 180, 180, 220, 220);
        assert!(BoundaryDetector::default().detect(&img).is_none());
    }

    #[test]
    fn tilted_page_on_colour_photo_is_found() {
        let mut img = RgbImage::from_pixel(400, 480, Rgb([40, 60, 50]));
        let outline = [
            PixelPoint::new(80, 60),
            PixelPoint::new(330, 90),
            PixelPoint::new(300, 420),
            PixelPoint::new(60, 380),
        ];
        draw_polygon_mut(&mut img, &outline, Rgb([235, 235, 225]));
        let raster = RasterImage::from_dynamic(DynamicImage::ImageRgb8(img));

        let detection = BoundaryDetector::default()
            .detect(&raster)
            .expect("tilted page should be detected");
        let c = detection.corners;
        assert_near(c.top_left(), (80.0, 60.0), 12.0);
        assert_near(c.top_right(), (330.0, 90.0), 12.0);
        assert_near(c.bottom_right(), (300.0, 420.0), 12.0);
        assert_near(c.bottom_left(), (60.0, 380.0), 12.0);
    }

    #[test]
    fn zero_sized_image_has_no_document() {
        let img = RasterImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        assert!(BoundaryDetector::default().detect(&img).is_none());
    }

    #[test]
    fn closing_vertex_is_dropped() {
        let poly = vec![
            PixelPoint::new(0, 0),
            PixelPoint::new(10, 0),
            PixelPoint::new(10, 10),
            PixelPoint::new(0, 10),
            PixelPoint::new(0, 0),
        ];
        assert!(as_quadrilateral(poly).is_some());
    }

    #[test]
    fn pentagon_is_not_a_quadrilateral() {
        let poly = vec![
            PixelPoint::new(0, 0),
            PixelPoint::new(10, 0),
            PixelPoint::new(15, 5),
            PixelPoint::new(10, 10),
            PixelPoint::new(0, 10),
        ];
        assert!(as_quadrilateral(poly).is_none());
    }

    #[test]
    fn shoelace_area_of_square() {
        let square = [
            PixelPoint::new(0, 0),
            PixelPoint::new(4, 0),
            PixelPoint::new(4, 4),
            PixelPoint::new(0, 4),
        ];
        assert!((polygon_area(&square) - 16.0).abs() < 1e-9);
    }
}
