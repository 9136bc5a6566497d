// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification: warp the quadrilateral bounded by four corners
// into an upright rectangle.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use scanwerk_core::CornerSet;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument};

use crate::image::raster::RasterImage;

/// Output size for a corner set: the longer of each pair of opposite edges,
/// rounded, never below 1.
pub fn target_dimensions(corners: &CornerSet) -> (u32, u32) {
    let (tl, tr, br, bl) = (
        corners.top_left(),
        corners.top_right(),
        corners.bottom_right(),
        corners.bottom_left(),
    );
    let width = tl.distance(&tr).max(bl.distance(&br));
    let height = tl.distance(&bl).max(tr.distance(&br));
    (to_extent(width), to_extent(height))
}

fn to_extent(length: f32) -> u32 {
    if length.is_finite() {
        (length.round() as u32).max(1)
    } else {
        1
    }
}

/// Warp the region bounded by `corners` (canonical order, source pixel
/// coordinates) into a `target_dimensions(corners)` rectangle.
///
/// Colour images keep their channel layout; pixels that sample outside the
/// source are white.
#[instrument(skip(image, corners), fields(width = image.width(), height = image.height()))]
pub fn rectify(image: &RasterImage, corners: &CornerSet) -> Result<RasterImage> {
    let (width, height) = image.dimensions();
    corners.validate_within(width, height)?;

    let (out_w, out_h) = target_dimensions(corners);
    let projection = homography(corners, out_w, out_h)?;
    debug!(out_w, out_h, "Projective transform computed");

    let warped = match image.as_dynamic() {
        DynamicImage::ImageLuma8(gray) => {
            let mut out = GrayImage::new(out_w, out_h);
            warp_into(gray, &projection, Interpolation::Bilinear, Luma([255]), &mut out);
            DynamicImage::ImageLuma8(out)
        }
        source if source.color().has_alpha() => {
            let rgba = source.to_rgba8();
            let mut out = RgbaImage::new(out_w, out_h);
            warp_into(
                &rgba,
                &projection,
                Interpolation::Bilinear,
                Rgba([255, 255, 255, 255]),
                &mut out,
            );
            DynamicImage::ImageRgba8(out)
        }
        source if !source.color().has_color() => {
            let gray = source.to_luma8();
            let mut out = GrayImage::new(out_w, out_h);
            warp_into(&gray, &projection, Interpolation::Bilinear, Luma([255]), &mut out);
            DynamicImage::ImageLuma8(out)
        }
        source => {
            let rgb = source.to_rgb8();
            let mut out = RgbImage::new(out_w, out_h);
            warp_into(&rgb, &projection, Interpolation::Bilinear, Rgb([255, 255, 255]), &mut out);
            DynamicImage::ImageRgb8(out)
        }
    };

    info!(out_w, out_h, "Perspective rectified");
    Ok(RasterImage::from_dynamic(warped))
}

/// Homography taking TL, TR, BR, BL to `(0,0) (w,0) (w,h) (0,h)`.
pub fn homography(corners: &CornerSet, out_w: u32, out_h: u32) -> Result<Projection> {
    let right = out_w as f32;
    let bottom = out_h as f32;
    let dest = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];
    Projection::from_control_points(corners.to_tuples(), dest).ok_or_else(|| {
        ScanwerkError::DegenerateGeometry(format!(
            "no projective transform maps {:?} onto a {}x{} rectangle",
            corners.to_tuples(),
            out_w,
            out_h
        ))
    })
}
