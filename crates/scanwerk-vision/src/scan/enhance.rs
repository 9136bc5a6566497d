// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement: the four post-processing filters applied to a rectified
// document: pass-through, local contrast equalization, grayscale, and
// adaptive black-and-white thresholding.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use scanwerk_core::{EnhanceConfig, EnhancementMode};
use tracing::{debug, info, instrument};

use crate::image::raster::RasterImage;
use crate::scan::clahe::{clahe, lab_to_srgb, srgb_to_lab};
use crate::scan::kernel::gaussian_kernel;

/// Gaussian sigma of the thresholding window.
const THRESHOLD_SIGMA: f32 = 2.0;

/// Applies an [`EnhancementMode`] to a rectified scan.
///
/// Every filter is a pure function of its input: the same image and mode
/// always give pixel-identical output, and the input is never modified.
#[derive(Debug, Clone, Default)]
pub struct ScanEnhancer {
    config: EnhanceConfig,
}

impl ScanEnhancer {
    pub fn new(config: EnhanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhanceConfig {
        &self.config
    }

    /// Produce the enhanced image for `mode`.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn apply(&self, image: &RasterImage, mode: EnhancementMode) -> RasterImage {
        let out = match mode {
            EnhancementMode::Original => image.clone(),
            EnhancementMode::Enhanced => self.equalize(image),
            EnhancementMode::Grayscale => self.grayscale(image),
            EnhancementMode::Bw => self.binarize(image),
        };
        debug!(%mode, "Enhancement applied");
        out
    }

    // -- Filters --------------------------------------------------------------

    /// Single-channel luma.
    pub fn grayscale(&self, image: &RasterImage) -> RasterImage {
        RasterImage::from_dynamic(DynamicImage::ImageLuma8(image.to_luma8()))
    }

    /// Contrast-limited adaptive equalization of lightness.
    ///
    /// Colour images are equalized on the L* channel of CIELAB so hue is
    /// untouched; alpha is carried through. Gray images are equalized directly.
    pub fn equalize(&self, image: &RasterImage) -> RasterImage {
        let tiles = self.config.clahe_tiles;
        let clip = self.config.clahe_clip_limit;
        info!(tiles, clip, "Applying CLAHE");

        if image.is_grayscale() {
            let equalized = clahe(&image.to_luma8(), tiles, clip);
            return RasterImage::from_dynamic(DynamicImage::ImageLuma8(equalized));
        }

        let rgba = image.as_dynamic().to_rgba8();
        let (w, h) = rgba.dimensions();

        let mut lightness = GrayImage::new(w, h);
        let mut chroma = Vec::with_capacity((w as usize) * (h as usize));
        for (x, y, px) in rgba.enumerate_pixels() {
            let [r, g, b, _] = px.0;
            let (l, a, bb) = srgb_to_lab([r, g, b]);
            lightness.put_pixel(x, y, Luma([(l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8]));
            chroma.push((a, bb));
        }

        let equalized = clahe(&lightness, tiles, clip);

        let recolor = |x: u32, y: u32| {
            let l = equalized.get_pixel(x, y).0[0] as f32 * 100.0 / 255.0;
            let (a, b) = chroma[(y as usize) * (w as usize) + x as usize];
            lab_to_srgb(l, a, b)
        };

        let out = if image.has_alpha() {
            DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
                let [r, g, b] = recolor(x, y);
                Rgba([r, g, b, rgba.get_pixel(x, y).0[3]])
            }))
        } else {
            DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| Rgb(recolor(x, y))))
        };
        RasterImage::from_dynamic(out)
    }

    /// Adaptive black-and-white thresholding.
    ///
    /// The threshold for each pixel is the Gaussian-weighted mean of its
    /// `threshold_block_size` neighbourhood minus `threshold_offset`. Pixels
    /// above the threshold become white, the rest black. Borders replicate the
    /// edge pixel.
    pub fn binarize(&self, image: &RasterImage) -> RasterImage {
        let block = self.config.threshold_block_size;
        let offset = self.config.threshold_offset;
        info!(block, offset, "Applying adaptive binarization");

        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        let kernel = gaussian_kernel(block, THRESHOLD_SIGMA);
        let means = gaussian_local_mean(&gray, &kernel);

        let mut output = GrayImage::new(width, height);
        for (x, y, px) in gray.enumerate_pixels() {
            let threshold = means[(y as usize) * (width as usize) + x as usize] - offset;
            let binary = if px.0[0] as f32 > threshold { 255u8 } else { 0u8 };
            output.put_pixel(x, y, Luma([binary]));
        }

        debug!("Binarization complete");
        RasterImage::from_dynamic(DynamicImage::ImageLuma8(output))
    }
}

// -- Gaussian local mean ------------------------------------------------------

/// Separable Gaussian blur of `gray` with replicated borders, as `f32`.
///
/// Returned row-major, `width × height`.
fn gaussian_local_mean(gray: &GrayImage, kernel: &[f32]) -> Vec<f32> {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let radius = (kernel.len() / 2) as isize;
    let clamp = |v: isize, len: usize| v.clamp(0, len as isize - 1) as usize;

    let src: Vec<f32> = gray.as_raw().iter().map(|&v| v as f32).collect();

    let mut horizontal = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                acc += weight * row[clamp(x as isize + k as isize - radius, w)];
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                acc += weight * horizontal[clamp(y as isize + k as isize - radius, h) * w + x];
            }
            out[y * w + x] = acc;
        }
    }
    out
}

// -- Tests --------------------------------------------------------------------
