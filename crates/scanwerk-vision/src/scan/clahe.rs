// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization, plus the sRGB <-> CIELAB
// conversion needed to apply it to the lightness channel only.

use image::{GrayImage, Luma};

/// Equalize `gray` over a `tiles × tiles` grid with histogram clipping.
///
/// `clip_limit` is relative to a flat histogram: each bin is capped at
/// `clip_limit × tile_area / 256` and the excess is spread evenly over all
/// bins. Per-tile lookup tables are blended bilinearly between tile centres.
/// Images smaller than the grid use fewer tiles.
pub fn clahe(gray: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let tiles_x = tiles.clamp(1, w) as usize;
    let tiles_y = tiles.clamp(1, h) as usize;
    let (w, h) = (w as usize, h as usize);
    let tile_w = w / tiles_x;
    let tile_h = h / tiles_y;

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            // The last row and column absorb the remainder.
            let x1 = if tx == tiles_x - 1 { w } else { x0 + tile_w };
            let y1 = if ty == tiles_y - 1 { h } else { y0 + tile_h };

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x as u32, y as u32).0[0] as usize] += 1;
                }
            }
            let area = ((x1 - x0) * (y1 - y0)) as u32;
            luts[ty * tiles_x + tx] = tile_lut(&mut hist, area, clip_limit);
        }
    }

    let mut out = GrayImage::new(w as u32, h as u32);
    for y in 0..h {
        let (ty0, ty1, fy) = tile_blend(y, tile_h, tiles_y);
        for x in 0..w {
            let (tx0, tx1, fx) = tile_blend(x, tile_w, tiles_x);
            let v = gray.get_pixel(x as u32, y as u32).0[0] as usize;

            let top = lerp(luts[ty0 * tiles_x + tx0][v], luts[ty0 * tiles_x + tx1][v], fx);
            let bottom = lerp(luts[ty1 * tiles_x + tx0][v], luts[ty1 * tiles_x + tx1][v], fx);
            let value = top + (bottom - top) * fy;
            out.put_pixel(x as u32, y as u32, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Clip `hist`, redistribute the excess, and build the equalization table.
fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let per_bin = excess / 256;
    let residual = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if residual > 0 {
        let step = (256 / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        cumulative += count;
        *entry = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Neighbouring tile indices along one axis and the blend weight of the second.
fn tile_blend(pos: usize, tile_size: usize, tiles: usize) -> (usize, usize, f32) {
    let t = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    let lower = t.floor();
    let weight = t - lower;
    let last = tiles as i64 - 1;
    let i0 = (lower as i64).clamp(0, last) as usize;
    let i1 = (lower as i64 + 1).clamp(0, last) as usize;
    (i0, i1, weight)
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    a as f32 + (b as f32 - a as f32) * t
}

// -- CIELAB (D65) -------------------------------------------------------------

const WHITE_X: f32 = 0.950_47;
const WHITE_Z: f32 = 1.088_83;
const DELTA: f32 = 6.0 / 29.0;

/// sRGB bytes to `(L, a, b)` with `L` in `[0, 100]`.
pub fn srgb_to_lab(rgb: [u8; 3]) -> (f32, f32, f32) {
    let [r, g, b] = rgb.map(|c| srgb_to_linear(c as f32 / 255.0));

    let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / WHITE_X;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = (0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Inverse of [`srgb_to_lab`]; out-of-gamut values are clamped.
pub fn lab_to_srgb(l: f32, a: f32, b: f32) -> [u8; 3] {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = lab_f_inv(fx) * WHITE_X;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let bl = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    [r, g, bl].map(|c| (linear_to_srgb(c).clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}
