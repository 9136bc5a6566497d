// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};
use crate::types::EnhancementMode;

/// Tuning for the document boundary detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Width of the square Gaussian pre-blur kernel (odd, ≥ 3).
    pub blur_kernel_size: u32,
    /// Gaussian sigma for the pre-blur.
    pub blur_sigma: f32,
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Chebyshev radius of the dilation element (2 gives a 5x5 square).
    pub dilate_radius: u8,
    /// Smallest contour area kept, as a fraction of the image area.
    pub min_area_ratio: f64,
    /// Polygon approximation tolerance, as a fraction of the contour perimeter.
    pub approx_epsilon_ratio: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            blur_sigma: 1.1,
            canny_low: 75.0,
            canny_high: 200.0,
            dilate_radius: 2,
            min_area_ratio: 0.10,
            approx_epsilon_ratio: 0.02,
        }
    }
}

impl DetectorConfig {
    /// Reject values the detector cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel_size < 3 || self.blur_kernel_size % 2 == 0 {
            return Err(invalid("detector.blur_kernel_size must be odd and at least 3"));
        }
        if !(self.blur_sigma > 0.0) {
            return Err(invalid("detector.blur_sigma must be positive"));
        }
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return Err(invalid("detector.canny_low must be in [0, canny_high]"));
        }
        if !(0.0..1.0).contains(&self.min_area_ratio) {
            return Err(invalid("detector.min_area_ratio must be in [0, 1)"));
        }
        if !(self.approx_epsilon_ratio > 0.0) {
            return Err(invalid("detector.approx_epsilon_ratio must be positive"));
        }
        Ok(())
    }
}

/// Tuning for the enhancement filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// CLAHE tile grid (tiles per axis).
    pub clahe_tiles: u32,
    /// CLAHE clip limit, relative to a uniform histogram.
    pub clahe_clip_limit: f32,
    /// Adaptive threshold neighbourhood size (odd, ≥ 3).
    pub threshold_block_size: u32,
    /// Constant subtracted from the local weighted mean.
    pub threshold_offset: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            clahe_tiles: 8,
            clahe_clip_limit: 2.0,
            threshold_block_size: 11,
            threshold_offset: 2.0,
        }
    }
}

/// Complete scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub detector: DetectorConfig,
    pub enhance: EnhanceConfig,
    /// Enhancement applied to newly ingested items.
    pub default_mode: EnhancementMode,
    /// Inset used for fallback corners when no document is detected.
    pub fallback_inset: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            enhance: EnhanceConfig::default(),
            default_mode: EnhancementMode::Enhanced,
            fallback_inset: 0.10,
        }
    }
}

impl ScanConfig {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;

        let e = &self.enhance;
        if e.clahe_tiles == 0 {
            return Err(invalid("enhance.clahe_tiles must be at least 1"));
        }
        if !(e.clahe_clip_limit > 0.0) {
            return Err(invalid("enhance.clahe_clip_limit must be positive"));
        }
        if e.threshold_block_size < 3 || e.threshold_block_size % 2 == 0 {
            return Err(invalid("enhance.threshold_block_size must be odd and at least 3"));
        }

        if !(0.0..0.5).contains(&self.fallback_inset) {
            return Err(invalid("fallback_inset must be in [0, 0.5)"));
        }
        Ok(())
    }
}

fn invalid(detail: &str) -> ScanwerkError {
    ScanwerkError::InvalidConfig(detail.to_owned())
}
