use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};

/// How the Canny hysteresis thresholds are chosen for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum EdgeThresholds {
    /// The same thresholds for every frame.
    Fixed { low: f32, high: f32 },
    /// Thresholds scaled from the mean brightness of the equalized frame.
    Dynamic { low_factor: f32, high_factor: f32 },
}

impl EdgeThresholds {
    pub fn dynamic() -> Self {
        EdgeThresholds::Dynamic {
            low_factor: 0.66,
            high_factor: 1.33,
        }
    }
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        EdgeThresholds::Fixed {
            low: 50.0,
            high: 150.0,
        }
    }
}

/// Tunables for the whole per-frame pipeline.
///
/// Read-only while a frame is in flight: a [`crate::CardDetector`] owns its
/// copy and never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Side of the square Gaussian blur kernel (odd).
    pub blur_kernel_size: u32,
    /// CLAHE clip limit, relative to a flat histogram.
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per axis. Tiles should stay larger than a card's
    /// footprint: a tile the card covers completely maps background levels
    /// it never saw, and global equalization turns that into false edges
    /// next to the card.
    pub clahe_tile_grid: u32,
    /// Side of the adaptive threshold neighbourhood (odd, >= 3).
    pub threshold_block_size: u32,
    /// Offset subtracted from the local mean.
    pub threshold_c: f32,
    pub edge_thresholds: EdgeThresholds,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_factor: f64,
    /// Candidates must enclose strictly more than this many pixels.
    pub min_area: f64,
    /// Candidates must enclose strictly less than this fraction of the frame.
    pub max_area_fraction: f64,
    /// Largest accepted |cos| of any interior angle.
    pub max_cosine: f64,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    /// Outline width in pixels.
    pub stroke_width: u32,
    /// Corner distance under which two accepted outlines count as the same
    /// card. Zero disables suppression.
    pub duplicate_corner_distance: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            clahe_clip_limit: 2.0,
            clahe_tile_grid: 4,
            threshold_block_size: 11,
            threshold_c: 2.0,
            edge_thresholds: EdgeThresholds::default(),
            approx_epsilon_factor: 0.02,
            min_area: 1000.0,
            max_area_fraction: 0.5,
            max_cosine: 0.3,
            min_aspect_ratio: 1.4,
            max_aspect_ratio: 1.8,
            stroke_width: 3,
            duplicate_corner_distance: 20.0,
        }
    }
}

impl DetectorConfig {
    pub fn with_edge_thresholds(mut self, edge_thresholds: EdgeThresholds) -> Self {
        self.edge_thresholds = edge_thresholds;
        self
    }

    pub fn with_aspect_ratio(mut self, min: f64, max: f64) -> Self {
        self.min_aspect_ratio = min;
        self.max_aspect_ratio = max;
        self
    }

    /// Load a JSON configuration. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: DetectorConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check internal consistency before the config is used on frames.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(DetectError::InvalidConfig(msg))
        }

        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return invalid(format!(
                "blur_kernel_size must be odd and positive, got {}",
                self.blur_kernel_size
            ));
        }
        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return invalid(format!(
                "threshold_block_size must be odd and at least 3, got {}",
                self.threshold_block_size
            ));
        }
        if !(self.clahe_clip_limit > 0.0) {
            return invalid(format!(
                "clahe_clip_limit must be positive, got {}",
                self.clahe_clip_limit
            ));
        }
        if self.clahe_tile_grid == 0 {
            return invalid("clahe_tile_grid must be positive".to_string());
        }
        match self.edge_thresholds {
            EdgeThresholds::Fixed { low, high } => {
                if !(low >= 0.0) || high < low {
                    return invalid(format!(
                        "fixed edge thresholds must satisfy 0 <= low <= high, got {low}/{high}"
                    ));
                }
            }
            EdgeThresholds::Dynamic {
                low_factor,
                high_factor,
            } => {
                if !(low_factor >= 0.0) || high_factor < low_factor {
                    return invalid(format!(
                        "dynamic edge factors must satisfy 0 <= low <= high, got {low_factor}/{high_factor}"
                    ));
                }
            }
        }
        if !(self.approx_epsilon_factor > 0.0) {
            return invalid(format!(
                "approx_epsilon_factor must be positive, got {}",
                self.approx_epsilon_factor
            ));
        }
        if !(self.min_area >= 0.0) {
            return invalid(format!("min_area must be non-negative, got {}", self.min_area));
        }
        if !(self.max_area_fraction > 0.0 && self.max_area_fraction <= 1.0) {
            return invalid(format!(
                "max_area_fraction must lie in (0, 1], got {}",
                self.max_area_fraction
            ));
        }
        if !(self.max_cosine > 0.0 && self.max_cosine <= 1.0) {
            return invalid(format!("max_cosine must lie in (0, 1], got {}", self.max_cosine));
        }
        if !(self.min_aspect_ratio < self.max_aspect_ratio) {
            return invalid(format!(
                "aspect ratio bounds are inverted: {} >= {}",
                self.min_aspect_ratio, self.max_aspect_ratio
            ));
        }
        if self.stroke_width == 0 {
            return invalid("stroke_width must be positive".to_string());
        }
        if !(self.duplicate_corner_distance >= 0.0) {
            return invalid(format!(
                "duplicate_corner_distance must be non-negative, got {}",
                self.duplicate_corner_distance
            ));
        }
        Ok(())
    }
}
