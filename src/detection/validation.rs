use imageproc::point::Point;

use crate::config::DetectorConfig;
use crate::geometry::{aspect_ratio, max_abs_cosine, order_corners};
use crate::models::Quadrilateral;

/// Why a quadrilateral was not accepted as a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRejection {
    NotRectangular,
    AspectRatio,
}

/// Pure shape checks with fixed bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeValidator {
    pub max_cosine: f64,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
}

impl ShapeValidator {
    pub fn new(max_cosine: f64, min_aspect_ratio: f64, max_aspect_ratio: f64) -> Self {
        Self {
            max_cosine,
            min_aspect_ratio,
            max_aspect_ratio,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(
            config.max_cosine,
            config.min_aspect_ratio,
            config.max_aspect_ratio,
        )
    }

    /// All four interior angles close to 90 degrees.
    pub fn is_rectangle(&self, points: &[Point<f64>]) -> bool {
        points.len() == 4 && max_abs_cosine(points) < self.max_cosine
    }

    /// Open interval test on the width/height ratio.
    pub fn is_valid_aspect_ratio(&self, ratio: f64) -> bool {
        ratio > self.min_aspect_ratio && ratio < self.max_aspect_ratio
    }

    /// Aspect ratio of four corners in any order, `None` when flat.
    pub fn aspect_ratio_of(&self, corners: &[Point<f64>; 4]) -> Option<f64> {
        aspect_ratio(&order_corners(corners))
    }

    pub fn validate(&self, quad: &Quadrilateral) -> Result<(), ShapeRejection> {
        if !self.is_rectangle(&quad.corners) {
            return Err(ShapeRejection::NotRectangular);
        }
        match self.aspect_ratio_of(&quad.corners) {
            Some(ratio) if self.is_valid_aspect_ratio(ratio) => Ok(()),
            _ => Err(ShapeRejection::AspectRatio),
        }
    }
}

impl Default for ShapeValidator {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}
