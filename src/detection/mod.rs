pub mod contours;
pub mod drawing;
pub mod preprocessing;
pub mod validation;

use image::{DynamicImage, RgbaImage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, trace};

use crate::config::DetectorConfig;
use crate::error::{DetectError, Result};
use crate::models::{Detection, FrameDiagnostics, Quadrilateral};
use contours::CandidateRejection;
use validation::{ShapeRejection, ShapeValidator};

/// Main detection pipeline orchestrator
///
/// Holds nothing but its configuration, so one detector can serve any
/// number of frames, from any number of threads, in any order.
#[derive(Debug, Clone)]
pub struct CardDetector {
    config: DetectorConfig,
    validator: ShapeValidator,
}

impl CardDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let validator = ShapeValidator::from_config(&config);
        Ok(Self { config, validator })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Annotate one frame: every accepted card is outlined in green on a
    /// copy of the input.
    pub fn process(&self, frame: &RgbaImage) -> Result<RgbaImage> {
        let detection = self.detect(frame)?;
        Ok(drawing::annotate(
            frame,
            &detection.quadrilaterals,
            self.config.stroke_width,
        ))
    }

    /// [`CardDetector::process`] for any decoded image.
    pub fn process_dynamic(&self, frame: &DynamicImage) -> Result<RgbaImage> {
        self.process(&frame.to_rgba8())
    }

    /// Run the pipeline without drawing.
    pub fn detect(&self, frame: &RgbaImage) -> Result<Detection> {
        self.run(frame, None)
    }

    /// Like [`CardDetector::detect`], but gives up with
    /// [`DetectError::Cancelled`] once `cancel` fires. Checked between
    /// stages and between contours.
    pub fn detect_cancellable(
        &self,
        frame: &RgbaImage,
        cancel: &CancellationToken,
    ) -> Result<Detection> {
        self.run(frame, Some(cancel))
    }

    fn run(&self, frame: &RgbaImage, cancel: Option<&CancellationToken>) -> Result<Detection> {
        let checkpoint = || match cancel {
            Some(token) if token.is_cancelled() => Err(DetectError::Cancelled),
            _ => Ok(()),
        };

        let (width, height) = frame.dimensions();
        let span = info_span!("frame", width, height);
        let _entered = span.enter();
        checkpoint()?;

        // Step 1: Preprocess frame into an edge map
        let edges = preprocessing::preprocess_frame(frame, &self.config)?;
        checkpoint()?;

        // Step 2: Find contours
        let all_contours = contours::find_contours(&edges);
        drop(edges);
        debug!(count = all_contours.len(), "Contours found");

        let mut diagnostics = FrameDiagnostics {
            contours_found: all_contours.len(),
            ..Default::default()
        };
        let frame_area = width as f64 * height as f64;

        // Step 3: Approximate, filter and validate each contour
        let mut accepted: Vec<Quadrilateral> = Vec::new();
        for (index, contour) in all_contours.iter().enumerate() {
            checkpoint()?;

            let Some(candidate) =
                contours::approximate_contour(index, contour, self.config.approx_epsilon_factor)
            else {
                diagnostics.rejected_vertex_count += 1;
                continue;
            };
            trace!(
                contour = candidate.contour_index,
                border = ?candidate.border_type,
                vertices = candidate.vertex_count(),
                area = candidate.area,
                "Approximated polygon vertex count"
            );

            match contours::check_candidate(&candidate, frame_area, &self.config) {
                Err(CandidateRejection::VertexCount) => {
                    diagnostics.rejected_vertex_count += 1;
                    continue;
                }
                Err(CandidateRejection::Area) => {
                    diagnostics.rejected_area += 1;
                    continue;
                }
                Ok(()) => {}
            }
            let Some(quad) = candidate.as_quadrilateral() else {
                diagnostics.rejected_vertex_count += 1;
                continue;
            };

            match self.validator.validate(&quad) {
                Ok(()) => accepted.push(quad),
                Err(ShapeRejection::NotRectangular) => diagnostics.rejected_angle += 1,
                Err(ShapeRejection::AspectRatio) => diagnostics.rejected_aspect_ratio += 1,
            }
        }
        checkpoint()?;

        // Step 4: Collapse the nested outlines one card leaves in the edge map
        let before = accepted.len();
        let quadrilaterals = suppress_duplicates(accepted, self.config.duplicate_corner_distance);
        diagnostics.duplicates_suppressed = before - quadrilaterals.len();

        debug!(
            accepted = quadrilaterals.len(),
            rejected_vertex_count = diagnostics.rejected_vertex_count,
            rejected_area = diagnostics.rejected_area,
            rejected_angle = diagnostics.rejected_angle,
            rejected_aspect_ratio = diagnostics.rejected_aspect_ratio,
            duplicates = diagnostics.duplicates_suppressed,
            "Frame done"
        );

        Ok(Detection {
            quadrilaterals,
            diagnostics,
        })
    }
}

/// Keep one outline per card.
///
/// Outlines are visited from the smallest area up; an outline whose
/// normalized corners all lie within `max_distance` of an already kept one
/// is dropped. A non-positive distance keeps everything.
pub fn suppress_duplicates(mut quads: Vec<Quadrilateral>, max_distance: f64) -> Vec<Quadrilateral> {
    if !(max_distance > 0.0) {
        return quads;
    }
    quads.sort_by(|a, b| a.area.total_cmp(&b.area));

    let mut kept: Vec<Quadrilateral> = Vec::with_capacity(quads.len());
    for quad in quads {
        if kept.iter().all(|k| k.corner_distance(&quad) > max_distance) {
            kept.push(quad);
        }
    }
    kept
}
