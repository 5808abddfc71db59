use imageproc::contours::BorderType;
use imageproc::point::Point;

use crate::geometry;

/// A contour after polygon approximation.
#[derive(Debug, Clone)]
pub struct PolygonCandidate {
    /// Index of the source contour in the frame's contour list.
    pub contour_index: usize,
    pub border_type: BorderType,
    pub vertices: Vec<Point<f64>>,
    pub area: f64,
}

impl PolygonCandidate {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// The candidate as a quadrilateral, if it has exactly four vertices.
    pub fn as_quadrilateral(&self) -> Option<Quadrilateral> {
        let corners: [Point<f64>; 4] = self.vertices.as_slice().try_into().ok()?;
        Some(Quadrilateral {
            corners,
            area: self.area,
        })
    }
}

/// Four corners in the traversal order the approximation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadrilateral {
    pub corners: [Point<f64>; 4],
    pub area: f64,
}

impl Quadrilateral {
    pub fn new(corners: [Point<f64>; 4]) -> Self {
        let area = geometry::polygon_area(&corners);
        Self { corners, area }
    }

    /// Corners as top-left, top-right, bottom-right, bottom-left.
    pub fn ordered_corners(&self) -> [Point<f64>; 4] {
        geometry::order_corners(&self.corners)
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        geometry::aspect_ratio(&self.ordered_corners())
    }

    pub fn center(&self) -> Point<f64> {
        geometry::centroid(&self.corners)
    }

    /// Largest distance between matching normalized corners of two quads.
    pub fn corner_distance(&self, other: &Quadrilateral) -> f64 {
        let a = self.ordered_corners();
        let b = other.ordered_corners();
        a.iter()
            .zip(b.iter())
            .map(|(p, q)| ((p.x - q.x).powi(2) + (p.y - q.y).powi(2)).sqrt())
            .fold(0.0, f64::max)
    }
}

/// Per-frame counters, for logging only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDiagnostics {
    pub contours_found: usize,
    pub rejected_vertex_count: usize,
    pub rejected_area: usize,
    pub rejected_angle: usize,
    pub rejected_aspect_ratio: usize,
    pub duplicates_suppressed: usize,
}

/// Everything one frame produced.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub quadrilaterals: Vec<Quadrilateral>,
    pub diagnostics: FrameDiagnostics,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.quadrilaterals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quadrilaterals.len()
    }
}
