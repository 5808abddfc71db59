use image::GrayImage;
use imageproc::contours::{find_contours as trace_contours, Contour};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use crate::config::DetectorConfig;
use crate::geometry::{polygon_area, to_f64};
use crate::models::PolygonCandidate;

/// Find contours in binary edge image, with outer/hole hierarchy.
///
/// Straight runs are collapsed to their end points.
pub fn find_contours(edges: &GrayImage) -> Vec<Contour<i32>> {
    trace_contours::<i32>(edges)
        .into_iter()
        .map(|mut contour| {
            contour.points = compress_chain(&contour.points);
            contour
        })
        .collect()
}

/// Drop every point that continues the previous step in the same
/// direction, keeping only the corners of a closed chain.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |from: Point<i32>, to: Point<i32>| ((to.x - from.x).signum(), (to.y - from.y).signum());

    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    // A chain with no direction change at all is a single straight run
    if kept.is_empty() {
        vec![points[0], points[n - 1]]
    } else {
        kept
    }
}

/// Index and squared distance of the point farthest from `origin`.
fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> (usize, i64) {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let dx = (p.x - origin.x) as i64;
            let dy = (p.y - origin.y) as i64;
            (i, dx * dx + dy * dy)
        })
        .fold((0, 0), |best, cur| if cur.1 > best.1 { cur } else { best })
}

/// Douglas-Peucker approximation of a closed curve.
///
/// The curve is re-anchored at the point farthest from where the trace
/// began, split at the point farthest from that anchor, and both halves
/// are simplified as open curves. Both split points lie on the convex
/// hull, so the trace's starting point is never kept for its own sake.
pub fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || !(epsilon > 0.0) {
        return points.to_vec();
    }

    let (anchor, spread) = farthest_from(points, points[0]);
    if spread == 0 {
        return vec![points[0]];
    }
    let mut ring = points.to_vec();
    ring.rotate_left(anchor);
    let (split, _) = farthest_from(&ring, ring[0]);

    let mut back_half = ring[split..].to_vec();
    back_half.push(ring[0]);

    let mut polygon = approximate_polygon_dp(&ring[..=split], epsilon, false);
    polygon.pop();
    let mut tail = approximate_polygon_dp(&back_half, epsilon, false);
    tail.pop();
    polygon.extend(tail);
    polygon
}

/// Approximate one contour and measure it.
pub fn approximate_contour(
    contour_index: usize,
    contour: &Contour<i32>,
    epsilon_factor: f64,
) -> Option<PolygonCandidate> {
    let perimeter = arc_length(&contour.points, true);
    let epsilon = perimeter * epsilon_factor;
    if !(epsilon > 0.0) {
        return None;
    }

    let vertices: Vec<Point<f64>> = approximate_closed(&contour.points, epsilon)
        .into_iter()
        .map(to_f64)
        .collect();
    let area = polygon_area(&vertices);

    Some(PolygonCandidate {
        contour_index,
        border_type: contour.border_type,
        vertices,
        area,
    })
}

/// Strict area bounds: above `min_area`, below `max_area_fraction` of the
/// frame.
pub fn passes_area_filter(area: f64, frame_area: f64, config: &DetectorConfig) -> bool {
    area > config.min_area && area < frame_area * config.max_area_fraction
}

/// Why a polygon did not make it to shape validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateRejection {
    VertexCount,
    Area,
}

/// Vertex-count and area gate in front of shape validation.
pub fn check_candidate(
    candidate: &PolygonCandidate,
    frame_area: f64,
    config: &DetectorConfig,
) -> Result<(), CandidateRejection> {
    if candidate.vertex_count() != 4 {
        return Err(CandidateRejection::VertexCount);
    }
    if !passes_area_filter(candidate.area, frame_area, config) {
        return Err(CandidateRejection::Area);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::contours::BorderType;

    fn p(x: i32, y: i32) -> Point<i32> {
        Point::new(x, y)
    }

    fn square_outline(x0: i32, y0: i32, side: i32) -> Vec<Point<i32>> {
        let x1 = x0 + side;
        let y1 = y0 + side;
        let mut pts = Vec::new();
        pts.extend((x0..x1).map(|x| p(x, y0)));
        pts.extend((y0..y1).map(|y| p(x1, y)));
        pts.extend((x0 + 1..=x1).rev().map(|x| p(x, y1)));
        pts.extend((y0 + 1..=y1).rev().map(|y| p(x0, y)));
        pts
    }

    fn candidate(vertices: Vec<Point<f64>>) -> PolygonCandidate {
        let area = polygon_area(&vertices);
        PolygonCandidate {
            contour_index: 0,
            border_type: BorderType::Outer,
            vertices,
            area,
        }
    }

    #[test]
    fn straight_runs_collapse_to_corners() {
        let compressed = compress_chain(&square_outline(0, 0, 10));
        assert_eq!(compressed, vec![p(0, 0), p(10, 0), p(10, 10), p(0, 10)]);
    }

    #[test]
    fn short_chains_are_kept() {
        let pts = vec![p(1, 1), p(2, 2)];
        assert_eq!(compress_chain(&pts), pts);
    }

    #[test]
    fn square_approximates_to_four_corners() {
        let outline = square_outline(5, 5, 40);
        let perimeter = arc_length(&outline, true);
        let polygon = approximate_closed(&outline, perimeter * 0.02);
        assert_eq!(polygon.len(), 4);
        for corner in [p(5, 5), p(45, 5), p(45, 45), p(5, 45)] {
            assert!(polygon.contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn trace_starting_mid_edge_still_gives_four_corners() {
        // Rectangle traced from the middle of its top edge.
        let outline = vec![p(100, 0), p(200, 0), p(200, 120), p(0, 120), p(0, 0)];
        let perimeter = arc_length(&outline, true);
        let polygon = approximate_closed(&outline, perimeter * 0.02);

        assert_eq!(polygon.len(), 4, "got {polygon:?}");
        assert!(!polygon.contains(&p(100, 0)));
        for corner in [p(0, 0), p(200, 0), p(200, 120), p(0, 120)] {
            assert!(polygon.contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn start_point_does_not_change_the_polygon() {
        let outline = square_outline(10, 10, 60);
        let perimeter = arc_length(&outline, true);
        let reference = approximate_closed(&outline, perimeter * 0.02);

        for shift in [7, 30, 75, 131] {
            let mut rotated = outline.clone();
            rotated.rotate_left(shift);
            let polygon = approximate_closed(&rotated, perimeter * 0.02);
            assert_eq!(polygon.len(), 4, "shift {shift}: {polygon:?}");
            for corner in &reference {
                assert!(polygon.contains(corner), "shift {shift}: missing {corner:?}");
            }
        }
    }

    #[test]
    fn single_point_contour_stays_degenerate() {
        assert_eq!(approximate_closed(&[p(3, 3), p(3, 3), p(3, 3)], 1.0), vec![p(3, 3)]);
    }

    #[test]
    fn blank_edge_map_has_no_contours() {
        let edges = GrayImage::new(64, 48);
        assert!(find_contours(&edges).is_empty());
    }

    #[test]
    fn drawn_square_yields_quadrilateral_candidates() {
        let mut edges = GrayImage::new(100, 100);
        for pt in square_outline(20, 20, 50) {
            edges.put_pixel(pt.x as u32, pt.y as u32, Luma([255]));
        }
        let contours = find_contours(&edges);
        assert!(!contours.is_empty());

        let quads: Vec<PolygonCandidate> = contours
            .iter()
            .enumerate()
            .filter_map(|(i, c)| approximate_contour(i, c, 0.02))
            .filter(|c| c.vertex_count() == 4)
            .collect();
        assert!(!quads.is_empty());
        for quad in &quads {
            assert!((quad.area - 2500.0).abs() < 300.0, "area {}", quad.area);
            assert_eq!(contours[quad.contour_index].border_type, quad.border_type);
        }
        // A one-pixel outline has both an outer and a hole border.
        assert!(quads.iter().any(|q| q.border_type == BorderType::Outer));
        assert!(quads.iter().any(|q| q.border_type == BorderType::Hole));
    }

    #[test]
    fn area_bounds_are_strict() {
        let config = DetectorConfig::default();
        let frame_area = 640.0 * 480.0;
        assert!(!passes_area_filter(1000.0, frame_area, &config));
        assert!(passes_area_filter(1001.0, frame_area, &config));
        assert!(!passes_area_filter(frame_area * 0.5, frame_area, &config));
        assert!(passes_area_filter(frame_area * 0.5 - 1.0, frame_area, &config));
    }

    #[test]
    fn candidate_gate_checks_vertices_then_area() {
        let config = DetectorConfig::default();
        let frame_area = 640.0 * 480.0;

        let triangle = candidate(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
        ]);
        assert_eq!(
            check_candidate(&triangle, frame_area, &config),
            Err(CandidateRejection::VertexCount)
        );

        // 40 x 25 encloses exactly 1000 pixels.
        let exact = candidate(vec![
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(40.0, 25.0),
            Point::new(0.0, 25.0),
        ]);
        assert_eq!(
            check_candidate(&exact, frame_area, &config),
            Err(CandidateRejection::Area)
        );

        // 77 x 13 encloses 1001.
        let just_over = candidate(vec![
            Point::new(0.0, 0.0),
            Point::new(77.0, 0.0),
            Point::new(77.0, 13.0),
            Point::new(0.0, 13.0),
        ]);
        assert_eq!(check_candidate(&just_over, frame_area, &config), Ok(()));
    }
}
