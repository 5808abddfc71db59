//! Plane geometry on polygon vertices.

use imageproc::point::Point;

/// Heights below this are treated as zero by [`aspect_ratio`].
const MIN_EXTENT: f64 = 1e-9;

pub fn to_f64(p: Point<i32>) -> Point<f64> {
    Point::new(p.x as f64, p.y as f64)
}

/// Cosine of the angle at `vertex` between the rays towards `a` and `b`.
///
/// Returns NaN when either ray has zero length.
pub fn angle_cosine(a: Point<f64>, vertex: Point<f64>, b: Point<f64>) -> f64 {
    let dx1 = a.x - vertex.x;
    let dy1 = a.y - vertex.y;
    let dx2 = b.x - vertex.x;
    let dy2 = b.y - vertex.y;
    (dx1 * dx2 + dy1 * dy2) / ((dx1 * dx1 + dy1 * dy1) * (dx2 * dx2 + dy2 * dy2)).sqrt()
}

/// Largest |cos| over the interior angles of a closed polygon.
///
/// Degenerate corners count as 1.0, the worst possible value.
pub fn max_abs_cosine(points: &[Point<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 1.0;
    }
    (0..n)
        .map(|i| {
            let cos = angle_cosine(points[i], points[(i + 1) % n], points[(i + 2) % n]);
            if cos.is_finite() { cos.abs().min(1.0) } else { 1.0 }
        })
        .fold(0.0, f64::max)
}

/// Unsigned shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice.abs() / 2.0
}

pub fn centroid(points: &[Point<f64>]) -> Point<f64> {
    let n = points.len().max(1) as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Reorder four corners as top-left, top-right, bottom-right, bottom-left.
///
/// Corners are sorted by angle about their centroid (clockwise on screen,
/// where y grows downwards) and rotated so the corner with the smallest
/// `x + y` comes first. This makes the result independent of the winding
/// and starting point the contour tracer happened to produce.
pub fn order_corners(corners: &[Point<f64>; 4]) -> [Point<f64>; 4] {
    let c = centroid(corners);
    let mut sorted = *corners;
    sorted.sort_by(|p, q| {
        let ap = (p.y - c.y).atan2(p.x - c.x);
        let aq = (q.y - c.y).atan2(q.x - c.x);
        ap.total_cmp(&aq)
    });
    let start = (0..4)
        .min_by(|&i, &j| {
            let si = sorted[i].x + sorted[i].y;
            let sj = sorted[j].x + sorted[j].y;
            si.total_cmp(&sj)
        })
        .unwrap_or(0);
    sorted.rotate_left(start);
    sorted
}

/// Width over height of four corners given as top-left, top-right,
/// bottom-right, bottom-left.
///
/// Width is the horizontal run of the top edge and height the vertical run
/// of the right edge. Returns `None` for a flat quadrilateral.
pub fn aspect_ratio(ordered: &[Point<f64>; 4]) -> Option<f64> {
    let width = ordered[1].x - ordered[0].x;
    let height = ordered[2].y - ordered[1].y;
    if height.abs() < MIN_EXTENT {
        return None;
    }
    let ratio = width / height;
    ratio.is_finite().then_some(ratio)
}
