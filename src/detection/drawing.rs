use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::models::Quadrilateral;

/// Full green, opaque.
pub const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Draw a closed outline `stroke_width` pixels wide.
///
/// The stroke is built from one-pixel segments offset across a square pen,
/// so corners are filled as well as edges.
pub fn draw_quadrilateral(canvas: &mut RgbaImage, quad: &Quadrilateral, stroke_width: u32, color: Rgba<u8>) {
    let lo = -((stroke_width.saturating_sub(1) / 2) as i32);
    let hi = lo + stroke_width.max(1) as i32 - 1;

    for (i, start) in quad.corners.iter().enumerate() {
        let end = quad.corners[(i + 1) % 4];
        for dy in lo..=hi {
            for dx in lo..=hi {
                draw_line_segment_mut(
                    canvas,
                    (start.x as f32 + dx as f32, start.y as f32 + dy as f32),
                    (end.x as f32 + dx as f32, end.y as f32 + dy as f32),
                    color,
                );
            }
        }
    }
}

/// Copy `frame` and outline every quadrilateral on the copy.
pub fn annotate(frame: &RgbaImage, quads: &[Quadrilateral], stroke_width: u32) -> RgbaImage {
    let mut annotated = frame.clone();
    for quad in quads {
        draw_quadrilateral(&mut annotated, quad, stroke_width, OUTLINE_COLOR);
    }
    annotated
}
