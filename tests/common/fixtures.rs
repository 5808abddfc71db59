use cardscan::{CardDetector, DetectorConfig, Quadrilateral};
use image::{Rgba, RgbaImage};

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Axis-aligned rectangle in pixel units: covers `x..x + w` by `y..y + h`.
#[derive(Debug, Clone, Copy)]
pub struct Card {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Card {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        (self.x..self.x + self.w).contains(&px) && (self.y..self.y + self.h).contains(&py)
    }

    /// Corner positions as top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let x0 = self.x as f64;
        let y0 = self.y as f64;
        let x1 = (self.x + self.w - 1) as f64;
        let y1 = (self.y + self.h - 1) as f64;
        [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }
}

/// 178 x 112 encloses 19 936 pixels with a 1.59 aspect ratio.
pub const ID_CARD: Card = Card::new(231, 184, 178, 112);

/// Same area as [`ID_CARD`], aspect ratio 1.2.
pub const SQUARISH_CARD: Card = Card::new(242, 175, 155, 129);

/// Black frame with each card painted white.
pub fn card_frame(width: u32, height: u32, cards: &[Card]) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if cards.iter().any(|c| c.contains(x, y)) {
            WHITE
        } else {
            BLACK
        }
    })
}

/// Black frame with a white `w` x `h` card rotated by `degrees` about
/// (`cx`, `cy`).
pub fn rotated_card_frame(width: u32, height: u32, cx: f64, cy: f64, w: f64, h: f64, degrees: f64) -> RgbaImage {
    let (sin, cos) = degrees.to_radians().sin_cos();
    RgbaImage::from_fn(width, height, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        // Rotate back into the card's own frame
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        if u.abs() <= w / 2.0 && v.abs() <= h / 2.0 {
            WHITE
        } else {
            BLACK
        }
    })
}

pub fn default_detector() -> CardDetector {
    CardDetector::new(DetectorConfig::default()).expect("default config is valid")
}

/// Largest distance between a detected outline and a card's corners.
pub fn corner_error(quad: &Quadrilateral, card: &Card) -> f64 {
    quad.ordered_corners()
        .iter()
        .zip(card.corners().iter())
        .map(|(p, (x, y))| ((p.x - x).powi(2) + (p.y - y).powi(2)).sqrt())
        .fold(0.0, f64::max)
}
