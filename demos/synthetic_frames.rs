use image::{Rgba, RgbaImage};
use std::path::PathBuf;

use cardscan::{CardDetector, DetectorConfig};

/// Write a few synthetic frames, run the detector on them and save the
/// annotated results next to the inputs.
fn main() -> anyhow::Result<()> {
    let out_dir = PathBuf::from("synthetic_frames");
    std::fs::create_dir_all(&out_dir)?;

    let frames: [(&str, &[(u32, u32, u32, u32)]); 4] = [
        ("single_card", &[(231, 184, 178, 112)]),
        ("squarish", &[(242, 175, 155, 129)]),
        ("blank", &[]),
        ("two_cards", &[(40, 40, 178, 112), (400, 300, 178, 112)]),
    ];

    let detector = CardDetector::new(DetectorConfig::default())?;

    for (name, cards) in frames {
        let frame = RgbaImage::from_fn(640, 480, |x, y| {
            let inside = cards
                .iter()
                .any(|&(cx, cy, w, h)| (cx..cx + w).contains(&x) && (cy..cy + h).contains(&y));
            if inside {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        frame.save(out_dir.join(format!("{}.png", name)))?;

        let detection = detector.detect(&frame)?;
        println!(
            "{}: {} contours, {} card(s)",
            name,
            detection.diagnostics.contours_found,
            detection.len()
        );

        detector
            .process(&frame)?
            .save(out_dir.join(format!("{}_annotated.png", name)))?;
    }

    println!("Frames written to {}", out_dir.display());
    Ok(())
}
