//! Properties of the pipeline as a whole.
//!
//! Tests cover:
//! - Same frame and config always give the same outlines
//! - Frames can be processed in any order, from several threads
//! - Configuration bounds are honoured by the orchestrator

mod common;

use std::sync::Arc;
use std::thread;

use common::*;

#[test]
fn test_detection_is_idempotent() -> anyhow::Result<()> {
    let detector = default_detector();
    let frame = card_frame(640, 480, &[ID_CARD, Card::new(20, 20, 160, 100)]);

    let first = detector.detect(&frame)?;
    let second = detector.detect(&frame)?;
    assert_eq!(first.quadrilaterals, second.quadrilaterals);
    assert_eq!(first.diagnostics, second.diagnostics);
    Ok(())
}

#[test]
fn test_frames_are_independent() -> anyhow::Result<()> {
    let detector = default_detector();
    let card = card_frame(640, 480, &[ID_CARD]);
    let blank = card_frame(640, 480, &[]);

    let alone = detector.detect(&card)?;
    detector.detect(&blank)?;
    let _ = detector.process(&image::RgbaImage::new(0, 5));
    let after = detector.detect(&card)?;
    assert_eq!(alone.quadrilaterals, after.quadrilaterals);
    Ok(())
}

#[test]
fn test_detector_is_shareable_across_threads() -> anyhow::Result<()> {
    let detector = Arc::new(default_detector());
    let frame = Arc::new(card_frame(640, 480, &[ID_CARD]));
    let expected = detector.detect(&frame)?.quadrilaterals;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let detector = Arc::clone(&detector);
            let frame = Arc::clone(&frame);
            thread::spawn(move || detector.detect(&frame).map(|d| d.quadrilaterals))
        })
        .collect();

    for handle in handles {
        let quads = handle.join().expect("worker panicked")?;
        assert_eq!(quads, expected);
    }
    Ok(())
}

#[test]
fn test_aspect_bounds_come_from_config() -> anyhow::Result<()> {
    let frame = card_frame(640, 480, &[SQUARISH_CARD]);

    let strict = default_detector().detect(&frame)?;
    assert!(strict.is_empty());
    assert!(strict.diagnostics.rejected_aspect_ratio > 0);

    let relaxed = CardDetector::new(DetectorConfig::default().with_aspect_ratio(1.0, 1.4))?;
    assert_eq!(relaxed.detect(&frame)?.len(), 1);
    Ok(())
}

#[test]
fn test_min_area_comes_from_config() -> anyhow::Result<()> {
    let frame = card_frame(640, 480, &[ID_CARD]);
    let config = DetectorConfig {
        min_area: 25_000.0,
        ..Default::default()
    };
    let detection = CardDetector::new(config)?.detect(&frame)?;
    assert!(detection.is_empty());
    assert!(detection.diagnostics.rejected_area > 0);
    Ok(())
}

#[test]
fn test_duplicate_suppression_can_be_disabled() -> anyhow::Result<()> {
    let frame = card_frame(640, 480, &[ID_CARD]);
    let config = DetectorConfig {
        duplicate_corner_distance: 0.0,
        ..Default::default()
    };
    let all = CardDetector::new(config)?.detect(&frame)?;
    let merged = default_detector().detect(&frame)?;

    assert!(all.len() >= merged.len());
    assert_eq!(all.diagnostics.duplicates_suppressed, 0);
    assert_eq!(
        merged.diagnostics.duplicates_suppressed,
        all.len() - merged.len()
    );
    Ok(())
}
