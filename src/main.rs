use clap::Parser;
use image::ImageReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cardscan::detection::preprocessing;
use cardscan::{CardDetector, DetectorConfig, EdgeThresholds};

#[derive(Parser)]
#[command(name = "cardscan")]
#[command(about = "Outline ID-card shaped regions in image frames")]
struct Cli {
    /// Frames to process, in order
    #[arg(value_name = "FRAME", required = true)]
    frames: Vec<PathBuf>,

    /// Directory for annotated frames
    #[arg(short, long, value_name = "DIR", default_value = "annotated")]
    output_dir: PathBuf,

    /// JSON detector configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Derive Canny thresholds from each frame's brightness
    #[arg(long)]
    dynamic_thresholds: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save intermediate preprocessing buffers to directory
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "cardscan=debug" } else { "cardscan=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_json_file(path)?,
        None => DetectorConfig::default(),
    };
    if args.dynamic_thresholds {
        config = config.with_edge_thresholds(EdgeThresholds::dynamic());
    }
    let detector = CardDetector::new(config)?;

    std::fs::create_dir_all(&args.output_dir)?;
    if let Some(debug_dir) = &args.debug_out {
        std::fs::create_dir_all(debug_dir)?;
    }

    let mut annotated = 0usize;
    for (index, path) in args.frames.iter().enumerate() {
        // A bad frame costs one annotation, never the stream
        match process_frame(&detector, path, &args, index) {
            Ok(cards) => {
                annotated += 1;
                info!(frame = %path.display(), cards, "Frame annotated");
            }
            Err(e) => warn!(frame = %path.display(), error = %e, "No annotation this frame"),
        }
    }

    println!(
        "Processed {} frames, {} annotated, output in {}",
        args.frames.len(),
        annotated,
        args.output_dir.display()
    );
    Ok(())
}

fn process_frame(
    detector: &CardDetector,
    path: &Path,
    args: &Cli,
    index: usize,
) -> anyhow::Result<usize> {
    let frame = ImageReader::open(path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?
        .to_rgba8();

    if let Some(debug_dir) = &args.debug_out {
        save_stages(detector, &frame, debug_dir, index)?;
    }

    let detection = detector.detect(&frame)?;
    for (i, quad) in detection.quadrilaterals.iter().enumerate() {
        let corners: Vec<String> = quad
            .ordered_corners()
            .iter()
            .map(|p| format!("({:.0}, {:.0})", p.x, p.y))
            .collect();
        info!(
            card = i + 1,
            area = quad.area,
            aspect_ratio = quad.aspect_ratio().unwrap_or(0.0),
            corners = %corners.join(" "),
            "Card outline"
        );
    }

    let output = cardscan::detection::drawing::annotate(
        &frame,
        &detection.quadrilaterals,
        detector.config().stroke_width,
    );
    let file_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("frame_{:04}", index));
    output
        .save(args.output_dir.join(format!("{}_annotated.png", file_name)))
        .map_err(|e| anyhow::anyhow!("Failed to save annotated frame: {}", e))?;

    Ok(detection.len())
}

fn save_stages(
    detector: &CardDetector,
    frame: &image::RgbaImage,
    debug_dir: &Path,
    index: usize,
) -> anyhow::Result<()> {
    let stages = preprocessing::preprocess_stages(frame, detector.config())?;
    let frame_dir = debug_dir.join(format!("{:04}", index + 1));
    std::fs::create_dir_all(&frame_dir)?;

    for (name, buffer) in [
        ("01_gray", &stages.gray),
        ("02_blurred", &stages.blurred),
        ("03_enhanced", &stages.enhanced),
        ("04_thresholded", &stages.thresholded),
        ("05_edges", &stages.edges),
    ] {
        buffer
            .save(frame_dir.join(format!("{}.png", name)))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }
    info!(
        dir = %frame_dir.display(),
        low = stages.edge_thresholds.0,
        high = stages.edge_thresholds.1,
        "Saved preprocessing stages"
    );
    Ok(())
}
