use image::{GrayImage, RgbaImage};
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use imageproc::stats::histogram;
use tracing::debug;

use crate::config::{DetectorConfig, EdgeThresholds};
use crate::error::{DetectError, Result};

/// Dynamic Canny thresholds never drop below this, so a black frame does
/// not turn every pixel into an edge.
const MIN_DYNAMIC_THRESHOLD: f32 = 1.0;

/// Every intermediate buffer of [`preprocess_stages`], for debugging.
pub struct PreprocessStages {
    pub gray: GrayImage,
    pub blurred: GrayImage,
    pub enhanced: GrayImage,
    pub thresholded: GrayImage,
    pub edges: GrayImage,
    pub edge_thresholds: (f32, f32),
}

/// Convert image to grayscale
pub fn to_grayscale(frame: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(frame)
}

/// Sigma used for a Gaussian kernel of the given size when none is given.
pub fn gaussian_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel of odd length `kernel_size`.
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let sigma = gaussian_sigma(kernel_size);
    let half = (kernel_size / 2) as i32;
    let weights: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, kernel_size: u32) -> GrayImage {
    separable_filter_equal(img, &gaussian_kernel(kernel_size))
}

/// Contrast-limited adaptive histogram equalization.
///
/// The frame is split into `tile_grid` x `tile_grid` tiles, each tile gets
/// its own clipped equalization table, and every pixel is mapped through a
/// bilinear blend of the four nearest tile tables.
pub fn clahe(img: &GrayImage, clip_limit: f32, tile_grid: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tile_w = width.div_ceil(tile_grid.clamp(1, width));
    let tile_h = height.div_ceil(tile_grid.clamp(1, height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let w = tile_w.min(width - x0);
            let h = tile_h.min(height - y0);
            let tile = image::imageops::crop_imm(img, x0, y0, w, h).to_image();
            let hist = histogram(&tile).channels[0];
            luts.push(clipped_lut(hist, w * h, clip_limit));
        }
    }
    let lut = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let value = img.get_pixel(x, y).0[0] as usize;

        let txf = x as f32 / tile_w as f32 - 0.5;
        let tyf = y as f32 / tile_h as f32 - 0.5;
        let tx1f = txf.floor();
        let ty1f = tyf.floor();
        let xa = txf - tx1f;
        let ya = tyf - ty1f;

        let tx1 = (tx1f.max(0.0) as u32).min(tiles_x - 1);
        let ty1 = (ty1f.max(0.0) as u32).min(tiles_y - 1);
        let tx2 = ((tx1f + 1.0).max(0.0) as u32).min(tiles_x - 1);
        let ty2 = ((ty1f + 1.0).max(0.0) as u32).min(tiles_y - 1);

        let top = lut(tx1, ty1)[value] as f32 * (1.0 - xa) + lut(tx2, ty1)[value] as f32 * xa;
        let bottom = lut(tx1, ty2)[value] as f32 * (1.0 - xa) + lut(tx2, ty2)[value] as f32 * xa;
        let blended = top * (1.0 - ya) + bottom * ya;
        pixel.0[0] = blended.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Clip a tile histogram, spread the excess over all bins and turn the
/// result into an equalization table.
fn clipped_lut(mut hist: [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / 256;
    let residual = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; 256];
    let mut sum = 0u32;
    for (entry, bin) in lut.iter_mut().zip(hist.iter()) {
        sum += bin;
        *entry = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Global histogram equalization.
///
/// The darkest level present maps to 0 and the brightest to 255. A frame
/// with a single grey level is returned unchanged.
pub fn equalize_histogram(img: &GrayImage) -> GrayImage {
    let hist = histogram(img).channels[0];
    let total: u32 = hist.iter().sum();

    let Some(first) = hist.iter().position(|&count| count > 0) else {
        return img.clone();
    };
    if hist[first] == total {
        return img.clone();
    }

    let scale = 255.0 / (total - hist[first]) as f32;
    let mut lut = [0u8; 256];
    let mut sum = 0u32;
    for level in first + 1..256 {
        sum += hist[level];
        lut[level] = (sum as f32 * scale).round().min(255.0) as u8;
    }

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
    out
}

/// Binarize against a Gaussian-weighted local mean.
///
/// A pixel becomes 255 when it is brighter than the mean of its
/// `block_size` x `block_size` neighbourhood minus `c`, and 0 otherwise.
pub fn adaptive_threshold_gaussian(img: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let local_mean = separable_filter_equal(img, &gaussian_kernel(block_size));

    let mut out = GrayImage::new(img.width(), img.height());
    for ((dst, src), mean) in out.pixels_mut().zip(img.pixels()).zip(local_mean.pixels()) {
        dst.0[0] = if f32::from(src.0[0]) > f32::from(mean.0[0]) - c {
            255
        } else {
            0
        };
    }
    out
}

/// Mean and population standard deviation of the grey levels.
pub fn mean_std_dev(img: &GrayImage) -> (f64, f64) {
    let hist = histogram(img).channels[0];
    let total: f64 = hist.iter().map(|&c| c as f64).sum();
    if total == 0.0 {
        return (0.0, 0.0);
    }
    let mean = hist
        .iter()
        .enumerate()
        .map(|(level, &c)| level as f64 * c as f64)
        .sum::<f64>()
        / total;
    let variance = hist
        .iter()
        .enumerate()
        .map(|(level, &c)| (level as f64 - mean).powi(2) * c as f64)
        .sum::<f64>()
        / total;
    (mean, variance.sqrt())
}

/// Resolve the hysteresis thresholds for this frame.
pub fn edge_thresholds(strategy: EdgeThresholds, enhanced: &GrayImage) -> (f32, f32) {
    match strategy {
        EdgeThresholds::Fixed { low, high } => (low, high),
        EdgeThresholds::Dynamic {
            low_factor,
            high_factor,
        } => {
            let (mean, std_dev) = mean_std_dev(enhanced);
            debug!(mean, std_dev, "Frame brightness statistics");
            let low = (low_factor * mean as f32).max(MIN_DYNAMIC_THRESHOLD);
            let high = (high_factor * mean as f32).max(MIN_DYNAMIC_THRESHOLD);
            (low, high)
        }
    }
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Run every preprocessing stage and keep all intermediate buffers.
pub fn preprocess_stages(frame: &RgbaImage, config: &DetectorConfig) -> Result<PreprocessStages> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectError::EmptyFrame { width, height });
    }

    let gray = to_grayscale(frame);
    let blurred = apply_blur(&gray, config.blur_kernel_size);
    let enhanced = equalize_histogram(&clahe(
        &blurred,
        config.clahe_clip_limit,
        config.clahe_tile_grid,
    ));
    let thresholded =
        adaptive_threshold_gaussian(&enhanced, config.threshold_block_size, config.threshold_c);
    let (low, high) = edge_thresholds(config.edge_thresholds, &enhanced);
    debug!(low, high, "Canny thresholds");
    let edges = detect_edges(&thresholded, low, high);

    Ok(PreprocessStages {
        gray,
        blurred,
        enhanced,
        thresholded,
        edges,
        edge_thresholds: (low, high),
    })
}

/// Turn a color frame into a binary edge map of the same size.
///
/// Runs exactly the stages [`preprocess_stages`] records; every other
/// buffer is dropped before this returns.
pub fn preprocess_frame(frame: &RgbaImage, config: &DetectorConfig) -> Result<GrayImage> {
    Ok(preprocess_stages(frame, config)?.edges)
}
