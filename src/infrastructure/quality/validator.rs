//! Post-generation artifact checks
//!
//! Checks run in a fixed order and stop at the first failure: file size,
//! container format, dimensions, full decode, then the luma statistics
//! (brightness, contrast, sharpness). Statistics are computed on a copy
//! downsampled to at most `analysis_max_side` pixels per side.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, ImageReader};
use tracing::{debug, warn};

use crate::domain::quality::{QualityConfig, QualityMetrics, QualityReport};

/// Maximum Sobel magnitude for unit-range input: |gx| and |gy| both reach 4
const MAX_SOBEL_MAGNITUDE: f64 = 5.656_854_249_492_381;

/// Contrast (luma std-dev) at which the contrast sub-score saturates
const CONTRAST_SATURATION: f64 = 0.25;

/// Sharpness at which the sharpness sub-score saturates
const SHARPNESS_SATURATION: f64 = 0.05;

/// Validates generated artifacts and scores them between 0 and 1
#[derive(Debug, Clone, Default)]
pub struct QualityValidator {
    config: QualityConfig,
}

impl QualityValidator {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Inspect the artifact at `path` on the blocking pool
    pub async fn validate(&self, path: &Path) -> QualityReport {
        let config = self.config.clone();
        let owned: PathBuf = path.to_path_buf();

        let report = match tokio::task::spawn_blocking(move || analyze(&config, &owned)).await {
            Ok(report) => report,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Quality analysis task failed");
                QualityReport::rejected(format!("quality analysis failed: {}", e))
            }
        };

        debug!(
            path = %path.display(),
            valid = report.valid,
            score = report.score,
            reason = report.reason.as_deref().unwrap_or(""),
            "Artifact validated"
        );

        report
    }
}

fn format_name(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpeg"),
        ImageFormat::WebP => Some("webp"),
        _ => None,
    }
}

fn analyze(config: &QualityConfig, path: &Path) -> QualityReport {
    let unreadable = |e: std::io::Error| {
        QualityReport::rejected(format!("artifact {} unreadable: {}", path.display(), e))
    };

    // Size is checked before the file is loaded
    let file_size = match std::fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) => return unreadable(e),
    };

    if file_size < config.min_bytes || file_size > config.max_bytes {
        return QualityReport::rejected(format!(
            "file size {} bytes outside [{}, {}]",
            file_size, config.min_bytes, config.max_bytes
        ));
    }

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return unreadable(e),
    };

    let format = match image::guess_format(&bytes).ok().and_then(|f| format_name(f).map(|n| (f, n))) {
        Some(found) => found,
        None => return QualityReport::rejected("unrecognized image format"),
    };

    let dimensions = ImageReader::with_format(Cursor::new(&bytes), format.0).into_dimensions();
    let (width, height) = match dimensions {
        Ok(dimensions) => dimensions,
        Err(e) => return QualityReport::rejected(format!("unreadable image header: {}", e)),
    };

    if width < config.min_dimension || height < config.min_dimension {
        return QualityReport::rejected(format!(
            "image dimensions {}x{} below minimum {}",
            width, height, config.min_dimension
        ));
    }

    let decoded = match image::load_from_memory_with_format(&bytes, format.0) {
        Ok(decoded) => decoded,
        Err(e) => return QualityReport::rejected(format!("image decode failed: {}", e)),
    };

    let luma = downsample(decoded, config.analysis_max_side);
    let (brightness, contrast) = luma_stats(&luma);
    let sharpness = sobel_sharpness(&luma);

    let metrics = QualityMetrics {
        width,
        height,
        format: format.1.to_string(),
        file_size,
        brightness,
        contrast,
        sharpness,
    };

    let score = (brightness_score(brightness)
        + (contrast / CONTRAST_SATURATION).clamp(0.0, 1.0)
        + (sharpness / SHARPNESS_SATURATION).clamp(0.0, 1.0))
        / 3.0;

    if brightness < config.min_brightness {
        return QualityReport::below_floor(
            format!("brightness {:.3} below minimum {}", brightness, config.min_brightness),
            metrics,
            score,
        );
    }
    if contrast < config.min_contrast {
        return QualityReport::below_floor(
            format!("contrast {:.3} below minimum {}", contrast, config.min_contrast),
            metrics,
            score,
        );
    }
    if sharpness < config.min_sharpness {
        return QualityReport::below_floor(
            format!("sharpness {:.3} below minimum {}", sharpness, config.min_sharpness),
            metrics,
            score,
        );
    }

    QualityReport::passed(metrics, score)
}

fn downsample(image: DynamicImage, max_side: u32) -> GrayImage {
    if image.width().max(image.height()) > max_side {
        image.thumbnail(max_side, max_side).to_luma8()
    } else {
        image.to_luma8()
    }
}

/// Mid-grey scores best; pure black or white scores 0.25
fn brightness_score(brightness: f64) -> f64 {
    (1.0 - (brightness - 0.5).abs() * 1.5).clamp(0.0, 1.0)
}

/// Mean and standard deviation of luma, both in [0, 1]
fn luma_stats(luma: &GrayImage) -> (f64, f64) {
    let count = (luma.width() as f64) * (luma.height() as f64);
    if count == 0.0 {
        return (0.0, 0.0);
    }

    let (sum, sum_sq) = luma.pixels().fold((0.0, 0.0), |(sum, sum_sq), p| {
        let v = f64::from(p.0[0]) / 255.0;
        (sum + v, sum_sq + v * v)
    });

    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// Mean Sobel gradient magnitude over interior pixels, normalised to [0, 1]
fn sobel_sharpness(luma: &GrayImage) -> f64 {
    let (width, height) = luma.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let at = |x: u32, y: u32| f64::from(luma.get_pixel(x, y).0[0]) / 255.0;
    let mut total = 0.0;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            total += (gx * gx + gy * gy).sqrt() / MAX_SOBEL_MAGNITUDE;
        }
    }

    let interior = f64::from(width - 2) * f64::from(height - 2);
    (total / interior).clamp(0.0, 1.0)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    /// Deterministic pseudo-random bytes so fixtures never compress away
    pub fn noise(seed: u32) -> impl FnMut() -> u8 {
        let mut state = seed;
        move || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        }
    }

    /// Checkerboard with mild noise: passes every check
    pub fn checker(width: u32, height: u32) -> GrayImage {
        let mut next = noise(7);
        GrayImage::from_fn(width, height, |x, y| {
            let base: i16 = if ((x / 16) + (y / 16)) % 2 == 0 { 50 } else { 205 };
            let jitter = i16::from(next() % 41) - 20;
            Luma([(base + jitter).clamp(0, 255) as u8])
        })
    }

    /// Image whose luma sits in `[low, low + spread)`
    pub fn band(width: u32, height: u32, low: u8, spread: u8) -> GrayImage {
        let mut next = noise(11);
        GrayImage::from_fn(width, height, |_, _| Luma([low.saturating_add(next() % spread.max(1))]))
    }

    pub fn png_bytes(image: &GrayImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    pub fn write_png(dir: &Path, name: &str, image: &GrayImage) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, png_bytes(image)).unwrap();
        path
    }
}
