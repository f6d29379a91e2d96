//! Per-pixel comparison between a capture and its baseline

use image::{Pixel, Rgba, RgbaImage};

use crate::error::{CheckError, CheckResult};

/// Options for a single comparison.
#[derive(Debug, Clone, Copy)]
pub struct CompareOptions {
    /// Per-channel difference absorbed before a pixel counts as differing.
    /// 0 means exact comparison.
    pub channel_tolerance: u8,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self { channel_tolerance: 0 }
    }
}

/// Outcome of comparing two same-sized images.
#[derive(Debug)]
pub struct PixelDiff {
    /// Fraction of pixels that differ, 0.0 - 1.0
    pub diff_ratio: f64,

    /// Number of differing pixels
    pub diff_pixels: u64,

    /// Total pixels compared
    pub total_pixels: u64,

    /// Differing pixels marked red over a dimmed copy of the capture;
    /// `None` when the images are identical
    pub diff_image: Option<RgbaImage>,
}

impl PixelDiff {
    /// Whether this diff passes at the given tolerance.
    pub fn passes(&self, tolerance: f64) -> bool {
        self.diff_ratio <= tolerance
    }
}

/// Compare a capture against a baseline pixel-by-pixel.
///
/// Dimensions must match exactly; a mismatch fails immediately with no
/// partial comparison.
pub fn compare(
    capture: &RgbaImage,
    baseline: &RgbaImage,
    options: CompareOptions,
) -> CheckResult<PixelDiff> {
    if capture.dimensions() != baseline.dimensions() {
        return Err(CheckError::DimensionMismatch {
            capture_width: capture.width(),
            capture_height: capture.height(),
            baseline_width: baseline.width(),
            baseline_height: baseline.height(),
        });
    }

    let (width, height) = capture.dimensions();
    let total_pixels = u64::from(width) * u64::from(height);

    let mut diff_image = RgbaImage::new(width, height);
    let mut diff_pixels = 0u64;

    for y in 0..height {
        for x in 0..width {
            let actual = capture.get_pixel(x, y);
            let expected = baseline.get_pixel(x, y);

            if pixels_differ(actual, expected, options.channel_tolerance) {
                diff_pixels += 1;
                diff_image.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            } else {
                // Keep the original but dim it
                let channels = actual.channels();
                diff_image.put_pixel(
                    x,
                    y,
                    Rgba([channels[0] / 2, channels[1] / 2, channels[2] / 2, 128]),
                );
            }
        }
    }

    let diff_ratio = if total_pixels == 0 {
        0.0
    } else {
        diff_pixels as f64 / total_pixels as f64
    };

    Ok(PixelDiff {
        diff_ratio,
        diff_pixels,
        total_pixels,
        diff_image: (diff_pixels > 0).then_some(diff_image),
    })
}

/// Whether two pixels differ beyond the per-channel tolerance.
fn pixels_differ(a: &Rgba<u8>, b: &Rgba<u8>, channel_tolerance: u8) -> bool {
    let a = a.channels();
    let b = b.channels();

    (0..4).any(|i| (i32::from(a[i]) - i32::from(b[i])).abs() > i32::from(channel_tolerance))
}
