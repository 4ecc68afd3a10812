//! Image quality analysis for BurstCull
//!
//! Scores a decoded preview on two axes that matter when picking a keeper out
//! of a burst: focus (variance of the Laplacian) and exposure (histogram
//! clipping). Sharpness is unbounded and only comparable after per-burst
//! normalization; exposure is already in `[0, 1]`.

use anyhow::{bail, Result};
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// Raw scorer output for one photo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Edge-energy variance, unbounded and non-negative
    pub sharpness: f64,
    /// Clipping penalty score in `[0, 1]`
    pub exposure: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct QualityScorer {
    center_weight: f64,
}

impl QualityScorer {
    /// `center_weight` above 1.0 favours sharpness in the middle of the frame.
    pub fn new(center_weight: f64) -> Self {
        Self { center_weight }
    }

    pub fn center_weight(&self) -> f64 {
        self.center_weight
    }

    /// Score one decoded preview.
    ///
    /// Safe to call from many threads at once; the scorer holds no mutable state.
    pub fn score(&self, image: &DynamicImage) -> Result<QualityScore> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            bail!("Cannot score an empty {}x{} preview", width, height);
        }

        let luma = algorithms::to_luma_601(image);
        Ok(QualityScore {
            sharpness: algorithms::calculate_laplacian_sharpness(&luma, self.center_weight),
            exposure: algorithms::analyze_exposure_histogram(&luma),
        })
    }
}

/// Photography-specific quality metrics over single-channel luminance
pub mod algorithms {
    use image::{DynamicImage, GrayImage, Luma};

    /// First intensity counted as blown highlight
    pub const HIGHLIGHT_CLIP_LEVEL: usize = 250;
    /// Last intensity counted as crushed shadow
    pub const SHADOW_CRUSH_LEVEL: usize = 4;
    pub const HIGHLIGHT_PENALTY: f64 = 5.0;
    pub const SHADOW_PENALTY: f64 = 2.0;

    /// Greyscale with ITU-R 601 weights (`0.299 R + 0.587 G + 0.114 B`),
    /// in 16-bit fixed point rounded to nearest.
    pub fn to_luma_601(image: &DynamicImage) -> GrayImage {
        if let DynamicImage::ImageLuma8(gray) = image {
            return gray.clone();
        }
        let rgb = image.to_rgb8();
        GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            let luma = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
            Luma([luma as u8])
        })
    }

    /// Per-pixel response of the 4-neighbour Laplacian kernel
    /// `[0 1 0; 1 -4 1; 0 1 0]`, same size as the input.
    #[derive(Debug, Clone)]
    pub struct EdgeMap {
        pub width: usize,
        pub height: usize,
        pub values: Vec<f64>,
    }

    impl EdgeMap {
        /// Population variance of the whole map
        pub fn variance(&self) -> f64 {
            variance(self.values.iter().copied())
        }

        /// Population variance of the half-open rectangle `[x0, x1) x [y0, y1)`.
        /// An empty rectangle has variance 0.
        pub fn region_variance(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
            let x1 = x1.min(self.width);
            let y1 = y1.min(self.height);
            if x0 >= x1 || y0 >= y1 {
                return 0.0;
            }
            let rows = (y0..y1).flat_map(|y| {
                let row = y * self.width;
                self.values[row + x0..row + x1].iter().copied()
            });
            variance(rows)
        }
    }

    fn variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
        let (count, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
        if count == 0 {
            return 0.0;
        }
        let mean = sum / count as f64;
        values.map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64
    }

    /// Mirror an out-of-range neighbour index back inside `[0, n)` without
    /// repeating the edge pixel (`-1 -> 1`, `n -> n - 2`).
    fn reflect_101(index: isize, n: usize) -> usize {
        if n == 1 {
            return 0;
        }
        let n = n as isize;
        let reflected = if index < 0 {
            -index
        } else if index >= n {
            2 * n - 2 - index
        } else {
            index
        };
        reflected as usize
    }

    pub fn laplacian(image: &GrayImage) -> EdgeMap {
        let (w, h) = image.dimensions();
        let (width, height) = (w as usize, h as usize);
        let pixels = image.as_raw();
        let at = |x: usize, y: usize| pixels[y * width + x] as f64;

        let mut values = Vec::with_capacity(width * height);
        for y in 0..height {
            let up = reflect_101(y as isize - 1, height);
            let down = reflect_101(y as isize + 1, height);
            for x in 0..width {
                let left = reflect_101(x as isize - 1, width);
                let right = reflect_101(x as isize + 1, width);
                let response = at(x, up) + at(x, down) + at(left, y) + at(right, y) - 4.0 * at(x, y);
                values.push(response);
            }
        }

        EdgeMap { width, height, values }
    }

    /// Calculate sharpness using the Laplacian variance method.
    ///
    /// With `center_weight > 1.0` the variance of the central region (middle
    /// half of each dimension) is blended in:
    /// `(center * weight + whole) / (weight + 1)`.
    pub fn calculate_laplacian_sharpness(image: &GrayImage, center_weight: f64) -> f64 {
        let edges = laplacian(image);
        let whole_variance = edges.variance();
        if center_weight <= 1.0 {
            return whole_variance;
        }

        let (cx, cy) = (edges.width / 2, edges.height / 2);
        let (half_w, half_h) = (edges.width / 2, edges.height / 2);
        let center_variance = edges.region_variance(
            cx - half_w / 2,
            cy - half_h / 2,
            cx + half_w / 2,
            cy + half_h / 2,
        );

        (center_variance * center_weight + whole_variance) / (center_weight + 1.0)
    }

    /// 256-bin intensity histogram
    pub fn luminance_histogram(image: &GrayImage) -> [u64; 256] {
        let mut histogram = [0u64; 256];
        for &value in image.as_raw() {
            histogram[value as usize] += 1;
        }
        histogram
    }

    /// Analyze exposure quality from the histogram.
    ///
    /// Starts at 1.0 and subtracts five times the fraction of pixels at
    /// 250..=255 and twice the fraction at 0..=4, floored at 0.0. Blown
    /// highlights cannot be recovered in post, crushed shadows often can.
    pub fn analyze_exposure_histogram(image: &GrayImage) -> f64 {
        let histogram = luminance_histogram(image);
        let total: u64 = histogram.iter().sum();
        if total == 0 {
            return 0.0;
        }

        let highlights_clipped = histogram[HIGHLIGHT_CLIP_LEVEL..].iter().sum::<u64>() as f64 / total as f64;
        let shadows_crushed = histogram[..=SHADOW_CRUSH_LEVEL].iter().sum::<u64>() as f64 / total as f64;

        let score = 1.0 - HIGHLIGHT_PENALTY * highlights_clipped - SHADOW_PENALTY * shadows_crushed;
        score.max(0.0)
    }
}
