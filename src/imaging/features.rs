//! Scalar image statistics computed from a [`NormalizedArray`].
//!
//! Every feature is a pure function of the array. `brain_area_ratio` degrades
//! to `0.0` whenever no meaningful foreground can be segmented.

use serde::{Deserialize, Serialize};

use super::contours::{contour_area, find_external_contours, BinaryMask};
use super::normalize::NormalizedArray;
use super::threshold::{binarize, otsu_threshold};

/// Histogram resolution for the entropy feature.
const ENTROPY_BINS: usize = 256;

/// Added to the histogram total and to each log argument.
const ENTROPY_EPSILON: f64 = 1e-10;

/// Fixed set of image features. Serializes as a JSON object in field order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub mean_intensity: f64,
    pub std_intensity: f64,
    pub contrast: f64,
    pub entropy: f64,
    pub brain_area_ratio: f64,
}

impl FeatureSet {
    /// Feature names and values in canonical order.
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("mean_intensity", self.mean_intensity),
            ("std_intensity", self.std_intensity),
            ("contrast", self.contrast),
            ("entropy", self.entropy),
            ("brain_area_ratio", self.brain_area_ratio),
        ]
    }
}

/// Compute all features of a normalized array.
pub fn extract(array: &NormalizedArray) -> FeatureSet {
    let values = array.values();
    let (mean, std) = mean_and_std(values);

    FeatureSet {
        mean_intensity: finite_or_zero(mean),
        std_intensity: finite_or_zero(std),
        contrast: finite_or_zero(contrast(values)),
        entropy: finite_or_zero(entropy(values)),
        brain_area_ratio: finite_or_zero(brain_area_ratio(array)),
    }
}

/// Arithmetic mean and population standard deviation (two-pass).
fn mean_and_std(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

/// Max minus min.
fn contrast(values: &[f32]) -> f64 {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if values.is_empty() {
        0.0
    } else {
        (max - min) as f64
    }
}

/// Shannon entropy (base 2) of a 256-bin histogram over [0, 1].
///
/// The epsilon terms make a single-valued image evaluate to a tiny negative
/// number, so the result is clamped at zero.
pub fn entropy(values: &[f32]) -> f64 {
    let mut histogram = [0u64; ENTROPY_BINS];
    for &v in values {
        let bin = ((v as f64) * ENTROPY_BINS as f64).floor();
        let bin = (bin.max(0.0) as usize).min(ENTROPY_BINS - 1);
        histogram[bin] += 1;
    }

    let total = histogram.iter().sum::<u64>() as f64 + ENTROPY_EPSILON;
    let h: f64 = histogram
        .iter()
        .map(|&count| {
            let p = count as f64 / total;
            p * (p + ENTROPY_EPSILON).log2()
        })
        .sum();

    (-h).max(0.0)
}

/// Area of the largest external contour of the Otsu foreground, as a
/// fraction of the image area. `0.0` when segmentation is not possible.
pub fn brain_area_ratio(array: &NormalizedArray) -> f64 {
    let total = array.len() as f64;
    if total == 0.0 {
        return 0.0;
    }

    let bytes = array.to_u8();
    let Some(threshold) = otsu_threshold(&bytes) else {
        return 0.0;
    };
    let mask = binarize(&bytes, threshold);
    let Some(view) = BinaryMask::new(array.width(), array.height(), &mask) else {
        return 0.0;
    };

    let largest = find_external_contours(&view)
        .iter()
        .map(|c| contour_area(c))
        .fold(0.0f64, f64::max);

    (largest / total).clamp(0.0, 1.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
