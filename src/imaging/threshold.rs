//! Global thresholding: Otsu's method and binarization.

/// Foreground value of a binary mask.
pub const MASK_ON: u8 = 255;

/// 256-bin histogram of 8-bit values.
pub fn histogram_u8(values: &[u8]) -> [u64; 256] {
    let mut histogram = [0u64; 256];
    for &v in values {
        histogram[v as usize] += 1;
    }
    histogram
}

/// Otsu threshold: the level `t` maximizing between-class variance, where the
/// background class is every value `<= t`.
///
/// Returns `None` when no split exists (empty input or a single distinct
/// value), since any threshold would be arbitrary.
pub fn otsu_threshold(values: &[u8]) -> Option<u8> {
    let histogram = histogram_u8(values);
    let total = values.len() as u64;
    if total == 0 {
        return None;
    }
    if histogram.iter().filter(|&&count| count > 0).count() < 2 {
        return None;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut weight_bg: u64 = 0;
    let mut sum_bg = 0.0f64;
    let mut max_variance = 0.0f64;
    let mut best = None;

    for (t, &count) in histogram.iter().enumerate() {
        weight_bg += count;
        sum_bg += t as f64 * count as f64;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_total - sum_bg) / weight_fg as f64;
        let diff = mean_bg - mean_fg;
        let variance = weight_bg as f64 * weight_fg as f64 * diff * diff;

        // Strict comparison keeps the lowest level among equal maxima.
        if variance > max_variance {
            max_variance = variance;
            best = Some(t as u8);
        }
    }

    best
}

/// Binary decision rule: `v > threshold` → [`MASK_ON`], else 0.
pub fn binarize(values: &[u8], threshold: u8) -> Vec<u8> {
    values
        .iter()
        .map(|&v| if v > threshold { MASK_ON } else { 0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_every_value() {
        let h = histogram_u8(&[0, 0, 7, 255]);
        assert_eq!(h[0], 2);
        assert_eq!(h[7], 1);
        assert_eq!(h[255], 1);
        assert_eq!(h.iter().sum::<u64>(), 4);
    }

    #[test]
    fn two_level_image_splits_at_lower_level() {
        let mut values = vec![0u8; 100];
        values.extend(vec![255u8; 100]);
        assert_eq!(otsu_threshold(&values), Some(0));
    }

    #[test]
    fn bimodal_split_lands_between_modes() {
        let mut values = Vec::new();
        for v in 20..40u8 {
            values.extend(std::iter::repeat(v).take(50));
        }
        for v in 180..200u8 {
            values.extend(std::iter::repeat(v).take(50));
        }
        let t = otsu_threshold(&values).unwrap();
        assert!((39..180).contains(&t), "threshold {t} outside the gap");
    }

    #[test]
    fn degenerate_inputs_have_no_threshold() {
        assert_eq!(otsu_threshold(&[]), None);
        assert_eq!(otsu_threshold(&[0u8; 64]), None);
        assert_eq!(otsu_threshold(&[255u8; 64]), None);
        assert_eq!(otsu_threshold(&[93u8; 64]), None);
    }

    #[test]
    fn binarize_uses_strict_greater_than() {
        assert_eq!(binarize(&[9, 10, 11], 10), vec![0, 0, MASK_ON]);
    }
}
