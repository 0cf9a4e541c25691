//! Descriptive statistics over `f64` samples.

/// Arithmetic mean. Empty input yields 0.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (denominator n - 1). Fewer than two values yields 0.
pub(crate) fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64
}

pub(crate) fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Sort ascending; NaNs compare equal so they never panic the sort.
pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v
}

/// Quantile `q` in [0,1] of a **sorted** slice using linear interpolation
/// between order statistics.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Population moments of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Moments {
    pub mean: f64,
    pub std_dev: f64,
    pub skewness: f64,
    /// Raw fourth standardized moment (normal = 3).
    pub kurtosis: f64,
}

/// Mean, population standard deviation, skewness and raw kurtosis.
/// A degenerate (zero-spread) sample reports skewness 0 and kurtosis 0.
pub(crate) fn moments(values: &[f64]) -> Moments {
    let n = values.len() as f64;
    let m = mean(values);
    if values.is_empty() {
        return Moments {
            mean: 0.0,
            std_dev: 0.0,
            skewness: 0.0,
            kurtosis: 0.0,
        };
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev <= f64::EPSILON * m.abs().max(1.0) {
        return Moments {
            mean: m,
            std_dev,
            skewness: 0.0,
            kurtosis: 0.0,
        };
    }

    let (m3, m4) = values.iter().fold((0.0, 0.0), |(s3, s4), v| {
        let z = (v - m) / std_dev;
        let z2 = z * z;
        (s3 + z2 * z, s4 + z2 * z2)
    });

    Moments {
        mean: m,
        std_dev,
        skewness: m3 / n,
        kurtosis: m4 / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_variance() {
        // 2,4,4,4,5,5,7,9: mean 5, sum sq dev 32
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((sample_variance(&v) - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(sample_variance(&[1.0]), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&s, 0.0), 1.0);
        assert_eq!(quantile_sorted(&s, 1.0), 5.0);
        assert_eq!(quantile_sorted(&s, 0.5), 3.0);
        // rank = 0.05 * 4 = 0.2 -> 1.2
        assert!((quantile_sorted(&s, 0.05) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_moments_symmetric_sample() {
        let v = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let m = moments(&v);
        assert_eq!(m.mean, 0.0);
        assert!(m.skewness.abs() < 1e-12);
        // population variance 2, fourth moment (16+1+0+1+16)/5 = 6.8, /4 = 1.7
        assert!((m.kurtosis - 1.7).abs() < 1e-12);
    }

    #[test]
    fn test_moments_degenerate() {
        let m = moments(&[0.05; 10]);
        assert!(m.std_dev < 1e-15);
        assert_eq!(m.skewness, 0.0);
        assert_eq!(m.kurtosis, 0.0);
    }
}
