//! Descriptive statistics over sample or frame sequences.
//!
//! Standard deviations are population (biased) estimates; skewness and
//! kurtosis are the biased moment estimators, kurtosis in excess (Fisher) form.

use crate::error::FeatureError;

/// Mean and population standard deviation, accumulated in `f64`.
///
/// # Errors
/// Returns [`FeatureError::TooShort`] for an empty slice and
/// [`FeatureError::NonFinite`] if the input contains NaN or infinities.
///
/// # Example
/// ```
/// use vx_audio::stats::mean_std;
/// let (m, s) = mean_std(&[1.0, 3.0]).unwrap();
/// assert!((m - 2.0).abs() < 1e-6 && (s - 1.0).abs() < 1e-6);
/// ```
pub fn mean_std(values: &[f32]) -> Result<(f32, f32), FeatureError> {
    if values.is_empty() {
        return Err(FeatureError::TooShort { needed: 1, got: 0 });
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / n;
    let (mean, std) = (mean as f32, var.sqrt() as f32);
    if !mean.is_finite() || !std.is_finite() {
        return Err(FeatureError::NonFinite("mean/std"));
    }
    Ok((mean, std))
}

/// Skewness and excess kurtosis of the raw signal.
///
/// # Errors
/// Fails on fewer than 4 samples, on zero variance (silence, DC), or on
/// non-finite results.
pub fn skew_kurtosis(values: &[f32]) -> Result<(f32, f32), FeatureError> {
    if values.len() < 4 {
        return Err(FeatureError::TooShort {
            needed: 4,
            got: values.len(),
        });
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

    let (mut m2, mut m3, mut m4) = (0.0f64, 0.0f64, 0.0f64);
    for &v in values {
        let d = f64::from(v) - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;

    if m2 < 1e-20 {
        return Err(FeatureError::Degenerate("zero variance"));
    }

    let skew = (m3 / m2.powf(1.5)) as f32;
    let kurt = (m4 / (m2 * m2) - 3.0) as f32;
    if !skew.is_finite() || !kurt.is_finite() {
        return Err(FeatureError::NonFinite("skewness/kurtosis"));
    }
    Ok((skew, kurt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_signal_has_no_skew() {
        let values: Vec<f32> = (0..1000)
            .map(|i| (i as f32 * 0.01 * std::f32::consts::TAU).sin())
            .collect();
        let (skew, kurt) = skew_kurtosis(&values).expect("moments");
        assert!(skew.abs() < 0.05, "skew {skew}");
        // A pure sine has excess kurtosis of -1.5.
        assert!((kurt + 1.5).abs() < 0.05, "kurt {kurt}");
    }

    #[test]
    fn constant_signal_is_degenerate() {
        assert_eq!(
            skew_kurtosis(&[0.0; 64]),
            Err(FeatureError::Degenerate("zero variance"))
        );
    }

    #[test]
    fn empty_mean_std_fails() {
        assert!(mean_std(&[]).is_err());
        assert!(mean_std(&[f32::NAN]).is_err());
    }
}
