use fencing_spatial::fence::FencingObservation;

/// Fencing metric: the share of the observed fraction not explained by density.
///
/// `(real - null_mean) / real` when `real > 0`, and `0.0` otherwise. The value is at
/// most `1.0` and is negative when the real fraction falls below the null mean.
///
/// ```
/// use fencing_analysis::metric::fencing_metric;
///
/// assert!((fencing_metric(0.8, 0.2) - 0.75).abs() < 1e-12);
/// assert_eq!(fencing_metric(0.0, 0.3), 0.0);
/// assert!(fencing_metric(0.2, 0.4) < 0.0);
/// ```
#[must_use]
pub fn fencing_metric(real_fraction: f64, null_mean: f64) -> f64 {
    if real_fraction > 0.0 {
        (real_fraction - null_mean) / real_fraction
    } else {
        0.0
    }
}

/// [`fencing_metric`] of an observation.
#[must_use]
pub fn observation_metric(real: &FencingObservation, null_mean: f64) -> f64 {
    fencing_metric(real.fraction, null_mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_values() {
        assert!((fencing_metric(0.8, 0.2) - 0.75).abs() < 1e-12);
        assert_eq!(fencing_metric(0.5, 0.5), 0.0);
        assert_eq!(fencing_metric(1.0, 0.0), 1.0);
        assert!((fencing_metric(0.25, 1.0) + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_fraction_is_zero() {
        assert_eq!(fencing_metric(0.0, 0.0), 0.0);
        assert_eq!(fencing_metric(0.0, 1.0), 0.0);
        assert_eq!(observation_metric(&FencingObservation::EMPTY, 0.9), 0.0);
    }

    #[test]
    fn test_metric_never_exceeds_one() {
        for real in [0.01, 0.3, 0.7, 1.0] {
            for null in [0.0, 0.2, 0.9] {
                assert!(fencing_metric(real, null) <= 1.0);
            }
        }
    }
}
