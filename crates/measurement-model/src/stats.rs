//! Order statistics over brightness samples.
//!
//! All reductions are total: empty input yields `0.0`. Only [`percentile`]
//! can fail, and only for an out-of-range rank.

/// Errors from statistics helpers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    #[error("percentile must be within [0, 100], got {0}")]
    PercentileOutOfRange(f64),
}

/// Arithmetic mean, `0.0` for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; the mean of the two middle elements for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted_copy(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Percentile `p` in `[0, 100]` using linear interpolation between the
/// order statistics around rank `p / 100 * (n - 1)`.
pub fn percentile(values: &[f64], p: f64) -> Result<f64, StatsError> {
    if !(0.0..=100.0).contains(&p) {
        return Err(StatsError::PercentileOutOfRange(p));
    }
    if values.is_empty() {
        return Ok(0.0);
    }

    let sorted = sorted_copy(values);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Ok(sorted[lower]);
    }
    let fraction = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Population standard deviation, `0.0` for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Largest value, `0.0` for empty input.
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

/// Smallest value, `0.0` for empty input.
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_median_of_event_plateau() {
        assert_eq!(median(&[20.0, 80.0, 80.0, 100.0, 100.0, 80.0, 20.0]), 80.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0];
        // rank = 0.25 * 3 = 0.75
        assert!((percentile(&values, 25.0).unwrap() - 17.5).abs() < 1e-12);
        assert_eq!(percentile(&values, 0.0).unwrap(), 10.0);
        assert_eq!(percentile(&values, 100.0).unwrap(), 40.0);
    }

    #[test]
    fn test_percentile_rejects_out_of_range() {
        assert_eq!(
            percentile(&[1.0], 100.5),
            Err(StatsError::PercentileOutOfRange(100.5))
        );
        assert!(percentile(&[1.0], -1.0).is_err());
        assert!(percentile(&[1.0], f64::NAN).is_err());
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 50.0).unwrap(), 0.0);
    }

    #[test]
    fn test_std_dev_population() {
        // mean 5, squared deviations sum to 32 over 8 values
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&values) - 2.0).abs() < 1e-12);
        assert_eq!(std_dev(&[42.0]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_min_max_mean_empty() {
        assert_eq!(max(&[]), 0.0);
        assert_eq!(min(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(max(&[1.0, 9.0, 3.0]), 9.0);
        assert_eq!(min(&[4.0, 9.0, 3.0]), 3.0);
    }

    fn brightness_values() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.0f64..=255.0, 1..64)
    }

    proptest! {
        #[test]
        fn prop_percentile_endpoints(values in brightness_values()) {
            prop_assert!((percentile(&values, 50.0).unwrap() - median(&values)).abs() < 1e-9);
            prop_assert_eq!(percentile(&values, 0.0).unwrap(), min(&values));
            prop_assert_eq!(percentile(&values, 100.0).unwrap(), max(&values));
        }

        #[test]
        fn prop_percentile_within_bounds(values in brightness_values(), p in 0.0f64..=100.0) {
            let value = percentile(&values, p).unwrap();
            prop_assert!(value >= min(&values) && value <= max(&values));
        }

        #[test]
        fn prop_std_dev_of_constant_is_zero(value in 0.0f64..=255.0, n in 0usize..50) {
            prop_assert_eq!(std_dev(&vec![value; n]), 0.0);
        }

        #[test]
        fn prop_std_dev_order_invariant(values in brightness_values()) {
            let mut reversed = values.clone();
            reversed.reverse();
            let mut sorted = values.clone();
            sorted.sort_by(f64::total_cmp);

            let reference = std_dev(&values);
            prop_assert!((std_dev(&reversed) - reference).abs() < 1e-9);
            prop_assert!((std_dev(&sorted) - reference).abs() < 1e-9);
        }
    }
}
