//! Outlier handling for numeric columns.
//!
//! Bounds are always computed from the column as it is when the step runs.

use super::stats;
use crate::plan::OutlierFill;
use polars::prelude::*;
use tracing::debug;

/// Lower quantile used when `clip_outliers` has no explicit lower bound.
pub const DEFAULT_LOWER_QUANTILE: f64 = 0.01;
/// Upper quantile used when `clip_outliers` has no explicit upper bound.
pub const DEFAULT_UPPER_QUANTILE: f64 = 0.99;

/// IQR fence multiplier.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Clamp every present value into `[lower, upper]`.
///
/// Missing bounds fall back to the 1st/99th percentile of the column.
pub fn clip(name: PlSmallStr, values: &[Option<f64>], lower: Option<f64>, upper: Option<f64>) -> Series {
    let sorted = stats::sorted_present(values);
    let lower = lower
        .or_else(|| stats::quantile_sorted(&sorted, DEFAULT_LOWER_QUANTILE))
        .unwrap_or(f64::NAN);
    let upper = upper
        .or_else(|| stats::quantile_sorted(&sorted, DEFAULT_UPPER_QUANTILE))
        .unwrap_or(f64::NAN);

    let clipped_count = values
        .iter()
        .flatten()
        .filter(|v| **v < lower || **v > upper)
        .count();
    debug!(
        "Clipping {} values of '{}' into [{}, {}]",
        clipped_count, name, lower, upper
    );

    // f64::max/min keep the value when a bound is NaN.
    let clipped: Vec<Option<f64>> = values
        .iter()
        .map(|v| v.map(|x| x.max(lower).min(upper)))
        .collect();
    Series::new(name, clipped)
}

/// The `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` fence of the present values.
pub fn iqr_fence(values: &[Option<f64>]) -> Option<(f64, f64)> {
    let sorted = stats::sorted_present(values);
    let q1 = stats::quantile_sorted(&sorted, 0.25)?;
    let q3 = stats::quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - IQR_MULTIPLIER * iqr, q3 + IQR_MULTIPLIER * iqr))
}

/// Replace values outside the IQR fence with the column median or mean.
///
/// The replacement statistic is computed over all present values, outliers included.
pub fn fill(name: PlSmallStr, values: &[Option<f64>], method: OutlierFill) -> Series {
    let Some((lower, upper)) = iqr_fence(values) else {
        return Series::new(name, values.to_vec());
    };
    let replacement = match method {
        OutlierFill::Median => stats::median(values),
        OutlierFill::Mean => stats::mean(values),
    }
    .unwrap_or(f64::NAN);

    let mut replaced = 0;
    let filled: Vec<Option<f64>> = values
        .iter()
        .map(|v| {
            v.map(|x| {
                if x < lower || x > upper {
                    replaced += 1;
                    replacement
                } else {
                    x
                }
            })
        })
        .collect();

    debug!(
        "Replaced {} outliers of '{}' outside [{}, {}] with {}",
        replaced, name, lower, upper, replacement
    );
    Series::new(name, filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_fill_median() {
        let input = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)];
        let out = fill("x".into(), &input, OutlierFill::Median);
        assert_eq!(values(&out), vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(3.0)]);
    }

    #[test]
    fn test_fill_mean_uses_all_values() {
        let input = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)];
        let out = fill("x".into(), &input, OutlierFill::Mean);
        assert_eq!(values(&out)[4], Some(22.0));
    }

    #[test]
    fn test_fill_keeps_missing() {
        let input = vec![None, Some(1.0), Some(1.0), Some(1.0), Some(50.0)];
        let out = fill("x".into(), &input, OutlierFill::Median);
        assert_eq!(values(&out), vec![None, Some(1.0), Some(1.0), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_clip_explicit_bounds() {
        let input = vec![Some(-5.0), Some(3.0), None, Some(12.0)];
        let out = clip("x".into(), &input, Some(0.0), Some(10.0));
        assert_eq!(values(&out), vec![Some(0.0), Some(3.0), None, Some(10.0)]);
    }

    #[test]
    fn test_clip_default_percentiles() {
        let input: Vec<Option<f64>> = (0..=100).map(|i| Some(i as f64)).collect();
        let out = values(&clip("x".into(), &input, None, None));
        assert_eq!(out[0], Some(1.0));
        assert_eq!(out[100], Some(99.0));
        assert_eq!(out[50], Some(50.0));
    }

    #[test]
    fn test_iqr_fence() {
        let input = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)];
        assert_eq!(iqr_fence(&input), Some((-1.0, 7.0)));
        assert_eq!(iqr_fence(&[None]), None);
    }
}
