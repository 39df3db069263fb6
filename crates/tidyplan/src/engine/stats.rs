//! Column statistics over extracted values.
//!
//! All functions skip missing values. Empty input gives `None`.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Present values, sorted ascending.
pub fn sorted_present(values: &[Option<f64>]) -> Vec<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    present
}

pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

pub fn median(values: &[Option<f64>]) -> Option<f64> {
    quantile_sorted(&sorted_present(values), 0.5)
}

/// Sample standard deviation (`n - 1` denominator); NaN for a single value.
pub fn sample_std(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let n = present.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(f64::NAN);
    }
    let mean = present.iter().sum::<f64>() / n as f64;
    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(variance.sqrt())
}

pub fn min(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::min)
}

pub fn max(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::max)
}

/// Quantile of sorted data with linear interpolation between closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let fraction = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Most frequent value; ties go to the smallest.
pub fn mode(values: &[Option<f64>]) -> Option<f64> {
    let sorted = sorted_present(values);
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        let count = j - i;
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((sorted[i], count));
        }
        i = j;
    }
    best.map(|(value, _)| value)
}

/// Most frequent text; ties go to the lexicographically smallest.
pub fn mode_text(values: &[Option<String>]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(value, _)| value.to_string())
}

/// Most frequent text with its count; ties go to the first seen.
pub fn top_text(values: &[Option<String>]) -> Option<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for value in values.iter().flatten() {
        let count = counts.entry(value.as_str()).or_insert(0);
        if *count == 0 {
            order.push(value.as_str());
        }
        *count += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for value in order {
        let count = counts[value];
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, count)| (value.to_string(), count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vals(v: &[f64]) -> Vec<Option<f64>> {
        v.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_mean_median_skip_missing() {
        let values = vec![Some(1.0), None, Some(3.0), Some(8.0)];
        assert_eq!(mean(&values), Some(4.0));
        assert_eq!(median(&values), Some(3.0));
        assert_eq!(mean(&[None, None]), None);
    }

    #[test]
    fn test_sample_std() {
        let std = sample_std(&vals(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])).unwrap();
        assert!((std - 2.138_089_935).abs() < 1e-6);
        assert!(sample_std(&vals(&[5.0])).unwrap().is_nan());
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 100.0];
        assert_eq!(quantile_sorted(&sorted, 0.25), Some(2.0));
        assert_eq!(quantile_sorted(&sorted, 0.75), Some(4.0));
        assert_eq!(quantile_sorted(&[1.0, 2.0], 0.5), Some(1.5));
        let p01 = quantile_sorted(&[0.0, 100.0], 0.01).unwrap();
        assert!((p01 - 1.0).abs() < 1e-9);
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_mode_ties_pick_smallest() {
        assert_eq!(mode(&vals(&[3.0, 1.0, 3.0, 1.0, 2.0])), Some(1.0));
        assert_eq!(mode(&vals(&[5.0, 5.0, 1.0])), Some(5.0));
        assert_eq!(mode(&[None]), None);
    }

    #[test]
    fn test_mode_text() {
        let values = vec![
            Some("b".to_string()),
            Some("a".to_string()),
            Some("b".to_string()),
            Some("a".to_string()),
            None,
        ];
        assert_eq!(mode_text(&values), Some("a".to_string()));
    }

    #[test]
    fn test_top_text_first_seen_wins() {
        let values = vec![
            Some("y".to_string()),
            Some("x".to_string()),
            Some("x".to_string()),
            Some("y".to_string()),
        ];
        assert_eq!(top_text(&values), Some(("y".to_string(), 2)));
    }

    #[test]
    fn test_min_max() {
        let values = vec![Some(2.0), None, Some(-1.0)];
        assert_eq!(min(&values), Some(-1.0));
        assert_eq!(max(&values), Some(2.0));
    }
}
